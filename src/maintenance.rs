// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Maintenance sessions and their cheque-line ledger.
//!
//! Cheque lines live inside the owning maintenance record — a line cannot
//! outlive its parent. Each line stores the consumed quantity and the part
//! price at time of use, so the session cost is always derivable as
//! `Σ(active line quantity × unit price)` no matter what happens to the
//! part's price later.
//!
//! Parent-level deactivation flips lines through an explicit cascade list
//! (`suspended`): only the lines that were active at deactivation time are
//! recorded there, and reactivation restores exactly those. A line that
//! was individually deactivated beforehand is not resurrected by the
//! parent's round trip.
//!
//! The stored total cost is the historical record: it is updated by
//! ledger mutations (adding lines, closing, individual line toggles) but
//! deliberately untouched by parent-level suspension, so an audit of a
//! deactivated maintenance still sees what the session cost.

use crate::base::{MaintenanceId, PartId, PlateId, TechnicianId};
use crate::error::FleetError;
use crate::gateway::Soft;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle status of a cheque line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineStatus {
    /// Quantity counts as consumed (excluded from part stock).
    Active,
    /// Quantity counts as returned (included in part stock).
    Inactive,
}

/// One part's consumption recorded by one maintenance session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChequeLine {
    quantity: u32,
    unit_price: Decimal,
    status: LineStatus,
}

impl ChequeLine {
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Part price captured at time of use.
    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn status(&self) -> LineStatus {
        self.status
    }
}

/// Mutable maintenance state, guarded by the record mutex.
#[derive(Debug)]
pub(crate) struct MaintenanceState {
    end: Option<DateTime<Utc>>,
    total_cost: Decimal,
    active: bool,
    lines: HashMap<PartId, ChequeLine>,
    /// Cascade list: lines flipped by the last parent-level deactivation.
    suspended: Vec<PartId>,
}

impl MaintenanceState {
    fn require_active(&self, maintenance: MaintenanceId) -> Result<(), FleetError> {
        if !self.active {
            return Err(FleetError::MaintenanceInactive(maintenance));
        }
        Ok(())
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Stored (historical) session cost.
    pub(crate) fn recorded_cost(&self) -> Decimal {
        self.total_cost
    }

    /// Cost derived from the currently active lines.
    fn active_cost(&self) -> Decimal {
        self.lines
            .values()
            .filter(|line| line.status == LineStatus::Active)
            .map(|line| Decimal::from(line.quantity) * line.unit_price)
            .sum()
    }

    pub(crate) fn line(&self, part: &PartId) -> Option<&ChequeLine> {
        self.lines.get(part)
    }

    pub(crate) fn has_line(&self, part: &PartId) -> bool {
        self.lines.contains_key(part)
    }

    /// Records a new line. The caller has already decremented stock; a
    /// failure here means no line was created and the caller must put the
    /// stock back.
    pub(crate) fn add_line(
        &mut self,
        maintenance: MaintenanceId,
        part: PartId,
        quantity: u32,
        unit_price: Decimal,
    ) -> Result<(), FleetError> {
        self.require_active(maintenance)?;
        if self.end.is_some() {
            return Err(FleetError::MaintenanceClosed(maintenance));
        }
        if self.lines.contains_key(&part) {
            return Err(FleetError::ChequeLineExists { maintenance, part });
        }
        self.lines.insert(
            part,
            ChequeLine {
                quantity,
                unit_price,
                status: LineStatus::Active,
            },
        );
        self.total_cost = self.active_cost();
        Ok(())
    }

    /// Closes the session, validating any supplied total against the
    /// ledger sum. The stored cost is always the derived one.
    pub(crate) fn close(
        &mut self,
        maintenance: MaintenanceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        supplied_cost: Option<Decimal>,
    ) -> Result<(), FleetError> {
        self.require_active(maintenance)?;
        if self.end.is_some() {
            return Err(FleetError::MaintenanceClosed(maintenance));
        }
        if end < start {
            return Err(FleetError::InvalidTimestamp);
        }
        let derived = self.active_cost();
        if let Some(supplied) = supplied_cost
            && supplied != derived
        {
            return Err(FleetError::CostMismatch {
                maintenance,
                supplied,
                derived,
            });
        }
        self.end = Some(end);
        self.total_cost = derived;
        Ok(())
    }

    /// Quantity to return to stock if the line is deactivated now;
    /// `None` when the line is already inactive (idempotent no-op).
    pub(crate) fn deactivation_quantity(
        &self,
        maintenance: MaintenanceId,
        part: &PartId,
    ) -> Result<Option<u32>, FleetError> {
        self.require_active(maintenance)?;
        let line = self
            .lines
            .get(part)
            .ok_or_else(|| FleetError::ChequeLineNotFound {
                maintenance,
                part: part.clone(),
            })?;
        Ok((line.status == LineStatus::Active).then_some(line.quantity))
    }

    /// Quantity to consume from stock if the line is reactivated now;
    /// `None` when the line is already active (idempotent no-op).
    pub(crate) fn reactivation_quantity(
        &self,
        maintenance: MaintenanceId,
        part: &PartId,
    ) -> Result<Option<u32>, FleetError> {
        self.require_active(maintenance)?;
        let line = self
            .lines
            .get(part)
            .ok_or_else(|| FleetError::ChequeLineNotFound {
                maintenance,
                part: part.clone(),
            })?;
        Ok((line.status == LineStatus::Inactive).then_some(line.quantity))
    }

    /// Flips a line after the caller has applied the stock side. The
    /// recorded quantity is the only quantity that ever moves.
    pub(crate) fn set_line_status(&mut self, part: &PartId, status: LineStatus) {
        if let Some(line) = self.lines.get_mut(part) {
            line.status = status;
        }
        self.total_cost = self.active_cost();
    }

    /// Lines a parent-level deactivation would flip, with their recorded
    /// quantities.
    pub(crate) fn cascade_candidates(&self) -> Vec<(PartId, u32)> {
        self.lines
            .iter()
            .filter(|(_, line)| line.status == LineStatus::Active)
            .map(|(part, line)| (part.clone(), line.quantity))
            .collect()
    }

    /// Lines the last parent-level deactivation flipped.
    pub(crate) fn suspended_lines(&self) -> Vec<(PartId, u32)> {
        self.suspended
            .iter()
            .filter_map(|part| {
                self.lines
                    .get(part)
                    .map(|line| (part.clone(), line.quantity))
            })
            .collect()
    }

    /// Deactivates the session, suspending every active line. The stored
    /// cost is kept as the historical record.
    pub(crate) fn apply_suspension(&mut self) {
        self.suspended = self
            .lines
            .iter()
            .filter(|(_, line)| line.status == LineStatus::Active)
            .map(|(part, _)| part.clone())
            .collect();
        for part in &self.suspended {
            if let Some(line) = self.lines.get_mut(part) {
                line.status = LineStatus::Inactive;
            }
        }
        self.active = false;
    }

    /// Reactivates the session, restoring exactly the suspended lines.
    pub(crate) fn apply_reactivation(&mut self) {
        for part in std::mem::take(&mut self.suspended) {
            if let Some(line) = self.lines.get_mut(&part) {
                line.status = LineStatus::Active;
            }
        }
        self.active = true;
    }
}

/// A maintenance session for one vehicle.
#[derive(Debug)]
pub struct Maintenance {
    id: MaintenanceId,
    plate: PlateId,
    technician: TechnicianId,
    start: DateTime<Utc>,
    inner: Mutex<MaintenanceState>,
}

impl Maintenance {
    pub(crate) fn new(
        id: MaintenanceId,
        plate: PlateId,
        technician: TechnicianId,
        start: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            plate,
            technician,
            start,
            inner: Mutex::new(MaintenanceState {
                end: None,
                total_cost: Decimal::ZERO,
                active: true,
                lines: HashMap::new(),
                suspended: Vec::new(),
            }),
        }
    }

    pub fn id(&self) -> MaintenanceId {
        self.id
    }

    pub fn plate(&self) -> &PlateId {
        &self.plate
    }

    pub fn technician(&self) -> TechnicianId {
        self.technician
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().end
    }

    /// Stored session cost; survives parent-level deactivation.
    pub fn total_cost(&self) -> Decimal {
        self.inner.lock().recorded_cost()
    }

    pub fn active(&self) -> bool {
        self.inner.lock().active
    }

    /// Snapshot of one ledger line.
    pub fn line(&self, part: &PartId) -> Option<ChequeLine> {
        self.inner.lock().line(part).cloned()
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, MaintenanceState> {
        self.inner.lock()
    }
}

impl Soft for Maintenance {
    fn is_active(&self) -> bool {
        self.inner.lock().active
    }
}
