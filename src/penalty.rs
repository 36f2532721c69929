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

//! Penalty records.
//!
//! A penalty charges a rental, optionally attributing the charge to a
//! maintenance (damage) event. Penalties reference their parents but do
//! not own them: the referenced rental or maintenance may be cancelled or
//! deactivated later, and the penalty must stay explainable — which is why
//! penalty resolution always reads parents through the including-inactive
//! gateway path.

use crate::base::{MaintenanceId, PenaltyId, PlateId, RentalId};
use crate::rental::RentalStatus;
use chrono::NaiveDate;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Settlement status of a penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PenaltyStatus {
    Unpaid,
    Paid,
    Waived,
}

impl fmt::Display for PenaltyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PenaltyStatus::Unpaid => "Unpaid",
            PenaltyStatus::Paid => "Paid",
            PenaltyStatus::Waived => "Waived",
        };
        write!(f, "{name}")
    }
}

/// A monetary charge against a rental.
#[derive(Debug)]
pub struct Penalty {
    id: PenaltyId,
    rental: RentalId,
    maintenance: Option<MaintenanceId>,
    amount: Decimal,
    issued: NaiveDate,
    status: Mutex<PenaltyStatus>,
}

impl Penalty {
    pub(crate) fn new(
        id: PenaltyId,
        rental: RentalId,
        maintenance: Option<MaintenanceId>,
        amount: Decimal,
        issued: NaiveDate,
    ) -> Self {
        Self {
            id,
            rental,
            maintenance,
            amount,
            issued,
            status: Mutex::new(PenaltyStatus::Unpaid),
        }
    }

    pub fn id(&self) -> PenaltyId {
        self.id
    }

    pub fn rental(&self) -> RentalId {
        self.rental
    }

    /// The maintenance event the charge is attributed to, if any.
    pub fn maintenance(&self) -> Option<MaintenanceId> {
        self.maintenance
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn issued(&self) -> NaiveDate {
        self.issued
    }

    pub fn status(&self) -> PenaltyStatus {
        *self.status.lock()
    }

    pub(crate) fn set_status(&self, status: PenaltyStatus) {
        *self.status.lock() = status;
    }
}

/// Audit view of a penalty with its parents resolved, inactive or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PenaltyStatement {
    pub penalty: PenaltyId,
    pub amount: Decimal,
    pub status: PenaltyStatus,
    pub issued: NaiveDate,
    pub rental: RentalId,
    pub rental_status: RentalStatus,
    pub plate: PlateId,
    pub maintenance: Option<MaintenanceId>,
    /// Recorded cost of the referenced maintenance; preserved even after
    /// the maintenance is deactivated.
    pub maintenance_cost: Option<Decimal>,
    pub maintenance_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn penalty_starts_unpaid() {
        let penalty = Penalty::new(
            PenaltyId(1),
            RentalId(2),
            Some(MaintenanceId(3)),
            dec!(75.00),
            NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
        );
        assert_eq!(penalty.status(), PenaltyStatus::Unpaid);
    }

    #[test]
    fn status_updates_are_free_transitions() {
        let penalty = Penalty::new(
            PenaltyId(1),
            RentalId(2),
            None,
            dec!(10.00),
            NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
        );

        penalty.set_status(PenaltyStatus::Paid);
        assert_eq!(penalty.status(), PenaltyStatus::Paid);

        penalty.set_status(PenaltyStatus::Waived);
        assert_eq!(penalty.status(), PenaltyStatus::Waived);

        penalty.set_status(PenaltyStatus::Unpaid);
        assert_eq!(penalty.status(), PenaltyStatus::Unpaid);
    }
}
