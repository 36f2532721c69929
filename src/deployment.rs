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

//! Deployment records.
//!
//! A deployment assigns a vehicle to a physical location for a span of
//! dates; an unset end date means the deployment is the vehicle's current
//! location. The at-most-one-open-deployment rule is enforced by the
//! engine, which closes the previous deployment and opens the new one
//! under the same vehicle lock.

use crate::base::{DeploymentId, LocationId, PlateId};
use crate::error::FleetError;
use chrono::NaiveDate;
use parking_lot::Mutex;

/// Mutable deployment state: only the end date ever changes.
#[derive(Debug)]
pub(crate) struct DeploymentState {
    end_date: Option<NaiveDate>,
}

impl DeploymentState {
    /// Closes the deployment. Closing is one-shot.
    pub(crate) fn close(
        &mut self,
        deployment: DeploymentId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<(), FleetError> {
        if self.end_date.is_some() {
            return Err(FleetError::DeploymentClosed(deployment));
        }
        if end_date < start_date {
            return Err(FleetError::InvalidTimestamp);
        }
        self.end_date = Some(end_date);
        Ok(())
    }

    pub(crate) fn is_open(&self) -> bool {
        self.end_date.is_none()
    }
}

/// A vehicle's assignment to a location.
#[derive(Debug)]
pub struct Deployment {
    id: DeploymentId,
    plate: PlateId,
    location: LocationId,
    start_date: NaiveDate,
    inner: Mutex<DeploymentState>,
}

impl Deployment {
    pub(crate) fn new(
        id: DeploymentId,
        plate: PlateId,
        location: LocationId,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            plate,
            location,
            start_date,
            inner: Mutex::new(DeploymentState { end_date: None }),
        }
    }

    pub fn id(&self) -> DeploymentId {
        self.id
    }

    pub fn plate(&self) -> &PlateId {
        &self.plate
    }

    pub fn location(&self) -> LocationId {
        self.location
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// `None` while this is the vehicle's current location.
    pub fn end_date(&self) -> Option<NaiveDate> {
        self.inner.lock().end_date
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().is_open()
    }

    pub(crate) fn close(&self, end_date: NaiveDate) -> Result<(), FleetError> {
        self.inner.lock().close(self.id, self.start_date, end_date)
    }
}
