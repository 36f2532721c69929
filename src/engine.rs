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

//! Fleet command processing engine.
//!
//! [`Fleet`] is the command boundary: every state change to vehicles,
//! rentals, deployments, maintenance ledgers, spare-part stock and
//! penalties goes through a method here, and every method returns a typed
//! result instead of throwing past it.
//!
//! # Commands
//!
//! | Area | Commands |
//! |------|----------|
//! | Setup | `register_vehicle`, `register_part`, `restock_part`, `retire_vehicle`, `reinstate_vehicle`, `deactivate_part`, `reactivate_part`, `remove_part` |
//! | Rentals | `book_rental`, `record_pickup`, `complete_rental`, `cancel_rental`, `reactivate_rental` |
//! | Deployments | `start_deployment`, `end_deployment` |
//! | Maintenance | `open_maintenance`, `add_part_usage`, `close_maintenance`, `deactivate_cheque_line`, `reactivate_cheque_line`, `deactivate_maintenance`, `reactivate_maintenance` |
//! | Penalties | `assess_penalty`, `assess_from_maintenance`, `update_penalty_status`, `delete_penalty` |
//! | Queries | `vehicle_status`, `current_location`, `stock_on_hand`, `penalty_statement`, `vehicle_report`, `stock_report` |
//!
//! # Locking
//!
//! Records are stored in [`dashmap::DashMap`]-backed registries; each record's
//! mutable state sits behind its own mutex. Lock acquisition follows a
//! strict tier order — vehicle, then the owned record (rental /
//! maintenance / deployment), then parts (in id order when a cascade
//! touches several) — and no operation ever holds two locks of the same
//! tier except the sorted part set of a cascade. Operations that depend on
//! a vehicle's derived status hold that vehicle's guard for the whole
//! read-then-write, so "check Available, then book" cannot race with a
//! concurrent booking of the same plate.
//!
//! Part locks are bounded; a timeout surfaces as
//! [`FleetError::ConcurrentModification`] before anything was modified,
//! and the command retries once. Cascades over several parts acquire every
//! lock and verify every precondition before applying the first change,
//! so they either apply completely or not at all.

use crate::base::{
    CustomerId, DeploymentId, LocationId, MaintenanceId, PartId, PenaltyId, PlateId, RentalId,
    TechnicianId,
};
use crate::deployment::Deployment;
use crate::error::FleetError;
use crate::gateway::Registry;
use crate::maintenance::{LineStatus, Maintenance};
use crate::part::Part;
use crate::penalty::{Penalty, PenaltyStatement, PenaltyStatus};
use crate::rental::{Rental, RentalStatus};
use crate::vehicle::{Vehicle, VehicleStatus};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, info, warn};

/// One row of the fleet overview report.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleReport {
    pub plate: PlateId,
    pub kind: String,
    pub daily_rate: Decimal,
    pub status: VehicleStatus,
    pub location: Option<LocationId>,
}

/// Fleet management engine.
///
/// Maintains the per-entity registries and serializes every operation that
/// reads-then-writes a vehicle's derived status or a part's stock.
pub struct Fleet {
    vehicles: Registry<PlateId, Vehicle>,
    parts: Registry<PartId, Part>,
    rentals: Registry<RentalId, Rental>,
    maintenances: Registry<MaintenanceId, Maintenance>,
    deployments: Registry<DeploymentId, Deployment>,
    penalties: Registry<PenaltyId, Penalty>,
    rental_seq: AtomicU32,
    maintenance_seq: AtomicU32,
    deployment_seq: AtomicU32,
    penalty_seq: AtomicU32,
}

/// Retries `op` once if it reports a concurrent modification.
///
/// Safe because a `ConcurrentModification` is only ever raised before the
/// first mutation of an attempt; a partially applied operation never
/// reaches this path.
fn retry_once<T>(mut op: impl FnMut() -> Result<T, FleetError>) -> Result<T, FleetError> {
    match op() {
        Err(FleetError::ConcurrentModification) => op(),
        result => result,
    }
}

impl Fleet {
    /// Creates an empty fleet.
    pub fn new() -> Self {
        Fleet {
            vehicles: Registry::new(),
            parts: Registry::new(),
            rentals: Registry::new(),
            maintenances: Registry::new(),
            deployments: Registry::new(),
            penalties: Registry::new(),
            rental_seq: AtomicU32::new(0),
            maintenance_seq: AtomicU32::new(0),
            deployment_seq: AtomicU32::new(0),
            penalty_seq: AtomicU32::new(0),
        }
    }

    fn next(seq: &AtomicU32) -> u32 {
        seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    // === Record lookup ===

    fn vehicle(&self, plate: &PlateId) -> Result<Arc<Vehicle>, FleetError> {
        self.vehicles
            .get(plate)
            .ok_or_else(|| FleetError::VehicleNotFound(plate.clone()))
    }

    fn rental(&self, rental: RentalId) -> Result<Arc<Rental>, FleetError> {
        self.rentals
            .get(&rental)
            .ok_or(FleetError::RentalNotFound(rental))
    }

    fn maintenance(&self, maintenance: MaintenanceId) -> Result<Arc<Maintenance>, FleetError> {
        self.maintenances
            .get(&maintenance)
            .ok_or(FleetError::MaintenanceNotFound(maintenance))
    }

    fn part(&self, part: &PartId) -> Result<Arc<Part>, FleetError> {
        self.parts
            .get(part)
            .ok_or_else(|| FleetError::PartNotFound(part.clone()))
    }

    fn active_part(&self, part: &PartId) -> Result<Arc<Part>, FleetError> {
        self.parts
            .get_active(part)
            .ok_or_else(|| FleetError::PartNotFound(part.clone()))
    }

    // === Setup ===

    /// Registers a vehicle under its plate.
    ///
    /// # Errors
    ///
    /// - [`FleetError::InvalidAmount`] - daily rate is not positive.
    /// - [`FleetError::DuplicateVehicle`] - the plate is already taken.
    pub fn register_vehicle(
        &self,
        plate: PlateId,
        kind: String,
        daily_rate: Decimal,
    ) -> Result<(), FleetError> {
        if daily_rate <= Decimal::ZERO {
            return Err(FleetError::InvalidAmount);
        }
        let vehicle = Vehicle::new(plate.clone(), kind, daily_rate);
        self.vehicles
            .insert(plate.clone(), vehicle)
            .map_err(|_| FleetError::DuplicateVehicle(plate.clone()))?;
        info!(%plate, "vehicle registered");
        Ok(())
    }

    /// Registers a spare part with its initial stock.
    ///
    /// # Errors
    ///
    /// - [`FleetError::InvalidAmount`] - price is not positive.
    /// - [`FleetError::DuplicatePart`] - the part ID is already taken.
    pub fn register_part(
        &self,
        part: PartId,
        name: String,
        quantity: u32,
        price: Decimal,
    ) -> Result<(), FleetError> {
        if price <= Decimal::ZERO {
            return Err(FleetError::InvalidAmount);
        }
        let record = Part::new(part.clone(), name, quantity, price);
        self.parts
            .insert(part.clone(), record)
            .map_err(|_| FleetError::DuplicatePart(part.clone()))?;
        info!(%part, quantity, "part registered");
        Ok(())
    }

    /// Manually increases a part's on-hand stock.
    pub fn restock_part(&self, part: &PartId, quantity: u32) -> Result<(), FleetError> {
        retry_once(|| {
            let record = self.part(part)?;
            record.restock(quantity)?;
            debug!(%part, quantity, "part restocked");
            Ok(())
        })
    }

    /// Soft-deletes a part. Committed consumption keeps its stock effect;
    /// new usage is rejected while the part is inactive.
    pub fn deactivate_part(&self, part: &PartId) -> Result<(), FleetError> {
        retry_once(|| self.part(part)?.set_active(false))
    }

    /// Reverses a part soft-delete.
    pub fn reactivate_part(&self, part: &PartId) -> Result<(), FleetError> {
        retry_once(|| self.part(part)?.set_active(true))
    }

    /// Hard-deletes a part. Data-entry correction only: refused once any
    /// cheque line, active or not, references the part.
    ///
    /// # Errors
    ///
    /// - [`FleetError::PartNotFound`] - no such part.
    /// - [`FleetError::ReferentialIntegrity`] - a maintenance ledger
    ///   references the part.
    pub fn remove_part(&self, part: &PartId) -> Result<(), FleetError> {
        if self.parts.get(part).is_none() {
            return Err(FleetError::PartNotFound(part.clone()));
        }
        for entry in self.maintenances.iter() {
            let maintenance = entry.value();
            if maintenance.state().has_line(part) {
                return Err(FleetError::ReferentialIntegrity {
                    part: part.clone(),
                    maintenance: maintenance.id(),
                });
            }
        }
        self.parts.remove(part);
        info!(%part, "part removed");
        Ok(())
    }

    /// Retires a vehicle from the fleet (transition to Inactive).
    ///
    /// # Errors
    ///
    /// [`FleetError::VehicleConflict`] if an open rental or maintenance
    /// still holds the vehicle.
    pub fn retire_vehicle(&self, plate: &PlateId) -> Result<(), FleetError> {
        let vehicle = self.vehicle(plate)?;
        vehicle.state().retire()?;
        info!(%plate, "vehicle retired");
        Ok(())
    }

    /// Brings a retired vehicle back. The vehicle derives Available —
    /// never a stale prior status.
    pub fn reinstate_vehicle(&self, plate: &PlateId) -> Result<(), FleetError> {
        let vehicle = self.vehicle(plate)?;
        vehicle.state().reinstate();
        info!(%plate, "vehicle reinstated");
        Ok(())
    }

    // === Rentals ===

    /// Books a vehicle for a customer.
    ///
    /// The availability check and the commitment happen under the same
    /// vehicle guard: of two concurrent bookings for one plate, exactly
    /// one wins and the other is told what blocks it.
    ///
    /// # Errors
    ///
    /// - [`FleetError::VehicleNotFound`] - unknown plate.
    /// - [`FleetError::VehicleConflict`] - vehicle is not Available; the
    ///   error names the blocking record.
    pub fn book_rental(
        &self,
        customer: CustomerId,
        plate: &PlateId,
        location: LocationId,
        pickup_time: DateTime<Utc>,
    ) -> Result<RentalId, FleetError> {
        let vehicle = self.vehicle(plate)?;
        let rental_id = RentalId(Self::next(&self.rental_seq));

        let mut state = vehicle.state();
        state.begin_rental(rental_id)?;
        let record = Rental::new(rental_id, customer, plate.clone(), location, pickup_time);
        if self.rentals.insert(rental_id, record).is_err() {
            state.end_rental(rental_id);
            return Err(FleetError::ConcurrentModification);
        }
        drop(state);

        info!(%plate, rental = %rental_id, %customer, "rental booked");
        Ok(rental_id)
    }

    /// Records the vehicle hand-over, ending the booked phase.
    pub fn record_pickup(&self, rental: RentalId, at: DateTime<Utc>) -> Result<(), FleetError> {
        let record = self.rental(rental)?;
        record.state().record_pickup(rental, at)?;
        debug!(rental = %rental, "pickup recorded");
        Ok(())
    }

    /// Completes a rental and frees the vehicle.
    ///
    /// # Errors
    ///
    /// - [`FleetError::RentalNotFound`] - unknown rental.
    /// - [`FleetError::RentalNotActive`] - already completed or cancelled.
    /// - [`FleetError::PickupNotRecorded`] - the vehicle was never handed
    ///   over.
    /// - [`FleetError::InvalidTimestamp`] - end precedes the pickup.
    pub fn complete_rental(&self, rental: RentalId, end: DateTime<Utc>) -> Result<(), FleetError> {
        let record = self.rental(rental)?;
        let vehicle = self.vehicle(record.plate())?;

        let mut state = vehicle.state();
        record.state().complete(rental, end)?;
        state.end_rental(rental);
        drop(state);

        info!(rental = %rental, plate = %record.plate(), "rental completed");
        Ok(())
    }

    /// Administratively cancels an active rental and frees the vehicle.
    pub fn cancel_rental(&self, rental: RentalId) -> Result<(), FleetError> {
        let record = self.rental(rental)?;
        let vehicle = self.vehicle(record.plate())?;

        let mut state = vehicle.state();
        record.state().cancel(rental)?;
        state.end_rental(rental);
        drop(state);

        info!(rental = %rental, plate = %record.plate(), "rental cancelled");
        Ok(())
    }

    /// Reverses a cancellation, re-committing the vehicle.
    ///
    /// # Errors
    ///
    /// - [`FleetError::RentalNotCancelled`] - the rental is not cancelled.
    /// - [`FleetError::VehicleConflict`] - the vehicle has since been
    ///   committed to another rental or to maintenance.
    pub fn reactivate_rental(&self, rental: RentalId) -> Result<(), FleetError> {
        let record = self.rental(rental)?;
        let vehicle = self.vehicle(record.plate())?;

        let mut vehicle_state = vehicle.state();
        let mut rental_state = record.state();
        if rental_state.status() != RentalStatus::Cancelled {
            return Err(FleetError::RentalNotCancelled {
                rental,
                status: rental_state.status(),
            });
        }
        vehicle_state.begin_rental(rental)?;
        rental_state.reactivate(rental)?;
        drop(rental_state);
        drop(vehicle_state);

        info!(rental = %rental, plate = %record.plate(), "rental reactivated");
        Ok(())
    }

    // === Deployments ===

    /// Assigns the vehicle to a location, closing any open deployment for
    /// the plate in the same locked scope — a vehicle never has two open
    /// deployments.
    pub fn start_deployment(
        &self,
        plate: &PlateId,
        location: LocationId,
        date: NaiveDate,
    ) -> Result<DeploymentId, FleetError> {
        let vehicle = self.vehicle(plate)?;
        let deployment_id = DeploymentId(Self::next(&self.deployment_seq));

        let mut state = vehicle.state();
        if let Some(previous_id) = state.open_deployment() {
            let previous = self
                .deployments
                .get(&previous_id)
                .ok_or(FleetError::DeploymentNotFound(previous_id))?;
            previous.close(date)?;
        }
        let record = Deployment::new(deployment_id, plate.clone(), location, date);
        if self.deployments.insert(deployment_id, record).is_err() {
            return Err(FleetError::ConcurrentModification);
        }
        state.swap_deployment(Some(deployment_id));
        drop(state);

        info!(%plate, deployment = %deployment_id, %location, "deployment started");
        Ok(deployment_id)
    }

    /// Closes a deployment. The vehicle's location becomes unknown until
    /// the next deployment starts.
    pub fn end_deployment(&self, deployment: DeploymentId, date: NaiveDate) -> Result<(), FleetError> {
        let record = self
            .deployments
            .get(&deployment)
            .ok_or(FleetError::DeploymentNotFound(deployment))?;
        let vehicle = self.vehicle(record.plate())?;

        let mut state = vehicle.state();
        record.close(date)?;
        if state.open_deployment() == Some(deployment) {
            state.swap_deployment(None);
        }
        drop(state);

        info!(deployment = %deployment, plate = %record.plate(), "deployment ended");
        Ok(())
    }

    /// The vehicle's current location; `None` means "location unknown"
    /// (no open deployment), which is reportable but not an error.
    pub fn current_location(&self, plate: &PlateId) -> Result<Option<LocationId>, FleetError> {
        let vehicle = self.vehicle(plate)?;
        let open = vehicle.state().open_deployment();
        Ok(open
            .and_then(|id| self.deployments.get(&id))
            .map(|deployment| deployment.location()))
    }

    // === Maintenance ===

    /// Opens a maintenance session, committing the vehicle.
    ///
    /// # Errors
    ///
    /// [`FleetError::VehicleConflict`] if the vehicle is rented out,
    /// already in the shop, or retired.
    pub fn open_maintenance(
        &self,
        plate: &PlateId,
        technician: TechnicianId,
        start: DateTime<Utc>,
    ) -> Result<MaintenanceId, FleetError> {
        let vehicle = self.vehicle(plate)?;
        let maintenance_id = MaintenanceId(Self::next(&self.maintenance_seq));

        let mut state = vehicle.state();
        state.begin_maintenance(maintenance_id)?;
        let record = Maintenance::new(maintenance_id, plate.clone(), technician, start);
        if self.maintenances.insert(maintenance_id, record).is_err() {
            state.end_maintenance(maintenance_id);
            return Err(FleetError::ConcurrentModification);
        }
        drop(state);

        info!(%plate, maintenance = %maintenance_id, %technician, "maintenance opened");
        Ok(maintenance_id)
    }

    /// Records consumption of a part by a maintenance session.
    ///
    /// Stock is decremented first; if the decrement fails no ledger line
    /// is created, and the line is only created once the decrement is
    /// committed — there is no partial state. The line captures the part
    /// price at time of use.
    ///
    /// # Errors
    ///
    /// - [`FleetError::MaintenanceNotFound`] / [`FleetError::MaintenanceInactive`] /
    ///   [`FleetError::MaintenanceClosed`] - the session cannot take usage.
    /// - [`FleetError::PartNotFound`] - unknown or inactive part.
    /// - [`FleetError::ChequeLineExists`] - usage of this part is already
    ///   recorded for this session.
    /// - [`FleetError::InsufficientStock`] - the decrement would go
    ///   negative; stock is left untouched.
    pub fn add_part_usage(
        &self,
        maintenance: MaintenanceId,
        part: &PartId,
        quantity: u32,
    ) -> Result<(), FleetError> {
        retry_once(|| {
            let record = self.maintenance(maintenance)?;
            let part_record = self.active_part(part)?;

            let mut ledger = record.state();
            // Validate the ledger side before touching stock, so a failed
            // consume is the only abort path after this point.
            if !ledger.is_active() {
                return Err(FleetError::MaintenanceInactive(maintenance));
            }
            if !ledger.is_open() {
                return Err(FleetError::MaintenanceClosed(maintenance));
            }
            if ledger.has_line(part) {
                return Err(FleetError::ChequeLineExists {
                    maintenance,
                    part: part.clone(),
                });
            }

            let mut stock = part_record.guard()?;
            let unit_price = stock.price();
            stock.consume(part, quantity)?;
            ledger.add_line(maintenance, part.clone(), quantity, unit_price)?;
            drop(stock);
            drop(ledger);

            debug!(maintenance = %maintenance, %part, quantity, "part usage recorded");
            Ok(())
        })
    }

    /// Closes a maintenance session and frees the vehicle.
    ///
    /// The total cost is recomputed from the active ledger lines; a
    /// supplied total that disagrees is rejected, `None` accepts the
    /// derived sum.
    pub fn close_maintenance(
        &self,
        maintenance: MaintenanceId,
        end: DateTime<Utc>,
        total_cost: Option<Decimal>,
    ) -> Result<(), FleetError> {
        let record = self.maintenance(maintenance)?;
        let vehicle = self.vehicle(record.plate())?;

        let mut state = vehicle.state();
        record
            .state()
            .close(maintenance, record.start(), end, total_cost)?;
        state.end_maintenance(maintenance);
        drop(state);

        info!(maintenance = %maintenance, plate = %record.plate(), "maintenance closed");
        Ok(())
    }

    /// Soft-deletes one cheque line, returning its recorded quantity to
    /// stock. Deactivating an already-inactive line is a no-op.
    pub fn deactivate_cheque_line(
        &self,
        maintenance: MaintenanceId,
        part: &PartId,
    ) -> Result<(), FleetError> {
        retry_once(|| {
            let record = self.maintenance(maintenance)?;
            let mut ledger = record.state();
            let Some(quantity) = ledger.deactivation_quantity(maintenance, part)? else {
                return Ok(());
            };
            let part_record = self.part(part)?;
            part_record.restore(quantity)?;
            ledger.set_line_status(part, LineStatus::Inactive);
            drop(ledger);

            debug!(maintenance = %maintenance, %part, quantity, "cheque line deactivated");
            Ok(())
        })
    }

    /// Reverses a cheque-line soft-delete, re-consuming the recorded
    /// quantity — never a re-derived or re-entered one. Reactivating an
    /// already-active line is a no-op.
    ///
    /// # Errors
    ///
    /// [`FleetError::InsufficientStock`] if the stock has since been used
    /// elsewhere; the line stays inactive.
    pub fn reactivate_cheque_line(
        &self,
        maintenance: MaintenanceId,
        part: &PartId,
    ) -> Result<(), FleetError> {
        retry_once(|| {
            let record = self.maintenance(maintenance)?;
            let mut ledger = record.state();
            let Some(quantity) = ledger.reactivation_quantity(maintenance, part)? else {
                return Ok(());
            };
            let part_record = self.part(part)?;
            part_record.consume(quantity)?;
            ledger.set_line_status(part, LineStatus::Active);
            drop(ledger);

            debug!(maintenance = %maintenance, %part, quantity, "cheque line reactivated");
            Ok(())
        })
    }

    /// Soft-deletes a maintenance session, cascading over its active
    /// cheque lines: each line's recorded quantity returns to stock, and
    /// an open session releases the vehicle. Deactivating an inactive
    /// session is a no-op.
    ///
    /// All affected part locks are acquired before the first change is
    /// applied, so the cascade applies completely or not at all.
    pub fn deactivate_maintenance(&self, maintenance: MaintenanceId) -> Result<(), FleetError> {
        retry_once(|| {
            let record = self.maintenance(maintenance)?;
            let vehicle = self.vehicle(record.plate())?;

            let mut vehicle_state = vehicle.state();
            let mut ledger = record.state();
            if !ledger.is_active() {
                return Ok(());
            }

            let mut lines = ledger.cascade_candidates();
            lines.sort_by(|a, b| a.0.cmp(&b.0));
            let parts = lines
                .iter()
                .map(|(part_id, quantity)| Ok((self.part(part_id)?, *quantity)))
                .collect::<Result<Vec<_>, FleetError>>()?;

            let mut guards = Vec::with_capacity(parts.len());
            for (part, _) in &parts {
                guards.push(part.guard()?);
            }
            for (guard, (_, quantity)) in guards.iter_mut().zip(&parts) {
                guard.restore(*quantity)?;
            }
            drop(guards);

            ledger.apply_suspension();
            if ledger.is_open() {
                vehicle_state.end_maintenance(maintenance);
            }
            drop(ledger);
            drop(vehicle_state);

            info!(maintenance = %maintenance, lines = parts.len(), "maintenance deactivated");
            Ok(())
        })
    }

    /// Reverses a maintenance soft-delete: re-consumes exactly the lines
    /// the deactivation suspended and, for a still-open session, re-commits
    /// the vehicle. Reactivating an active session is a no-op.
    ///
    /// Every precondition — vehicle availability, part activity, stock
    /// sufficiency for every suspended line — is verified before the first
    /// change is applied; on failure nothing has moved.
    pub fn reactivate_maintenance(&self, maintenance: MaintenanceId) -> Result<(), FleetError> {
        retry_once(|| {
            let record = self.maintenance(maintenance)?;
            let vehicle = self.vehicle(record.plate())?;

            let mut vehicle_state = vehicle.state();
            let mut ledger = record.state();
            if ledger.is_active() {
                return Ok(());
            }

            let vehicle_committed = if ledger.is_open() {
                vehicle_state.begin_maintenance(maintenance)?;
                true
            } else {
                false
            };

            let mut lines = ledger.suspended_lines();
            lines.sort_by(|a, b| a.0.cmp(&b.0));

            let result: Result<(), FleetError> = (|| {
                let parts = lines
                    .iter()
                    .map(|(part_id, quantity)| Ok((self.part(part_id)?, *quantity)))
                    .collect::<Result<Vec<_>, FleetError>>()?;

                let mut guards = Vec::with_capacity(parts.len());
                for (part, _) in &parts {
                    guards.push(part.guard()?);
                }
                // Verify every line before applying any decrement.
                for (guard, (part, quantity)) in guards.iter().zip(&parts) {
                    guard.check_consume(part.id(), *quantity)?;
                }
                for (guard, (part, quantity)) in guards.iter_mut().zip(&parts) {
                    guard.consume(part.id(), *quantity)?;
                }
                Ok(())
            })();

            match result {
                Ok(()) => {
                    ledger.apply_reactivation();
                    drop(ledger);
                    drop(vehicle_state);
                    info!(maintenance = %maintenance, "maintenance reactivated");
                    Ok(())
                }
                Err(error) => {
                    if vehicle_committed {
                        vehicle_state.end_maintenance(maintenance);
                    }
                    warn!(maintenance = %maintenance, %error, "maintenance reactivation aborted");
                    Err(error)
                }
            }
        })
    }

    // === Penalties ===

    /// Charges a rental without attributing the charge to a maintenance
    /// event.
    pub fn assess_penalty(
        &self,
        rental: RentalId,
        amount: Decimal,
        issued: NaiveDate,
    ) -> Result<PenaltyId, FleetError> {
        self.assess(rental, None, amount, issued)
    }

    /// Charges a rental for a maintenance (damage) event.
    ///
    /// Parents are resolved through the including-inactive read path: a
    /// cancelled rental or deactivated maintenance is a valid reference,
    /// because the penalty must stay explainable after the fact.
    pub fn assess_from_maintenance(
        &self,
        rental: RentalId,
        maintenance: MaintenanceId,
        amount: Decimal,
        issued: NaiveDate,
    ) -> Result<PenaltyId, FleetError> {
        self.assess(rental, Some(maintenance), amount, issued)
    }

    fn assess(
        &self,
        rental: RentalId,
        maintenance: Option<MaintenanceId>,
        amount: Decimal,
        issued: NaiveDate,
    ) -> Result<PenaltyId, FleetError> {
        if amount <= Decimal::ZERO {
            return Err(FleetError::InvalidAmount);
        }
        self.rental(rental)?;
        if let Some(maintenance) = maintenance {
            self.maintenance(maintenance)?;
        }

        let penalty_id = PenaltyId(Self::next(&self.penalty_seq));
        let record = Penalty::new(penalty_id, rental, maintenance, amount, issued);
        if self.penalties.insert(penalty_id, record).is_err() {
            return Err(FleetError::ConcurrentModification);
        }

        info!(penalty = %penalty_id, rental = %rental, %amount, "penalty assessed");
        Ok(penalty_id)
    }

    /// Updates a penalty's settlement status; all transitions between
    /// Unpaid, Paid and Waived are allowed.
    pub fn update_penalty_status(
        &self,
        penalty: PenaltyId,
        status: PenaltyStatus,
    ) -> Result<(), FleetError> {
        let record = self
            .penalties
            .get(&penalty)
            .ok_or(FleetError::PenaltyNotFound(penalty))?;
        record.set_status(status);
        debug!(penalty = %penalty, %status, "penalty status updated");
        Ok(())
    }

    /// Resolves a penalty with its parents, inactive or not. The
    /// maintenance cost reported here is the recorded (historical) cost,
    /// which survives deactivation of the session.
    pub fn penalty_statement(&self, penalty: PenaltyId) -> Result<PenaltyStatement, FleetError> {
        let record = self
            .penalties
            .get(&penalty)
            .ok_or(FleetError::PenaltyNotFound(penalty))?;
        let rental = self.rental(record.rental())?;
        let maintenance = record
            .maintenance()
            .map(|id| self.maintenance(id))
            .transpose()?;

        Ok(PenaltyStatement {
            penalty,
            amount: record.amount(),
            status: record.status(),
            issued: record.issued(),
            rental: rental.id(),
            rental_status: rental.status(),
            plate: rental.plate().clone(),
            maintenance: record.maintenance(),
            maintenance_cost: maintenance.as_ref().map(|m| m.total_cost()),
            maintenance_active: maintenance.as_ref().map(|m| m.active()),
        })
    }

    /// Hard-deletes a penalty. Reserved for correcting data-entry
    /// mistakes; not a settlement operation.
    pub fn delete_penalty(&self, penalty: PenaltyId) -> Result<(), FleetError> {
        self.penalties
            .remove(&penalty)
            .map(|_| ())
            .ok_or(FleetError::PenaltyNotFound(penalty))
    }

    // === Queries ===

    /// Derives a vehicle's current status.
    pub fn vehicle_status(&self, plate: &PlateId) -> Result<VehicleStatus, FleetError> {
        Ok(self.vehicle(plate)?.status())
    }

    /// A part's on-hand stock (inactive parts included).
    pub fn stock_on_hand(&self, part: &PartId) -> Result<u32, FleetError> {
        Ok(self.part(part)?.quantity())
    }

    pub fn get_vehicle(&self, plate: &PlateId) -> Option<Arc<Vehicle>> {
        self.vehicles.get(plate)
    }

    pub fn get_part(&self, part: &PartId) -> Option<Arc<Part>> {
        self.parts.get(part)
    }

    pub fn get_rental(&self, rental: RentalId) -> Option<Arc<Rental>> {
        self.rentals.get(&rental)
    }

    pub fn get_maintenance(&self, maintenance: MaintenanceId) -> Option<Arc<Maintenance>> {
        self.maintenances.get(&maintenance)
    }

    pub fn get_deployment(&self, deployment: DeploymentId) -> Option<Arc<Deployment>> {
        self.deployments.get(&deployment)
    }

    pub fn get_penalty(&self, penalty: PenaltyId) -> Option<Arc<Penalty>> {
        self.penalties.get(&penalty)
    }

    /// Fleet overview rows, sorted by plate.
    pub fn vehicle_report(&self) -> Vec<VehicleReport> {
        let mut rows: Vec<VehicleReport> = self
            .vehicles
            .iter()
            .map(|entry| {
                let vehicle = entry.value();
                let state = vehicle.state();
                let location = state
                    .open_deployment()
                    .and_then(|id| self.deployments.get(&id))
                    .map(|deployment| deployment.location());
                VehicleReport {
                    plate: vehicle.plate().clone(),
                    kind: vehicle.kind().to_owned(),
                    daily_rate: vehicle.daily_rate(),
                    status: state.status(),
                    location,
                }
            })
            .collect();
        rows.sort_by(|a, b| a.plate.cmp(&b.plate));
        rows
    }

    /// Spare-part stock rows, sorted by part ID.
    pub fn stock_report(&self) -> Vec<Arc<Part>> {
        let mut rows: Vec<Arc<Part>> = self
            .parts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        rows.sort_by(|a, b| a.id().cmp(b.id()));
        rows
    }
}

impl Default for Fleet {
    fn default() -> Self {
        Self::new()
    }
}
