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

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, ValueEnum};
use csv::{ReaderBuilder, Trim, Writer};
use fleet_engine_rs::{
    CustomerId, DeploymentId, Fleet, FleetError, LocationId, MaintenanceId, PartId, PenaltyId,
    PenaltyStatus, PlateId, RentalId, TechnicianId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;

/// Fleet Engine - Process fleet command CSV files
///
/// Reads fleet commands from a CSV file, runs them through the engine and
/// writes a report to stdout. Rejected commands are logged (`RUST_LOG`)
/// and skipped; processing continues.
#[derive(Parser, Debug)]
#[command(name = "fleet-engine-rs")]
#[command(about = "A fleet engine that processes command CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with fleet commands
    ///
    /// Expected columns: op,plate,customer,location,technician,part,id,maint,qty,amount,text,date
    /// Example: cargo run -- fleet.csv > vehicles.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Which report to write to stdout
    #[arg(long, value_enum, default_value = "vehicles")]
    report: Report,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Report {
    /// One row per vehicle: plate, kind, daily rate, status, location
    Vehicles,
    /// One row per part: part, name, quantity, price, active
    Stock,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let fleet = match process_commands(BufReader::new(file)) {
        Ok(fleet) => fleet,
        Err(e) => {
            eprintln!("Error processing commands: {}", e);
            process::exit(1);
        }
    };

    let result = match args.report {
        Report::Vehicles => write_vehicle_report(&fleet, std::io::stdout()),
        Report::Stock => write_stock_report(&fleet, std::io::stdout()),
    };
    if let Err(e) = result {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Numeric record IDs (`id`, `maint`) refer to the sequence numbers the
/// engine allocates: the first booked rental is 1, the second 2, and so
/// on per record type.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    op: String,
    #[serde(default)]
    plate: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    customer: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    location: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    technician: Option<u32>,
    #[serde(default)]
    part: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    id: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    maint: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    qty: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

impl CsvRecord {
    fn plate(&self) -> Option<PlateId> {
        self.plate
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(PlateId::from)
    }

    fn part(&self) -> Option<PartId> {
        self.part
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(PartId::from)
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.date.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn day(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.as_deref()?, "%Y-%m-%d").ok()
    }

    /// Runs the command against the engine.
    ///
    /// Returns `None` for unknown ops or missing fields (the row is
    /// skipped), `Some(result)` with the engine's verdict otherwise.
    fn apply(&self, fleet: &Fleet) -> Option<Result<(), FleetError>> {
        match self.op.to_lowercase().as_str() {
            "vehicle" => {
                let plate = self.plate()?;
                let kind = self.text.clone()?;
                let rate = self.amount?;
                Some(fleet.register_vehicle(plate, kind, rate))
            }
            "part" => {
                let part = self.part()?;
                let name = self.text.clone()?;
                Some(fleet.register_part(part, name, self.qty?, self.amount?))
            }
            "restock" => Some(fleet.restock_part(&self.part()?, self.qty?)),
            "retire" => Some(fleet.retire_vehicle(&self.plate()?)),
            "reinstate" => Some(fleet.reinstate_vehicle(&self.plate()?)),
            "book" => {
                let plate = self.plate()?;
                let customer = CustomerId(self.customer?);
                let location = LocationId(self.location?);
                let pickup = self.timestamp()?;
                Some(fleet.book_rental(customer, &plate, location, pickup).map(|_| ()))
            }
            "pickup" => Some(fleet.record_pickup(RentalId(self.id?), self.timestamp()?)),
            "complete" => Some(fleet.complete_rental(RentalId(self.id?), self.timestamp()?)),
            "cancel" => Some(fleet.cancel_rental(RentalId(self.id?))),
            "reactivate" => Some(fleet.reactivate_rental(RentalId(self.id?))),
            "deploy" => {
                let plate = self.plate()?;
                let location = LocationId(self.location?);
                Some(
                    fleet
                        .start_deployment(&plate, location, self.day()?)
                        .map(|_| ()),
                )
            }
            "end_deploy" => Some(fleet.end_deployment(DeploymentId(self.id?), self.day()?)),
            "open_maintenance" => {
                let plate = self.plate()?;
                let technician = TechnicianId(self.technician?);
                Some(
                    fleet
                        .open_maintenance(&plate, technician, self.timestamp()?)
                        .map(|_| ()),
                )
            }
            "use_part" => {
                Some(fleet.add_part_usage(MaintenanceId(self.maint?), &self.part()?, self.qty?))
            }
            "close_maintenance" => Some(fleet.close_maintenance(
                MaintenanceId(self.maint?),
                self.timestamp()?,
                self.amount,
            )),
            "void_line" => {
                Some(fleet.deactivate_cheque_line(MaintenanceId(self.maint?), &self.part()?))
            }
            "restore_line" => {
                Some(fleet.reactivate_cheque_line(MaintenanceId(self.maint?), &self.part()?))
            }
            "void_maintenance" => Some(fleet.deactivate_maintenance(MaintenanceId(self.maint?))),
            "restore_maintenance" => Some(fleet.reactivate_maintenance(MaintenanceId(self.maint?))),
            "penalty" => {
                let rental = RentalId(self.id?);
                let amount = self.amount?;
                let issued = self.day()?;
                Some(match self.maint {
                    Some(maint) => fleet
                        .assess_from_maintenance(rental, MaintenanceId(maint), amount, issued)
                        .map(|_| ()),
                    None => fleet.assess_penalty(rental, amount, issued).map(|_| ()),
                })
            }
            "pay_penalty" => {
                Some(fleet.update_penalty_status(PenaltyId(self.id?), PenaltyStatus::Paid))
            }
            "waive_penalty" => {
                Some(fleet.update_penalty_status(PenaltyId(self.id?), PenaltyStatus::Waived))
            }
            _ => None,
        }
    }
}

/// Process fleet commands from a CSV reader.
///
/// Streams the file row by row, so command logs of any size can be
/// replayed without loading them into memory. Malformed rows and rejected
/// commands are logged and skipped; the engine state reflects every
/// command that succeeded.
///
/// # CSV Format
///
/// Expected columns:
/// `op,plate,customer,location,technician,part,id,maint,qty,amount,text,date`
///
/// Timestamps are RFC 3339 (`2025-06-01T09:00:00Z`); deployment and
/// penalty dates are `YYYY-MM-DD`.
///
/// # Example
///
/// ```csv
/// op,plate,customer,location,technician,part,id,maint,qty,amount,text,date
/// vehicle,ES-001,,,,,,,,25.00,scooter,
/// book,ES-001,7,1,,,,,,,,2025-06-01T09:00:00Z
/// complete,,,,,,1,,,,,2025-06-01T17:00:00Z
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is
/// invalid. Individual command errors don't stop processing.
pub fn process_commands<R: Read>(reader: R) -> Result<Fleet, csv::Error> {
    let fleet = Fleet::new();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        match result {
            Ok(record) => match record.apply(&fleet) {
                None => {
                    tracing::warn!(op = %record.op, "skipping invalid command record");
                }
                Some(Err(e)) => {
                    tracing::warn!(op = %record.op, error = %e, "command rejected");
                }
                Some(Ok(())) => {}
            },
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed row");
                continue;
            }
        }
    }

    Ok(fleet)
}

/// Write the vehicle overview to a CSV writer.
///
/// Columns: `plate,kind,daily_rate,status,location`; rows sorted by plate.
pub fn write_vehicle_report<W: Write>(fleet: &Fleet, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for row in fleet.vehicle_report() {
        wtr.serialize(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the spare-part stock report to a CSV writer.
///
/// Columns: `part,name,quantity,price,active`; rows sorted by part ID.
pub fn write_stock_report<W: Write>(fleet: &Fleet, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for part in fleet.stock_report() {
        wtr.serialize(part.as_ref())?;
    }
    wtr.flush()?;
    Ok(())
}
