//! Simple REST API server example for the fleet engine.
//!
//! Run with: `cargo run --example server`
//!
//! ## Endpoints
//!
//! - `POST /commands` - Run a fleet command (book, complete, open
//!   maintenance, record part usage, ...)
//! - `GET /vehicles` - Fleet overview (status and current location)
//! - `GET /vehicles/{plate}` - One vehicle by plate
//! - `GET /parts` - Spare-part stock levels
//! - `GET /penalties/{id}` - Penalty statement with parents resolved
//!
//! ## Example Usage
//!
//! ```bash
//! # Register a vehicle
//! curl -X POST http://localhost:3000/commands \
//!   -H "Content-Type: application/json" \
//!   -d '{"type": "register_vehicle", "plate": "ES-001", "kind": "scooter", "daily_rate": "25.00"}'
//!
//! # Book it
//! curl -X POST http://localhost:3000/commands \
//!   -H "Content-Type: application/json" \
//!   -d '{"type": "book_rental", "customer": 7, "plate": "ES-001", "location": 1, "pickup_time": "2025-06-01T09:00:00Z"}'
//!
//! # Fleet overview
//! curl http://localhost:3000/vehicles
//! ```

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, NaiveDate, Utc};
use fleet_engine_rs::{
    CustomerId, DeploymentId, Fleet, FleetError, LocationId, MaintenanceId, PartId, PenaltyId,
    PenaltyStatus, PlateId, RentalId, TechnicianId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

// === Request/Response DTOs ===

/// Request body for fleet commands.
///
/// Uses a tagged enum for clean JSON representation:
/// ```json
/// {"type": "book_rental", "customer": 7, "plate": "ES-001", "location": 1, "pickup_time": "2025-06-01T09:00:00Z"}
/// ```
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandRequest {
    RegisterVehicle {
        plate: String,
        kind: String,
        daily_rate: Decimal,
    },
    RegisterPart {
        part: String,
        name: String,
        quantity: u32,
        price: Decimal,
    },
    RestockPart {
        part: String,
        quantity: u32,
    },
    BookRental {
        customer: u32,
        plate: String,
        location: u32,
        pickup_time: DateTime<Utc>,
    },
    RecordPickup {
        rental: u32,
        at: DateTime<Utc>,
    },
    CompleteRental {
        rental: u32,
        end: DateTime<Utc>,
    },
    CancelRental {
        rental: u32,
    },
    ReactivateRental {
        rental: u32,
    },
    StartDeployment {
        plate: String,
        location: u32,
        date: NaiveDate,
    },
    EndDeployment {
        deployment: u32,
        date: NaiveDate,
    },
    OpenMaintenance {
        plate: String,
        technician: u32,
        start: DateTime<Utc>,
    },
    AddPartUsage {
        maintenance: u32,
        part: String,
        quantity: u32,
    },
    CloseMaintenance {
        maintenance: u32,
        end: DateTime<Utc>,
        total_cost: Option<Decimal>,
    },
    DeactivateChequeLine {
        maintenance: u32,
        part: String,
    },
    ReactivateChequeLine {
        maintenance: u32,
        part: String,
    },
    DeactivateMaintenance {
        maintenance: u32,
    },
    ReactivateMaintenance {
        maintenance: u32,
    },
    AssessFromMaintenance {
        rental: u32,
        maintenance: u32,
        amount: Decimal,
        issued: NaiveDate,
    },
    UpdatePenaltyStatus {
        penalty: u32,
        status: PenaltyStatus,
    },
}

/// Response body for accepted commands. Allocated record IDs (rental,
/// maintenance, deployment, penalty) are echoed back when the command
/// created one.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub id: Option<u32>,
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

/// Shared application state containing the fleet engine.
#[derive(Clone)]
pub struct AppState {
    pub fleet: Arc<Fleet>,
}

// === Error Handling ===

/// Wrapper for converting `FleetError` into HTTP responses.
pub struct AppError(FleetError);

impl From<FleetError> for AppError {
    fn from(err: FleetError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            FleetError::VehicleNotFound(_) => (StatusCode::NOT_FOUND, "VEHICLE_NOT_FOUND"),
            FleetError::PartNotFound(_) => (StatusCode::NOT_FOUND, "PART_NOT_FOUND"),
            FleetError::RentalNotFound(_) => (StatusCode::NOT_FOUND, "RENTAL_NOT_FOUND"),
            FleetError::MaintenanceNotFound(_) => (StatusCode::NOT_FOUND, "MAINTENANCE_NOT_FOUND"),
            FleetError::DeploymentNotFound(_) => (StatusCode::NOT_FOUND, "DEPLOYMENT_NOT_FOUND"),
            FleetError::PenaltyNotFound(_) => (StatusCode::NOT_FOUND, "PENALTY_NOT_FOUND"),
            FleetError::ChequeLineNotFound { .. } => (StatusCode::NOT_FOUND, "CHEQUE_LINE_NOT_FOUND"),
            FleetError::DuplicateVehicle(_) => (StatusCode::CONFLICT, "DUPLICATE_VEHICLE"),
            FleetError::DuplicatePart(_) => (StatusCode::CONFLICT, "DUPLICATE_PART"),
            FleetError::VehicleConflict { .. } => (StatusCode::CONFLICT, "VEHICLE_CONFLICT"),
            FleetError::RentalNotActive { .. } => (StatusCode::CONFLICT, "RENTAL_NOT_ACTIVE"),
            FleetError::RentalNotCancelled { .. } => (StatusCode::CONFLICT, "RENTAL_NOT_CANCELLED"),
            FleetError::PickupNotRecorded(_) => (StatusCode::CONFLICT, "PICKUP_NOT_RECORDED"),
            FleetError::PickupAlreadyRecorded(_) => {
                (StatusCode::CONFLICT, "PICKUP_ALREADY_RECORDED")
            }
            FleetError::MaintenanceClosed(_) => (StatusCode::CONFLICT, "MAINTENANCE_CLOSED"),
            FleetError::MaintenanceInactive(_) => (StatusCode::CONFLICT, "MAINTENANCE_INACTIVE"),
            FleetError::ChequeLineExists { .. } => (StatusCode::CONFLICT, "CHEQUE_LINE_EXISTS"),
            FleetError::CostMismatch { .. } => (StatusCode::CONFLICT, "COST_MISMATCH"),
            FleetError::DeploymentClosed(_) => (StatusCode::CONFLICT, "DEPLOYMENT_CLOSED"),
            FleetError::InsufficientStock { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_STOCK")
            }
            FleetError::ConcurrentModification => {
                (StatusCode::SERVICE_UNAVAILABLE, "CONCURRENT_MODIFICATION")
            }
            FleetError::ReferentialIntegrity { .. } => {
                (StatusCode::CONFLICT, "REFERENTIAL_INTEGRITY")
            }
            FleetError::InvalidAmount => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
            FleetError::InvalidQuantity => (StatusCode::BAD_REQUEST, "INVALID_QUANTITY"),
            FleetError::InvalidTimestamp => (StatusCode::BAD_REQUEST, "INVALID_TIMESTAMP"),
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// POST /commands - Run a fleet command.
async fn run_command(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> Result<(StatusCode, Json<CommandResponse>), AppError> {
    let fleet = &state.fleet;
    let id = match request {
        CommandRequest::RegisterVehicle {
            plate,
            kind,
            daily_rate,
        } => {
            fleet.register_vehicle(PlateId(plate), kind, daily_rate)?;
            None
        }
        CommandRequest::RegisterPart {
            part,
            name,
            quantity,
            price,
        } => {
            fleet.register_part(PartId(part), name, quantity, price)?;
            None
        }
        CommandRequest::RestockPart { part, quantity } => {
            fleet.restock_part(&PartId(part), quantity)?;
            None
        }
        CommandRequest::BookRental {
            customer,
            plate,
            location,
            pickup_time,
        } => Some(
            fleet
                .book_rental(
                    CustomerId(customer),
                    &PlateId(plate),
                    LocationId(location),
                    pickup_time,
                )?
                .0,
        ),
        CommandRequest::RecordPickup { rental, at } => {
            fleet.record_pickup(RentalId(rental), at)?;
            None
        }
        CommandRequest::CompleteRental { rental, end } => {
            fleet.complete_rental(RentalId(rental), end)?;
            None
        }
        CommandRequest::CancelRental { rental } => {
            fleet.cancel_rental(RentalId(rental))?;
            None
        }
        CommandRequest::ReactivateRental { rental } => {
            fleet.reactivate_rental(RentalId(rental))?;
            None
        }
        CommandRequest::StartDeployment {
            plate,
            location,
            date,
        } => Some(
            fleet
                .start_deployment(&PlateId(plate), LocationId(location), date)?
                .0,
        ),
        CommandRequest::EndDeployment { deployment, date } => {
            fleet.end_deployment(DeploymentId(deployment), date)?;
            None
        }
        CommandRequest::OpenMaintenance {
            plate,
            technician,
            start,
        } => Some(
            fleet
                .open_maintenance(&PlateId(plate), TechnicianId(technician), start)?
                .0,
        ),
        CommandRequest::AddPartUsage {
            maintenance,
            part,
            quantity,
        } => {
            fleet.add_part_usage(MaintenanceId(maintenance), &PartId(part), quantity)?;
            None
        }
        CommandRequest::CloseMaintenance {
            maintenance,
            end,
            total_cost,
        } => {
            fleet.close_maintenance(MaintenanceId(maintenance), end, total_cost)?;
            None
        }
        CommandRequest::DeactivateChequeLine { maintenance, part } => {
            fleet.deactivate_cheque_line(MaintenanceId(maintenance), &PartId(part))?;
            None
        }
        CommandRequest::ReactivateChequeLine { maintenance, part } => {
            fleet.reactivate_cheque_line(MaintenanceId(maintenance), &PartId(part))?;
            None
        }
        CommandRequest::DeactivateMaintenance { maintenance } => {
            fleet.deactivate_maintenance(MaintenanceId(maintenance))?;
            None
        }
        CommandRequest::ReactivateMaintenance { maintenance } => {
            fleet.reactivate_maintenance(MaintenanceId(maintenance))?;
            None
        }
        CommandRequest::AssessFromMaintenance {
            rental,
            maintenance,
            amount,
            issued,
        } => Some(
            fleet
                .assess_from_maintenance(
                    RentalId(rental),
                    MaintenanceId(maintenance),
                    amount,
                    issued,
                )?
                .0,
        ),
        CommandRequest::UpdatePenaltyStatus { penalty, status } => {
            fleet.update_penalty_status(PenaltyId(penalty), status)?;
            None
        }
    };

    Ok((StatusCode::CREATED, Json(CommandResponse { id })))
}

/// GET /vehicles - Fleet overview.
async fn list_vehicles(State(state): State<AppState>) -> Json<Vec<fleet_engine_rs::VehicleReport>> {
    Json(state.fleet.vehicle_report())
}

/// GET /vehicles/{plate} - One vehicle by plate.
async fn get_vehicle(
    State(state): State<AppState>,
    Path(plate): Path<String>,
) -> Result<Json<fleet_engine_rs::VehicleReport>, AppError> {
    let plate = PlateId(plate);
    state
        .fleet
        .vehicle_report()
        .into_iter()
        .find(|row| row.plate == plate)
        .map(Json)
        .ok_or_else(|| AppError(FleetError::VehicleNotFound(plate)))
}

/// GET /parts - Spare-part stock levels.
async fn list_parts(State(state): State<AppState>) -> Response {
    let rows = state.fleet.stock_report();
    let refs: Vec<&fleet_engine_rs::Part> = rows.iter().map(|part| part.as_ref()).collect();
    Json(refs).into_response()
}

/// GET /penalties/{id} - Penalty statement with parents resolved.
async fn get_penalty(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<fleet_engine_rs::PenaltyStatement>, AppError> {
    Ok(Json(state.fleet.penalty_statement(PenaltyId(id))?))
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/commands", post(run_command))
        .route("/vehicles", get(list_vehicles))
        .route("/vehicles/{plate}", get(get_vehicle))
        .route("/parts", get(list_parts))
        .route("/penalties/{id}", get(get_penalty))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() {
    let state = AppState {
        fleet: Arc::new(Fleet::new()),
    };

    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await.unwrap();
    println!("Fleet API server running on http://127.0.0.1:3000");
    println!();
    println!("Endpoints:");
    println!("  POST /commands         - Run a fleet command");
    println!("  GET  /vehicles         - Fleet overview");
    println!("  GET  /vehicles/:plate  - Get vehicle by plate");
    println!("  GET  /parts            - Stock levels");
    println!("  GET  /penalties/:id    - Penalty statement");

    axum::serve(listener, app).await.unwrap();
}
