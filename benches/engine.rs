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

//! Benchmarks for the fleet engine.
//!
//! Run with: cargo bench
//!
//! Benchmarks include:
//! - Single-threaded rental and maintenance lifecycles
//! - Multi-threaded bookings across disjoint and shared vehicles
//! - Part-stock contention
//! - Report generation scaling

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use fleet_engine_rs::{
    CustomerId, Fleet, LocationId, PartId, PlateId, TechnicianId,
};
use rayon::prelude::*;
use rust_decimal_macros::dec;
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, hour % 24, 0, 0).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, (d % 28) + 1).unwrap()
}

fn plate(index: usize) -> PlateId {
    PlateId(format!("ES-{index:05}"))
}

fn fleet_with_vehicles(count: usize) -> Fleet {
    let fleet = Fleet::new();
    for index in 0..count {
        fleet
            .register_vehicle(plate(index), "scooter".to_owned(), dec!(25.00))
            .unwrap();
    }
    fleet
}

// =============================================================================
// Single-Threaded Benchmarks
// =============================================================================

fn bench_single_booking(c: &mut Criterion) {
    c.bench_function("single_booking", |b| {
        b.iter(|| {
            let fleet = fleet_with_vehicles(1);
            let rental = fleet
                .book_rental(CustomerId(1), &plate(0), LocationId(1), at(9))
                .unwrap();
            black_box(rental);
        })
    });
}

fn bench_rental_cycle(c: &mut Criterion) {
    c.bench_function("rental_cycle", |b| {
        b.iter(|| {
            let fleet = fleet_with_vehicles(1);
            let rental = fleet
                .book_rental(CustomerId(1), &plate(0), LocationId(1), at(9))
                .unwrap();
            fleet.record_pickup(rental, at(9)).unwrap();
            fleet.complete_rental(rental, at(17)).unwrap();
            black_box(&fleet);
        })
    });
}

fn bench_booking_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("booking_throughput");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let fleet = fleet_with_vehicles(count);
                for index in 0..count {
                    let rental = fleet
                        .book_rental(CustomerId(index as u32), &plate(index), LocationId(1), at(9))
                        .unwrap();
                    black_box(rental);
                }
                black_box(&fleet);
            })
        });
    }
    group.finish();
}

fn bench_maintenance_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("maintenance_lifecycle");

    group.bench_function("open_use_close", |b| {
        b.iter(|| {
            let fleet = fleet_with_vehicles(1);
            fleet
                .register_part(PartId::from("P-010"), "brake pad".to_owned(), 100, dec!(4.50))
                .unwrap();
            let maintenance = fleet
                .open_maintenance(&plate(0), TechnicianId(1), at(8))
                .unwrap();
            fleet
                .add_part_usage(maintenance, &PartId::from("P-010"), 2)
                .unwrap();
            fleet.close_maintenance(maintenance, at(16), None).unwrap();
            black_box(&fleet);
        })
    });

    group.bench_function("deactivate_reactivate_cascade", |b| {
        b.iter(|| {
            let fleet = fleet_with_vehicles(1);
            for index in 0..4 {
                fleet
                    .register_part(
                        PartId(format!("P-{index:03}")),
                        format!("part {index}"),
                        100,
                        dec!(4.50),
                    )
                    .unwrap();
            }
            let maintenance = fleet
                .open_maintenance(&plate(0), TechnicianId(1), at(8))
                .unwrap();
            for index in 0..4 {
                fleet
                    .add_part_usage(maintenance, &PartId(format!("P-{index:03}")), 2)
                    .unwrap();
            }
            fleet.deactivate_maintenance(maintenance).unwrap();
            fleet.reactivate_maintenance(maintenance).unwrap();
            black_box(&fleet);
        })
    });

    group.finish();
}

fn bench_deployment_rotation(c: &mut Criterion) {
    c.bench_function("deployment_rotation", |b| {
        b.iter(|| {
            let fleet = fleet_with_vehicles(1);
            for step in 0..10u32 {
                fleet
                    .start_deployment(&plate(0), LocationId(step % 4 + 1), day(step))
                    .unwrap();
            }
            black_box(&fleet);
        })
    });
}

// =============================================================================
// Multi-Threaded Benchmarks
// =============================================================================

fn bench_parallel_bookings_disjoint_vehicles(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_bookings_disjoint_vehicles");

    for count in [1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let fleet = Arc::new(fleet_with_vehicles(count));

                (0..count).into_par_iter().for_each(|index| {
                    let rental = fleet
                        .book_rental(CustomerId(index as u32), &plate(index), LocationId(1), at(9))
                        .unwrap();
                    black_box(rental);
                });

                black_box(&fleet);
            })
        });
    }
    group.finish();
}

fn bench_parallel_bookings_contended_vehicle(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_bookings_contended_vehicle");

    for attempts in [100, 1_000].iter() {
        group.throughput(Throughput::Elements(*attempts as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(attempts),
            attempts,
            |b, &attempts| {
                b.iter(|| {
                    // Everyone races for the same plate; exactly one wins.
                    let fleet = Arc::new(fleet_with_vehicles(1));

                    let winners: usize = (0..attempts)
                        .into_par_iter()
                        .map(|index| {
                            fleet
                                .book_rental(
                                    CustomerId(index as u32),
                                    &plate(0),
                                    LocationId(1),
                                    at(9),
                                )
                                .is_ok() as usize
                        })
                        .sum();

                    assert_eq!(winners, 1);
                    black_box(&fleet);
                })
            },
        );
    }
    group.finish();
}

fn bench_part_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("part_contention");

    // Fewer parts = more threads competing for the same stock lock.
    for num_parts in [1usize, 4, 16].iter() {
        let sessions = 64usize;
        group.throughput(Throughput::Elements(sessions as u64));
        group.bench_with_input(
            BenchmarkId::new("parts", num_parts),
            num_parts,
            |b, &num_parts| {
                b.iter(|| {
                    let fleet = Arc::new(fleet_with_vehicles(sessions));
                    for index in 0..num_parts {
                        fleet
                            .register_part(
                                PartId(format!("P-{index:03}")),
                                format!("part {index}"),
                                1_000_000,
                                dec!(4.50),
                            )
                            .unwrap();
                    }

                    let maintenances: Vec<_> = (0..sessions)
                        .map(|index| {
                            fleet
                                .open_maintenance(&plate(index), TechnicianId(1), at(8))
                                .unwrap()
                        })
                        .collect();

                    maintenances
                        .into_par_iter()
                        .enumerate()
                        .for_each(|(index, maintenance)| {
                            let part = PartId(format!("P-{:03}", index % num_parts));
                            fleet.add_part_usage(maintenance, &part, 1).unwrap();
                        });

                    black_box(&fleet);
                })
            },
        );
    }
    group.finish();
}

// =============================================================================
// Report Benchmarks
// =============================================================================

fn bench_vehicle_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("vehicle_report");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let fleet = fleet_with_vehicles(count);
            for index in 0..count {
                fleet
                    .start_deployment(&plate(index), LocationId(1), day(0))
                    .unwrap();
            }
            b.iter(|| black_box(fleet.vehicle_report()))
        });
    }
    group.finish();
}

// =============================================================================
// Criterion Groups
// =============================================================================

criterion_group!(
    single_threaded,
    bench_single_booking,
    bench_rental_cycle,
    bench_booking_throughput,
    bench_maintenance_lifecycle,
    bench_deployment_rotation,
);

criterion_group!(
    multi_threaded,
    bench_parallel_bookings_disjoint_vehicles,
    bench_parallel_bookings_contended_vehicle,
    bench_part_contention,
);

criterion_group!(reports, bench_vehicle_report,);

criterion_main!(single_threaded, multi_threaded, reports);
