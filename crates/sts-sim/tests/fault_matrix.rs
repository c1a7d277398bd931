//! ---
//! sts_section: "02-telemetry-generator"
//! sts_subsection: "module"
//! sts_type: "source"
//! sts_scope: "code"
//! sts_description: "Fault-combination envelope sweep across the device fleet."
//! sts_version: "v0.1.0"
//! sts_owner: "tbd"
//! ---
use serde_json::Value;

use sts_sim::{standard_fleet, FaultRegistry, Payload, SimulationContext, TelemetrySource};

const TICKS: usize = 40;

fn number(payload: &Payload, key: &str) -> f64 {
    payload
        .get(key)
        .and_then(Value::as_f64)
        .unwrap_or_else(|| panic!("missing numeric field {key}"))
}

/// Documented [min, max] envelope for a field under a given fault set.
struct Envelope {
    key: &'static str,
    min: f64,
    max: f64,
}

/// One scenario: faults to activate and the envelopes they select.
struct Scenario {
    faults: &'static [(&'static str, &'static str)],
    envelopes: &'static [Envelope],
    statuses: &'static [(&'static str, f64)],
}

const SCENARIOS: &[Scenario] = &[
    Scenario {
        faults: &[],
        envelopes: &[
            Envelope { key: "T3_transformer_load_pct", min: 60.0, max: 90.0 },
            Envelope { key: "T3_oil_pressure", min: 28.0, max: 32.0 },
            Envelope { key: "T4_cooling_flow_lps", min: 35.0, max: 45.0 },
            Envelope { key: "battery_voltage_V", min: 122.0, max: 128.0 },
            Envelope { key: "grid_frequency_Hz", min: 49.9, max: 50.1 },
            Envelope { key: "water_flow_lpm", min: 110.0, max: 130.0 },
        ],
        statuses: &[
            ("T3_status", 0.0),
            ("T4_status", 0.0),
            ("battery_status", 0.0),
            ("substation_status", 0.0),
            ("waterline_status", 0.0),
        ],
    },
    Scenario {
        faults: &[("T3", "overload"), ("T3", "oil_pressure_high")],
        envelopes: &[
            Envelope { key: "T3_transformer_load_pct", min: 100.0, max: 120.0 },
            Envelope { key: "T3_oil_pressure", min: 34.0, max: 38.0 },
            // Untouched siblings stay in their nominal envelopes.
            Envelope { key: "T4_transformer_load_pct", min: 60.0, max: 90.0 },
            Envelope { key: "T4_oil_pressure", min: 28.0, max: 32.0 },
        ],
        statuses: &[("T3_status", 1.0), ("T4_status", 0.0)],
    },
    Scenario {
        faults: &[
            ("T4", "cooling_fault"),
            ("T4", "c2h2_spike"),
            ("BATTERY", "fault"),
        ],
        envelopes: &[
            Envelope { key: "T4_cooling_flow_lps", min: 2.0, max: 14.0 },
            Envelope { key: "T4_C2H2_ppm", min: 10.0, max: 20.0 },
            Envelope { key: "battery_voltage_V", min: 104.0, max: 116.0 },
            Envelope { key: "battery_current_A", min: -21.0, max: -9.0 },
        ],
        statuses: &[("T4_status", 1.0), ("battery_status", 1.0)],
    },
    Scenario {
        faults: &[
            ("SUBSTATION", "hvac_fault"),
            ("SUBSTATION", "flood"),
            ("WATERLINE", "leak"),
        ],
        envelopes: &[
            Envelope { key: "room_temp_control", min: 28.0, max: 36.0 },
            Envelope { key: "water_inlet_pressure_kpa", min: 120.0, max: 180.0 },
            Envelope { key: "water_flow_lpm", min: 40.0, max: 80.0 },
        ],
        statuses: &[
            ("substation_status", 1.0),
            ("waterline_status", 1.0),
            ("flood_sensor_status", 1.0),
        ],
    },
];

fn run_fleet(
    fleet: &mut [Box<dyn TelemetrySource>],
    ctx: &mut SimulationContext,
    registry: &FaultRegistry,
) -> Payload {
    let snapshot = registry.snapshot();
    let mut merged = Payload::new();
    for device in fleet.iter_mut() {
        merged.extend(device.update_data(ctx, &snapshot).unwrap());
    }
    merged
}

#[test]
fn every_scenario_stays_inside_its_envelopes() {
    for (index, scenario) in SCENARIOS.iter().enumerate() {
        let mut ctx = SimulationContext::new(100 + index as u64);
        let mut fleet = standard_fleet(true);
        let registry = FaultRegistry::new();
        for (target, fault) in scenario.faults {
            registry.toggle(target, fault);
        }
        for _ in 0..TICKS {
            let payload = run_fleet(&mut fleet, &mut ctx, &registry);
            for envelope in scenario.envelopes {
                let value = number(&payload, envelope.key);
                assert!(
                    (envelope.min..=envelope.max).contains(&value),
                    "scenario {index}: {} = {value} outside [{}, {}]",
                    envelope.key,
                    envelope.min,
                    envelope.max
                );
            }
            for (key, expected) in scenario.statuses {
                assert_eq!(
                    number(&payload, key),
                    *expected,
                    "scenario {index}: wrong {key}"
                );
            }
        }
    }
}

#[test]
fn clearing_faults_returns_every_device_to_normal() {
    let mut ctx = SimulationContext::new(200);
    let mut fleet = standard_fleet(true);
    let registry = FaultRegistry::new();
    registry.toggle("T3", "overload");
    registry.toggle("T4", "pump1_fault");
    registry.toggle("BATTERY", "fault");
    registry.toggle("SUBSTATION", "flood");
    registry.toggle("WATERLINE", "pump_trip");

    let faulted = run_fleet(&mut fleet, &mut ctx, &registry);
    assert_eq!(number(&faulted, "T3_status"), 1.0);
    assert_eq!(number(&faulted, "waterline_status"), 1.0);

    registry.clear_all();
    let payload = run_fleet(&mut fleet, &mut ctx, &registry);
    for key in [
        "T3_status",
        "T4_status",
        "battery_status",
        "substation_status",
        "waterline_status",
        "flood_sensor_status",
    ] {
        assert_eq!(number(&payload, key), 0.0, "{key} not normal after clear");
    }
    let load = number(&payload, "T3_transformer_load_pct");
    assert!((60.0..=90.0).contains(&load));
}
