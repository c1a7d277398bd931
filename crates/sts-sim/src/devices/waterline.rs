//! ---
//! sts_section: "02-telemetry-generator"
//! sts_subsection: "module"
//! sts_type: "source"
//! sts_scope: "code"
//! sts_description: "Device models producing per-tick telemetry payloads."
//! sts_version: "v0.1.0"
//! sts_owner: "tbd"
//! ---
use anyhow::Result;
use serde_json::Value;
use strum::IntoStaticStr;

use crate::context::{SimulationContext, TrendSpec};
use crate::payload::{DeviceStatus, Payload};
use crate::registry::FaultSnapshot;

use super::TelemetrySource;

/// Registry target for the water-cooling supply line.
pub const TARGET: &str = "WATERLINE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum WaterLineFault {
    Leak,
    PumpTrip,
}

impl WaterLineFault {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

const INLET_PRESSURE: TrendSpec = TrendSpec {
    nominal: 300.0,
    min: 280.0,
    max: 320.0,
    step: 5.0,
    oscillation: 0.2,
};
const INLET_PRESSURE_LEAK: TrendSpec = TrendSpec {
    nominal: 150.0,
    min: 120.0,
    max: 180.0,
    step: 8.0,
    oscillation: 0.25,
};
const INLET_PRESSURE_TRIP: TrendSpec = TrendSpec {
    nominal: 220.0,
    min: 200.0,
    max: 240.0,
    step: 5.0,
    oscillation: 0.2,
};
const FLOW: TrendSpec = TrendSpec {
    nominal: 120.0,
    min: 110.0,
    max: 130.0,
    step: 3.0,
    oscillation: 0.2,
};
const FLOW_LEAK: TrendSpec = TrendSpec {
    nominal: 60.0,
    min: 40.0,
    max: 80.0,
    step: 4.0,
    oscillation: 0.25,
};
const FLOW_TRIP: TrendSpec = TrendSpec {
    nominal: 5.0,
    min: 0.0,
    max: 12.0,
    step: 1.5,
    oscillation: 0.3,
};

const VALVE_OPEN_ABOVE_LPM: f64 = 15.0;

/// Water-cooling line model.
#[derive(Debug, Default)]
pub struct WaterLine;

impl WaterLine {
    pub fn new() -> Self {
        Self
    }
}

impl TelemetrySource for WaterLine {
    fn name(&self) -> &str {
        "waterline"
    }

    fn update_data(
        &mut self,
        ctx: &mut SimulationContext,
        faults: &FaultSnapshot,
    ) -> Result<Payload> {
        let is_leak = faults.is_active(TARGET, WaterLineFault::Leak.name());
        let is_trip = faults.is_active(TARGET, WaterLineFault::PumpTrip.name());
        let status = DeviceStatus::resolve(is_leak || is_trip, false);

        let pressure = if is_leak {
            ctx.trend("waterline_pressure_leak", &INLET_PRESSURE_LEAK)
        } else if is_trip {
            ctx.trend("waterline_pressure_trip", &INLET_PRESSURE_TRIP)
        } else {
            ctx.trend("waterline_pressure", &INLET_PRESSURE)
        };
        // A tripped pump dominates the flow reading even during a leak.
        let flow = if is_trip {
            ctx.trend("waterline_flow_trip", &FLOW_TRIP)
        } else if is_leak {
            ctx.trend("waterline_flow_leak", &FLOW_LEAK)
        } else {
            ctx.trend("waterline_flow", &FLOW)
        };
        let valve_status = if flow > VALVE_OPEN_ABOVE_LPM {
            "OPEN"
        } else {
            "CLOSED"
        };

        let mut payload = Payload::new();
        payload.insert("water_inlet_pressure_kpa".to_owned(), Value::from(pressure));
        payload.insert("water_flow_lpm".to_owned(), Value::from(flow));
        payload.insert("water_valve_status".to_owned(), Value::from(valve_status));
        payload.insert("waterline_status".to_owned(), Value::from(status.code()));
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FaultRegistry;

    fn snapshot(faults: &[&str]) -> FaultSnapshot {
        let registry = FaultRegistry::new();
        for fault in faults {
            registry.toggle(TARGET, fault);
        }
        registry.snapshot()
    }

    fn number(payload: &Payload, key: &str) -> f64 {
        payload.get(key).and_then(Value::as_f64).unwrap()
    }

    #[test]
    fn nominal_line_is_open_and_pressurised() {
        let mut ctx = SimulationContext::new(51);
        let mut line = WaterLine::new();
        for _ in 0..50 {
            let payload = line
                .update_data(&mut ctx, &FaultSnapshot::default())
                .unwrap();
            let pressure = number(&payload, "water_inlet_pressure_kpa");
            assert!((280.0..=320.0).contains(&pressure), "pressure {pressure}");
            let flow = number(&payload, "water_flow_lpm");
            assert!((110.0..=130.0).contains(&flow), "flow {flow}");
            assert_eq!(payload["water_valve_status"], "OPEN");
            assert_eq!(number(&payload, "waterline_status"), 0.0);
        }
    }

    #[test]
    fn leak_drops_pressure_and_flow() {
        let mut ctx = SimulationContext::new(52);
        let mut line = WaterLine::new();
        let faults = snapshot(&["leak"]);
        for _ in 0..50 {
            let payload = line.update_data(&mut ctx, &faults).unwrap();
            let pressure = number(&payload, "water_inlet_pressure_kpa");
            assert!((120.0..=180.0).contains(&pressure), "pressure {pressure}");
            let flow = number(&payload, "water_flow_lpm");
            assert!((40.0..=80.0).contains(&flow), "flow {flow}");
            assert_eq!(number(&payload, "waterline_status"), 1.0);
        }
    }

    #[test]
    fn pump_trip_wins_on_flow_and_closes_the_valve() {
        let mut ctx = SimulationContext::new(53);
        let mut line = WaterLine::new();
        let faults = snapshot(&["leak", "pump_trip"]);
        let payload = line.update_data(&mut ctx, &faults).unwrap();
        // Pressure still follows the leak, flow follows the tripped pump.
        let pressure = number(&payload, "water_inlet_pressure_kpa");
        assert!((120.0..=180.0).contains(&pressure));
        let flow = number(&payload, "water_flow_lpm");
        assert!((0.0..=12.0).contains(&flow));
        assert_eq!(payload["water_valve_status"], "CLOSED");
        assert_eq!(number(&payload, "waterline_status"), 1.0);
    }
}
