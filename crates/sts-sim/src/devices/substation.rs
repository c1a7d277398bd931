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

/// Registry target for the control room.
pub const TARGET: &str = "SUBSTATION";

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SubstationFault {
    Flood,
    HvacFault,
}

impl SubstationFault {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

const ROOM_TEMP: TrendSpec = TrendSpec {
    nominal: 22.0,
    min: 20.0,
    max: 24.0,
    step: 0.3,
    oscillation: 0.2,
};
const ROOM_TEMP_HVAC_FAULT: TrendSpec = TrendSpec {
    nominal: 32.0,
    min: 28.0,
    max: 36.0,
    step: 0.6,
    oscillation: 0.25,
};
const GRID_FREQUENCY: TrendSpec = TrendSpec {
    nominal: 50.0,
    min: 49.9,
    max: 50.1,
    step: 0.02,
    oscillation: 0.3,
};

/// Control-room environment model.
#[derive(Debug, Default)]
pub struct Substation;

impl Substation {
    pub fn new() -> Self {
        Self
    }
}

impl TelemetrySource for Substation {
    fn name(&self) -> &str {
        "substation"
    }

    fn update_data(
        &mut self,
        ctx: &mut SimulationContext,
        faults: &FaultSnapshot,
    ) -> Result<Payload> {
        let is_flood = faults.is_active(TARGET, SubstationFault::Flood.name());
        let is_hvac_fault = faults.is_active(TARGET, SubstationFault::HvacFault.name());
        let status = DeviceStatus::resolve(is_flood || is_hvac_fault, false);

        let room_temp = if is_hvac_fault {
            ctx.trend("substation_room_temp_fault", &ROOM_TEMP_HVAC_FAULT)
        } else {
            ctx.trend("substation_room_temp", &ROOM_TEMP)
        };

        let mut payload = Payload::new();
        payload.insert("room_temp_control".to_owned(), Value::from(room_temp));
        payload.insert(
            "grid_frequency_Hz".to_owned(),
            Value::from(ctx.trend("substation_grid_frequency", &GRID_FREQUENCY)),
        );
        payload.insert(
            "flood_sensor_status".to_owned(),
            Value::from(u8::from(is_flood)),
        );
        payload.insert("substation_status".to_owned(), Value::from(status.code()));
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FaultRegistry;

    fn number(payload: &Payload, key: &str) -> f64 {
        payload.get(key).and_then(Value::as_f64).unwrap()
    }

    #[test]
    fn quiet_room_reads_normal() {
        let mut ctx = SimulationContext::new(41);
        let mut station = Substation::new();
        for _ in 0..50 {
            let payload = station
                .update_data(&mut ctx, &FaultSnapshot::default())
                .unwrap();
            let temp = number(&payload, "room_temp_control");
            assert!((20.0..=24.0).contains(&temp), "temp {temp}");
            let frequency = number(&payload, "grid_frequency_Hz");
            assert!((49.9..=50.1).contains(&frequency), "frequency {frequency}");
            assert_eq!(number(&payload, "flood_sensor_status"), 0.0);
            assert_eq!(number(&payload, "substation_status"), 0.0);
        }
    }

    #[test]
    fn flood_raises_sensor_and_status() {
        let registry = FaultRegistry::new();
        registry.toggle(TARGET, "flood");
        let faults = registry.snapshot();

        let mut ctx = SimulationContext::new(42);
        let mut station = Substation::new();
        let payload = station.update_data(&mut ctx, &faults).unwrap();
        assert_eq!(number(&payload, "flood_sensor_status"), 1.0);
        assert_eq!(number(&payload, "substation_status"), 1.0);
    }

    #[test]
    fn hvac_fault_heats_the_room() {
        let registry = FaultRegistry::new();
        registry.toggle(TARGET, "hvac_fault");
        let faults = registry.snapshot();

        let mut ctx = SimulationContext::new(43);
        let mut station = Substation::new();
        for _ in 0..50 {
            let payload = station.update_data(&mut ctx, &faults).unwrap();
            let temp = number(&payload, "room_temp_control");
            assert!((28.0..=36.0).contains(&temp), "temp {temp}");
            assert_eq!(number(&payload, "flood_sensor_status"), 0.0);
            assert_eq!(number(&payload, "substation_status"), 1.0);
        }
    }
}
