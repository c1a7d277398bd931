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

/// Registry target for the 125 V DC battery charger.
pub const TARGET: &str = "BATTERY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum BatteryFault {
    Fault,
}

impl BatteryFault {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

const VOLTAGE: TrendSpec = TrendSpec {
    nominal: 125.0,
    min: 122.0,
    max: 128.0,
    step: 0.5,
    oscillation: 0.2,
};
const VOLTAGE_FAULT: TrendSpec = TrendSpec {
    nominal: 110.0,
    min: 104.0,
    max: 116.0,
    step: 1.0,
    oscillation: 0.25,
};
const CURRENT: TrendSpec = TrendSpec {
    nominal: 5.0,
    min: 3.0,
    max: 7.0,
    step: 0.4,
    oscillation: 0.2,
};
// Negative: the bank discharges while the charger is out.
const CURRENT_FAULT: TrendSpec = TrendSpec {
    nominal: -15.0,
    min: -21.0,
    max: -9.0,
    step: 1.0,
    oscillation: 0.25,
};
const STATE_OF_CHARGE: TrendSpec = TrendSpec {
    nominal: 98.0,
    min: 95.0,
    max: 100.0,
    step: 0.3,
    oscillation: 0.15,
};
const TEMPERATURE: TrendSpec = TrendSpec {
    nominal: 30.0,
    min: 27.0,
    max: 33.0,
    step: 0.4,
    oscillation: 0.2,
};

/// Station battery charger model.
#[derive(Debug, Default)]
pub struct BatteryCharger;

impl BatteryCharger {
    pub fn new() -> Self {
        Self
    }
}

impl TelemetrySource for BatteryCharger {
    fn name(&self) -> &str {
        "battery"
    }

    fn update_data(
        &mut self,
        ctx: &mut SimulationContext,
        faults: &FaultSnapshot,
    ) -> Result<Payload> {
        let is_fault = faults.is_active(TARGET, BatteryFault::Fault.name());
        let status = DeviceStatus::resolve(is_fault, false);

        let (voltage, current, charger_status) = if is_fault {
            (
                ctx.trend("battery_voltage_fault", &VOLTAGE_FAULT),
                ctx.trend("battery_current_fault", &CURRENT_FAULT),
                "FAULT",
            )
        } else {
            (
                ctx.trend("battery_voltage", &VOLTAGE),
                ctx.trend("battery_current", &CURRENT),
                "FLOAT",
            )
        };

        let mut payload = Payload::new();
        payload.insert("battery_voltage_V".to_owned(), Value::from(voltage));
        payload.insert("battery_current_A".to_owned(), Value::from(current));
        payload.insert(
            "battery_state_of_charge_pct".to_owned(),
            Value::from(ctx.trend("battery_soc", &STATE_OF_CHARGE)),
        );
        payload.insert(
            "battery_temp_C".to_owned(),
            Value::from(ctx.trend("battery_temp", &TEMPERATURE)),
        );
        payload.insert("charger_status".to_owned(), Value::from(charger_status));
        payload.insert("battery_status".to_owned(), Value::from(status.code()));
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
    fn float_charging_envelopes() {
        let mut ctx = SimulationContext::new(31);
        let mut charger = BatteryCharger::new();
        for _ in 0..50 {
            let payload = charger
                .update_data(&mut ctx, &FaultSnapshot::default())
                .unwrap();
            let voltage = number(&payload, "battery_voltage_V");
            assert!((122.0..=128.0).contains(&voltage), "voltage {voltage}");
            let current = number(&payload, "battery_current_A");
            assert!((3.0..=7.0).contains(&current), "current {current}");
            assert_eq!(payload["charger_status"], "FLOAT");
            assert_eq!(number(&payload, "battery_status"), 0.0);
        }
    }

    #[test]
    fn charger_fault_discharges_the_bank() {
        let registry = FaultRegistry::new();
        registry.toggle(TARGET, "fault");
        let faults = registry.snapshot();

        let mut ctx = SimulationContext::new(32);
        let mut charger = BatteryCharger::new();
        for _ in 0..50 {
            let payload = charger.update_data(&mut ctx, &faults).unwrap();
            let voltage = number(&payload, "battery_voltage_V");
            assert!((104.0..=116.0).contains(&voltage), "voltage {voltage}");
            let current = number(&payload, "battery_current_A");
            assert!((-21.0..=-9.0).contains(&current), "current {current}");
            assert_eq!(payload["charger_status"], "FAULT");
            assert_eq!(number(&payload, "battery_status"), 1.0);
        }
    }
}
