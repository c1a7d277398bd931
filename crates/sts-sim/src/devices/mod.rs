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

use crate::context::SimulationContext;
use crate::payload::Payload;
use crate::registry::FaultSnapshot;

pub mod battery;
pub mod substation;
pub mod transformer;
pub mod waterline;

pub use battery::{BatteryCharger, BatteryFault};
pub use substation::{Substation, SubstationFault};
pub use transformer::{Transformer, TransformerClass, TransformerFault, TransformerStop};
pub use waterline::{WaterLine, WaterLineFault};

/// Capability shared by every simulated device: consume the fault
/// snapshot, advance the trend state, return one flat payload.
///
/// The scheduler loop holds a sequence of these and never branches on the
/// concrete device type.
pub trait TelemetrySource: Send + Sync {
    fn name(&self) -> &str;

    /// Key under which the device's aggregate status code is emitted,
    /// extracted into its own sub-payload in per-device publish mode.
    fn status_key(&self) -> String {
        format!("{}_status", self.name())
    }

    fn update_data(
        &mut self,
        ctx: &mut SimulationContext,
        faults: &FaultSnapshot,
    ) -> Result<Payload>;
}

/// The configured substation fleet: two transformers, the battery
/// charger, the control room, and the water line when present.
pub fn standard_fleet(waterline: bool) -> Vec<Box<dyn TelemetrySource>> {
    let mut fleet: Vec<Box<dyn TelemetrySource>> = vec![
        Box::new(Transformer::new("T3", TransformerClass::T3)),
        Box::new(Transformer::new("T4", TransformerClass::T4)),
        Box::new(BatteryCharger::new()),
        Box::new(Substation::new()),
    ];
    if waterline {
        fleet.push(Box::new(WaterLine::new()));
    }
    fleet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_fleet_names_are_unique() {
        let fleet = standard_fleet(true);
        assert_eq!(fleet.len(), 5);
        let names: Vec<&str> = fleet.iter().map(|device| device.name()).collect();
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len());
    }

    #[test]
    fn waterline_is_config_gated() {
        let fleet = standard_fleet(false);
        assert!(fleet.iter().all(|device| device.name() != "waterline"));
    }
}
