//! ---
//! sts_section: "02-telemetry-generator"
//! sts_subsection: "01-bootstrap"
//! sts_type: "source"
//! sts_scope: "code"
//! sts_description: "Telemetry generator module exports and shared types."
//! sts_version: "v0.1.0"
//! sts_owner: "tbd"
//! ---
//! Scenario-driven telemetry generation for the STS substation simulator.
//!
//! The generator turns the set of currently-active faults into
//! numerically-consistent, temporally-smooth sensor payloads: the
//! [`SimulationContext`] carries the random-walk state, the
//! [`FaultRegistry`] is the shared fault surface mutated by the control
//! layer, and each device model implements [`TelemetrySource`].

pub mod context;
pub mod devices;
pub mod payload;
pub mod registry;

pub use context::{SimulationContext, TrendSpec, TREND_STALE_AFTER};
pub use devices::{
    standard_fleet, BatteryCharger, Substation, TelemetrySource, Transformer, TransformerClass,
    WaterLine,
};
pub use payload::{DeviceStatus, Payload, PumpState};
pub use registry::{FaultRegistry, FaultSnapshot};
