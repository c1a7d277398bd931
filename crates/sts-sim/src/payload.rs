//! ---
//! sts_section: "02-telemetry-generator"
//! sts_subsection: "module"
//! sts_type: "source"
//! sts_scope: "code"
//! sts_description: "Payload shape and status code enums shared by the device models."
//! sts_version: "v0.1.0"
//! sts_owner: "tbd"
//! ---
use indexmap::IndexMap;
use serde_json::Value;

/// One tick's worth of readings for a device: flat field name to value,
/// produced fresh every tick.
pub type Payload = IndexMap<String, Value>;

/// Aggregate device condition, emitted as a numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Normal,
    Fault,
    ManualStop,
}

impl DeviceStatus {
    /// Precedence rule: fault beats manual-stop beats normal.
    pub fn resolve(has_fault: bool, has_manual_stop: bool) -> Self {
        if has_fault {
            DeviceStatus::Fault
        } else if has_manual_stop {
            DeviceStatus::ManualStop
        } else {
            DeviceStatus::Normal
        }
    }

    pub fn code(self) -> u8 {
        match self {
            DeviceStatus::Normal => 0,
            DeviceStatus::Fault => 1,
            DeviceStatus::ManualStop => 2,
        }
    }
}

/// Tri-state cooling pump condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    /// Held as backup, or faulted out of service.
    Standby,
    Active,
    ManualStopped,
}

impl PumpState {
    pub fn code(self) -> u8 {
        match self {
            PumpState::Standby => 0,
            PumpState::Active => 1,
            PumpState::ManualStopped => 2,
        }
    }
}
