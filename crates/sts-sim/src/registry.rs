//! ---
//! sts_section: "02-telemetry-generator"
//! sts_subsection: "module"
//! sts_type: "source"
//! sts_scope: "code"
//! sts_description: "Shared fault registry read by the device models."
//! sts_version: "v0.1.0"
//! sts_owner: "tbd"
//! ---
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

/// Shared mapping from target identifier to the set of fault names
/// currently active for that target.
///
/// Mutated only by the control surface; the generator takes a
/// [`FaultSnapshot`] once per tick and resolves every flag against it, so
/// a toggle arriving mid-tick can never half-apply. An absent target or
/// an unrecognized fault name reads as inactive, never as an error.
#[derive(Debug, Default)]
pub struct FaultRegistry {
    inner: RwLock<IndexMap<String, IndexSet<String>>>,
}

impl FaultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, target: &str, fault: &str) -> bool {
        self.inner
            .read()
            .get(target)
            .map(|faults| faults.contains(fault))
            .unwrap_or(false)
    }

    /// Add the fault if absent, remove it if present. Returns the new
    /// state: `true` when the fault is now active.
    pub fn toggle(&self, target: &str, fault: &str) -> bool {
        let mut inner = self.inner.write();
        let faults = inner.entry(target.to_owned()).or_default();
        let now_active = if faults.shift_remove(fault) {
            false
        } else {
            faults.insert(fault.to_owned());
            true
        };
        if !now_active && faults.is_empty() {
            inner.shift_remove(target);
        }
        debug!(target_id = %target, fault_name = %fault, active = now_active, "fault toggled");
        now_active
    }

    /// Reset every target to normal operation.
    pub fn clear_all(&self) {
        self.inner.write().clear();
        debug!("all faults cleared");
    }

    pub fn active_fault_count(&self) -> usize {
        self.inner.read().values().map(|faults| faults.len()).sum()
    }

    /// Consistent copy of the registry for one tick's read pass.
    pub fn snapshot(&self) -> FaultSnapshot {
        FaultSnapshot {
            active: self.inner.read().clone(),
        }
    }
}

/// Point-in-time view of the registry handed to the device models.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FaultSnapshot {
    active: IndexMap<String, IndexSet<String>>,
}

impl FaultSnapshot {
    pub fn is_active(&self, target: &str, fault: &str) -> bool {
        self.active
            .get(target)
            .map(|faults| faults.contains(fault))
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.active.values().all(|faults| faults.is_empty())
    }
}
