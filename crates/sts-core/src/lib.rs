//! ---
//! sts_section: "03-simulation-runtime"
//! sts_subsection: "01-bootstrap"
//! sts_type: "source"
//! sts_scope: "code"
//! sts_description: "Simulation runtime module exports and shared types."
//! sts_version: "v0.1.0"
//! sts_owner: "tbd"
//! ---
//! Scheduler loop and lifecycle control for the STS simulator.
//!
//! The [`Simulator`] owns the background tick loop: it paces publication,
//! reacts to live fault toggles without restarting, and hands payloads to
//! a [`TelemetrySink`].

pub mod simulator;
pub mod sink;

pub use simulator::{Simulator, SimulatorError, SimulatorStatus};
pub use sink::{LogSink, MemorySink, PublishedRecord, TelemetrySink};
