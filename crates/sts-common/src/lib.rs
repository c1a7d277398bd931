//! ---
//! sts_section: "01-core-functionality"
//! sts_subsection: "module"
//! sts_type: "source"
//! sts_scope: "code"
//! sts_description: "Shared primitives and utilities for the simulator runtime."
//! sts_version: "v0.1.0"
//! sts_owner: "tbd"
//! ---
//! Core shared primitives for the STS simulator workspace.
//! This crate exposes configuration loading, logging, and time utilities
//! consumed across the workspace.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{AppConfig, BrokerProfile, LoggingConfig, PublishMode, SimulationConfig};
pub use logging::{init_tracing, LogFormat};
