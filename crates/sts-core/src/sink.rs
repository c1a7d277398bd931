//! ---
//! sts_section: "03-simulation-runtime"
//! sts_subsection: "module"
//! sts_type: "source"
//! sts_scope: "code"
//! sts_description: "Publish sink seam between the loop and the broker transport."
//! sts_version: "v0.1.0"
//! sts_owner: "tbd"
//! ---
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::info;

/// Seam between the scheduler loop and the broker transport.
///
/// The loop treats the sink as opaque: a failed or slow publish is logged
/// and bounded by a timeout, never escalated. Wire transports implement
/// this trait outside the core.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn publish(&self, topic: &str, payload: &Value) -> Result<()>;
}

/// Sink that writes every payload to the structured log. The daemon
/// default when no transport is wired in.
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TelemetrySink for LogSink {
    async fn publish(&self, topic: &str, payload: &Value) -> Result<()> {
        info!(topic, %payload, "telemetry published");
        Ok(())
    }
}

/// One captured publish call.
#[derive(Debug, Clone)]
pub struct PublishedRecord {
    pub topic: String,
    pub payload: Value,
}

/// Sink that records every publish in memory, for tests and dashboards.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<PublishedRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<PublishedRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl TelemetrySink for MemorySink {
    async fn publish(&self, topic: &str, payload: &Value) -> Result<()> {
        self.records.lock().push(PublishedRecord {
            topic: topic.to_owned(),
            payload: payload.clone(),
        });
        Ok(())
    }
}
