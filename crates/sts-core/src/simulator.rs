//! ---
//! sts_section: "03-simulation-runtime"
//! sts_subsection: "module"
//! sts_type: "source"
//! sts_scope: "code"
//! sts_description: "Scheduler loop and lifecycle control for the simulator."
//! sts_version: "v0.1.0"
//! sts_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use sts_common::config::{AppConfig, PublishMode, SimulationConfig};
use sts_common::time::unix_millis;
use sts_sim::{
    standard_fleet, FaultRegistry, Payload, SimulationContext, TelemetrySource,
};

use crate::sink::TelemetrySink;

type FleetFactory = Box<dyn Fn() -> Vec<Box<dyn TelemetrySource>> + Send + Sync>;

/// Lifecycle handle for the background telemetry loop.
///
/// At most one loop task is alive at a time: `start` refuses to spawn a
/// second, and `stop` joins the task so "stopped" is observable only
/// after true termination. The fault registry and the per-run signals are
/// the only state shared with the loop; trend state and device instances
/// are owned by the run and discarded with it.
pub struct Simulator {
    station_name: String,
    config: SimulationConfig,
    topic: String,
    sink: Arc<dyn TelemetrySink>,
    faults: Arc<FaultRegistry>,
    fleet: FleetFactory,
    running: Mutex<Option<RunningLoop>>,
}

struct RunningLoop {
    stop: broadcast::Sender<()>,
    refresh: Arc<Notify>,
    task: JoinHandle<()>,
}

/// Lifecycle errors surfaced to the control layer.
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("simulation loop is already running")]
    AlreadyRunning,
}

/// Snapshot returned by [`Simulator::status`].
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorStatus {
    pub running: bool,
    pub active_faults: sts_sim::FaultSnapshot,
}

impl Simulator {
    pub fn new(
        station_name: impl Into<String>,
        config: SimulationConfig,
        topic: impl Into<String>,
        sink: Arc<dyn TelemetrySink>,
    ) -> Self {
        let waterline = config.waterline;
        Self {
            station_name: station_name.into(),
            config,
            topic: topic.into(),
            sink,
            faults: Arc::new(FaultRegistry::new()),
            fleet: Box::new(move || standard_fleet(waterline)),
            running: Mutex::new(None),
        }
    }

    /// Build a simulator from the loaded configuration, publishing on the
    /// active profile's topic.
    pub fn from_config(config: &AppConfig, sink: Arc<dyn TelemetrySink>) -> Result<Self> {
        let profile = config.active_profile()?;
        info!(
            profile = %profile.note,
            broker = %profile.broker,
            port = profile.port,
            topic = %profile.topic,
            "simulator bound to broker profile"
        );
        Ok(Self::new(
            config.station_name.clone(),
            config.simulation.clone(),
            profile.topic.clone(),
            sink,
        ))
    }

    /// Replace the device fleet used for subsequent runs.
    pub fn with_fleet(
        mut self,
        fleet: impl Fn() -> Vec<Box<dyn TelemetrySource>> + Send + Sync + 'static,
    ) -> Self {
        self.fleet = Box::new(fleet);
        self
    }

    /// Spawn the loop with the configured interval.
    pub fn start(&self) -> Result<()> {
        self.start_with_interval(self.config.interval)
    }

    /// Spawn the loop, ticking immediately and then every `interval`.
    ///
    /// Refused while a previous loop is still alive; per-run stop and
    /// refresh signals are created fresh so stale signals cannot leak
    /// into the new run.
    pub fn start_with_interval(&self, interval: Duration) -> Result<()> {
        let mut running = self.running.lock();
        if let Some(current) = running.as_ref() {
            if !current.task.is_finished() {
                return Err(SimulatorError::AlreadyRunning.into());
            }
        }

        let (stop_tx, stop_rx) = broadcast::channel(4);
        let refresh = Arc::new(Notify::new());
        let runner = LoopRunner {
            station_name: self.station_name.clone(),
            topic: self.topic.clone(),
            publish_mode: self.config.publish_mode,
            publish_timeout: self.config.publish_timeout,
            interval,
            ctx: SimulationContext::new(self.config.random_seed),
            devices: (self.fleet)(),
            faults: self.faults.clone(),
            sink: self.sink.clone(),
        };
        let task = tokio::spawn(runner.run(stop_rx, refresh.clone()));
        *running = Some(RunningLoop {
            stop: stop_tx,
            refresh,
            task,
        });
        info!(interval_s = interval.as_secs_f64(), "simulation loop started");
        Ok(())
    }

    /// Signal the loop to stop and wait for it to exit. Returns `false`
    /// when no loop was running.
    pub async fn stop(&self) -> Result<bool> {
        let running = self.running.lock().take();
        match running {
            Some(RunningLoop { stop, task, .. }) => {
                let _ = stop.send(());
                task.await.context("simulation loop task panicked")?;
                info!("simulation loop stopped");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Wake the inter-tick wait so the next tick starts without waiting
    /// out the remainder of the interval. No-op while stopped.
    pub fn request_refresh(&self) {
        if let Some(running) = self.running.lock().as_ref() {
            running.refresh.notify_one();
        }
    }

    /// Flip one fault and refresh so the change is visible within a tick.
    /// Returns the new state: `true` when the fault is now active.
    pub fn toggle_fault(&self, target: &str, fault: &str) -> bool {
        let active = self.faults.toggle(target, fault);
        self.request_refresh();
        active
    }

    /// Return every target to normal operation.
    pub fn clear_faults(&self) {
        self.faults.clear_all();
        self.request_refresh();
    }

    pub fn registry(&self) -> Arc<FaultRegistry> {
        self.faults.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .map(|running| !running.task.is_finished())
            .unwrap_or(false)
    }

    pub fn status(&self) -> SimulatorStatus {
        SimulatorStatus {
            running: self.is_running(),
            active_faults: self.faults.snapshot(),
        }
    }
}

struct LoopRunner {
    station_name: String,
    topic: String,
    publish_mode: PublishMode,
    publish_timeout: Duration,
    interval: Duration,
    ctx: SimulationContext,
    devices: Vec<Box<dyn TelemetrySource>>,
    faults: Arc<FaultRegistry>,
    sink: Arc<dyn TelemetrySink>,
}

impl LoopRunner {
    async fn run(mut self, mut stop: broadcast::Receiver<()>, refresh: Arc<Notify>) {
        info!(
            station = %self.station_name,
            devices = self.devices.len(),
            mode = ?self.publish_mode,
            "simulation loop entering run state"
        );
        loop {
            self.tick().await;
            tokio::select! {
                _ = stop.recv() => {
                    debug!("stop signal observed");
                    break;
                }
                _ = refresh.notified() => {
                    debug!("immediate refresh requested");
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        info!("simulation loop exited");
    }

    /// One tick: a single consistent read of the fault registry, then
    /// every device computes and publishes. A failure in one device or
    /// one publish is logged and never aborts the tick for the others.
    async fn tick(&mut self) {
        let snapshot = self.faults.snapshot();
        match self.publish_mode {
            PublishMode::Consolidated => {
                let mut merged = Payload::new();
                merged.insert("ts".to_owned(), Value::from(unix_millis()));
                merged.insert("device".to_owned(), Value::from(self.station_name.clone()));
                let mut produced = 0usize;
                for device in self.devices.iter_mut() {
                    match device.update_data(&mut self.ctx, &snapshot) {
                        Ok(payload) => {
                            merged.extend(payload);
                            produced += 1;
                        }
                        Err(err) => {
                            warn!(device = device.name(), error = %err, "device update failed; omitted this tick");
                        }
                    }
                }
                if produced > 0 {
                    self.publish(&self.topic, &merged).await;
                }
            }
            PublishMode::PerDevice => {
                for index in 0..self.devices.len() {
                    let (name, status_key, result) = {
                        let device = &mut self.devices[index];
                        let name = device.name().to_owned();
                        let status_key = device.status_key();
                        let result = device.update_data(&mut self.ctx, &snapshot);
                        (name, status_key, result)
                    };
                    let mut payload = match result {
                        Ok(payload) => payload,
                        Err(err) => {
                            warn!(device = %name, error = %err, "device update failed; omitted this tick");
                            continue;
                        }
                    };
                    // Timestamps reflect assembly time, not the tick start.
                    let ts = unix_millis();
                    if let Some(status) = payload.shift_remove(&status_key) {
                        let mut status_payload = Payload::new();
                        status_payload.insert("ts".to_owned(), Value::from(ts));
                        status_payload.insert(status_key, status);
                        let topic = format!("{}/{}/status", self.topic, name);
                        self.publish(&topic, &status_payload).await;
                    }
                    let mut telemetry = Payload::new();
                    telemetry.insert("ts".to_owned(), Value::from(ts));
                    telemetry.extend(payload);
                    let topic = format!("{}/{}/telemetry", self.topic, name);
                    self.publish(&topic, &telemetry).await;
                }
            }
        }
    }

    async fn publish(&self, topic: &str, payload: &Payload) {
        let value = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(err) => {
                warn!(topic, error = %err, "payload serialization failed");
                return;
            }
        };
        match timeout(self.publish_timeout, self.sink.publish(topic, &value)).await {
            Ok(Ok(())) => debug!(topic, "telemetry published"),
            Ok(Err(err)) => warn!(topic, error = %err, "publish failed; will retry next tick"),
            Err(_) => warn!(
                topic,
                timeout_s = self.publish_timeout.as_secs_f64(),
                "publish timed out; will retry next tick"
            ),
        }
    }
}
