//! Live radio parameter telemetry (DRPR polling).
//!
//! One polling loop per device: `start` runs an immediate fetch so the
//! dashboard has data right away, then one fetch per interval until `stop`.
//! Samples land in a bounded per-device buffer owned exclusively by the
//! poller. Cancellation is generation-based: `stop` bumps the device's epoch
//! under the buffer lock, so a fetch still in flight can never append its
//! result after `stop` has returned.

use crate::{
    catalog::{self, BoardType, CommandSpec},
    gateway_client::AtGateway,
    parser::{self, FieldMap},
};
use anyhow::Result;
use log::{debug, info, warn};
use serde::Serialize;
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::task::JoinHandle;

#[derive(Clone, Debug, Serialize)]
pub struct TelemetrySample {
    pub device_id: String,
    pub timestamp_ms: u64,
    pub raw_line: String,
    pub fields: FieldMap,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollingState {
    #[default]
    Idle,
    Active,
}

/// Buffered samples plus the device's polling state, as served to the UI.
#[derive(Clone, Debug, Serialize)]
pub struct TelemetrySnapshot {
    pub state: PollingState,
    pub samples: Vec<TelemetrySample>,
}

#[derive(Clone, Copy, Debug)]
pub struct PollerSettings {
    pub interval: Duration,
    /// Maximum buffered samples per device; oldest entries are dropped.
    pub retention: usize,
}

#[derive(Default)]
struct DeviceBuffer {
    /// Poll generation; bumped on every start and stop.
    epoch: u64,
    state: PollingState,
    samples: VecDeque<TelemetrySample>,
    task: Option<JoinHandle<()>>,
}

type DeviceMap = HashMap<String, DeviceBuffer>;

pub struct TelemetryPoller<G> {
    gateway: Arc<G>,
    settings: PollerSettings,
    devices: Arc<Mutex<DeviceMap>>,
}

impl<G: AtGateway + Send + Sync + 'static> TelemetryPoller<G> {
    pub fn new(gateway: Arc<G>, settings: PollerSettings) -> Self {
        TelemetryPoller {
            gateway,
            settings,
            devices: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Starts polling a device. No-op when already active. A restart after
    /// `stop` clears the buffer and begins a fresh generation.
    pub fn start(&self, device_id: &str, board: BoardType) {
        let mut devices = lock(&self.devices);
        let entry = devices.entry(device_id.to_string()).or_default();

        if entry.state == PollingState::Active {
            debug!("telemetry polling for {device_id} already active");
            return;
        }

        entry.epoch += 1;
        entry.state = PollingState::Active;
        entry.samples.clear();

        info!("starting telemetry polling for {device_id} ({board})");
        entry.task = Some(tokio::spawn(poll_loop(
            Arc::clone(&self.gateway),
            self.settings,
            Arc::clone(&self.devices),
            device_id.to_string(),
            board,
            entry.epoch,
        )));
    }

    /// Stops polling a device. No-op when already idle. After this returns,
    /// no further sample is appended, including from a fetch in flight.
    pub fn stop(&self, device_id: &str) {
        let mut devices = lock(&self.devices);
        let Some(entry) = devices.get_mut(device_id) else {
            return;
        };
        if entry.state == PollingState::Idle {
            return;
        }

        // bump the epoch before anything else: an in-flight fetch that
        // completes later sees a stale epoch and discards its sample
        entry.epoch += 1;
        entry.state = PollingState::Idle;
        if let Some(task) = entry.task.take() {
            task.abort();
        }

        info!("stopped telemetry polling for {device_id}");
    }

    pub fn state(&self, device_id: &str) -> PollingState {
        lock(&self.devices)
            .get(device_id)
            .map_or(PollingState::Idle, |entry| entry.state)
    }

    pub fn snapshot(&self, device_id: &str) -> TelemetrySnapshot {
        match lock(&self.devices).get(device_id) {
            Some(entry) => TelemetrySnapshot {
                state: entry.state,
                samples: entry.samples.iter().cloned().collect(),
            },
            None => TelemetrySnapshot {
                state: PollingState::Idle,
                samples: Vec::new(),
            },
        }
    }
}

async fn poll_loop<G: AtGateway>(
    gateway: Arc<G>,
    settings: PollerSettings,
    devices: Arc<Mutex<DeviceMap>>,
    device_id: String,
    board: BoardType,
    epoch: u64,
) {
    let spec = catalog::telemetry_spec(board);
    loop {
        match fetch_sample(gateway.as_ref(), &device_id, spec).await {
            Ok(sample) => {
                if !append(&devices, settings.retention, &device_id, epoch, sample) {
                    return;
                }
            }
            // polling is failure tolerant; keep retrying every interval
            Err(e) => warn!("telemetry fetch for {device_id} failed: {e:#}"),
        }
        tokio::time::sleep(settings.interval).await;
    }
}

async fn fetch_sample<G: AtGateway>(
    gateway: &G,
    device_id: &str,
    spec: &'static CommandSpec,
) -> Result<TelemetrySample> {
    let raw = gateway.send_command(device_id, spec.template).await?;
    let fields = parser::parse(spec, &raw)?;
    Ok(TelemetrySample {
        device_id: device_id.to_string(),
        timestamp_ms: now_ms(),
        raw_line: raw.trim().to_string(),
        fields,
    })
}

/// Returns false when this poll generation has been superseded.
fn append(
    devices: &Mutex<DeviceMap>,
    retention: usize,
    device_id: &str,
    epoch: u64,
    sample: TelemetrySample,
) -> bool {
    let mut devices = lock(devices);
    let Some(entry) = devices.get_mut(device_id) else {
        return false;
    };
    if entry.epoch != epoch || entry.state != PollingState::Active {
        return false;
    }

    entry.samples.push_back(sample);
    while entry.samples.len() > retention {
        entry.samples.pop_front();
    }
    true
}

fn lock(devices: &Mutex<DeviceMap>) -> MutexGuard<'_, DeviceMap> {
    devices.lock().unwrap_or_else(PoisonError::into_inner)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
