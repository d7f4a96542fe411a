use meshradio_ui::{
    catalog::BoardType,
    gateway_client::{AtGateway, TransportError},
    telemetry::{PollerSettings, PollingState, TelemetryPoller},
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::sync::Notify;

const DRPR_REPLY: &str = "^DRPR: 1,-95,12,23,150\r\nOK";

/// Gateway double that answers immediately with a valid DRPR report.
struct ImmediateGateway {
    calls: AtomicUsize,
}

impl ImmediateGateway {
    fn new() -> Arc<Self> {
        Arc::new(ImmediateGateway {
            calls: AtomicUsize::new(0),
        })
    }
}

impl AtGateway for ImmediateGateway {
    async fn send_command(
        &self,
        _device_id: &str,
        _command: &str,
    ) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(DRPR_REPLY.to_string())
    }

    async fn board_type(&self, _device_id: &str) -> Result<BoardType, TransportError> {
        Ok(BoardType::Mesh10)
    }
}

/// Gateway double whose fetch blocks until released, to hold a fetch in
/// flight at a precise moment.
struct GatedGateway {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl AtGateway for GatedGateway {
    async fn send_command(
        &self,
        _device_id: &str,
        _command: &str,
    ) -> Result<String, TransportError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(DRPR_REPLY.to_string())
    }

    async fn board_type(&self, _device_id: &str) -> Result<BoardType, TransportError> {
        Ok(BoardType::Mesh10)
    }
}

struct FailingGateway;

impl AtGateway for FailingGateway {
    async fn send_command(
        &self,
        _device_id: &str,
        _command: &str,
    ) -> Result<String, TransportError> {
        Err(TransportError::new("device unreachable"))
    }

    async fn board_type(&self, _device_id: &str) -> Result<BoardType, TransportError> {
        Ok(BoardType::Mesh10)
    }
}

fn settings(interval_ms: u64, retention: usize) -> PollerSettings {
    PollerSettings {
        interval: Duration::from_millis(interval_ms),
        retention,
    }
}

#[tokio::test]
async fn first_sample_arrives_without_waiting_a_full_interval() {
    let poller = TelemetryPoller::new(ImmediateGateway::new(), settings(60_000, 16));
    poller.start("radio-1", BoardType::Mesh10);

    tokio::time::sleep(Duration::from_millis(100)).await;

    let snapshot = poller.snapshot("radio-1");
    assert_eq!(snapshot.state, PollingState::Active);
    assert_eq!(snapshot.samples.len(), 1);

    let sample = &snapshot.samples[0];
    assert_eq!(sample.device_id, "radio-1");
    assert_eq!(sample.fields["rsrp_dbm"], "-95");
    assert_eq!(sample.fields["snr_db"], "12");
    assert_eq!(sample.fields["distance_m"], "150");

    poller.stop("radio-1");
}

#[tokio::test]
async fn start_is_idempotent_while_active() {
    let gateway = ImmediateGateway::new();
    let poller = TelemetryPoller::new(Arc::clone(&gateway), settings(60_000, 16));

    poller.start("radio-2", BoardType::Mesh10);
    poller.start("radio-2", BoardType::Mesh10);
    poller.start("radio-2", BoardType::Mesh10);

    tokio::time::sleep(Duration::from_millis(100)).await;

    // a single loop, a single immediate fetch
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    assert_eq!(poller.snapshot("radio-2").samples.len(), 1);

    poller.stop("radio-2");
    poller.stop("radio-2");
    assert_eq!(poller.state("radio-2"), PollingState::Idle);
}

#[tokio::test]
async fn stop_discards_in_flight_fetch() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let gateway = Arc::new(GatedGateway {
        entered: Arc::clone(&entered),
        release: Arc::clone(&release),
    });
    let poller = TelemetryPoller::new(gateway, settings(60_000, 16));

    poller.start("radio-3", BoardType::Mesh10);
    entered.notified().await; // the first fetch is now in flight

    poller.stop("radio-3");
    release.notify_one(); // let the fetch complete after the stop

    tokio::time::sleep(Duration::from_millis(100)).await;

    let snapshot = poller.snapshot("radio-3");
    assert_eq!(snapshot.state, PollingState::Idle);
    assert!(snapshot.samples.is_empty());
}

#[tokio::test]
async fn restart_clears_the_buffer() {
    let poller = TelemetryPoller::new(ImmediateGateway::new(), settings(60_000, 16));

    poller.start("radio-4", BoardType::Mesh10);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(poller.snapshot("radio-4").samples.len(), 1);

    poller.stop("radio-4");
    poller.start("radio-4", BoardType::Mesh10);
    tokio::time::sleep(Duration::from_millis(100)).await;

    // one sample from the fresh generation, not two
    assert_eq!(poller.snapshot("radio-4").samples.len(), 1);
    poller.stop("radio-4");
}

#[tokio::test]
async fn retention_caps_the_buffer() {
    let poller = TelemetryPoller::new(ImmediateGateway::new(), settings(5, 2));

    poller.start("radio-5", BoardType::Mesh10);
    tokio::time::sleep(Duration::from_millis(200)).await;
    poller.stop("radio-5");

    let snapshot = poller.snapshot("radio-5");
    assert_eq!(snapshot.samples.len(), 2);
}

#[tokio::test]
async fn failed_fetches_keep_the_loop_alive() {
    let poller = TelemetryPoller::new(Arc::new(FailingGateway), settings(10, 16));

    poller.start("radio-6", BoardType::Mesh10);
    tokio::time::sleep(Duration::from_millis(150)).await;

    let snapshot = poller.snapshot("radio-6");
    assert_eq!(snapshot.state, PollingState::Active);
    assert!(snapshot.samples.is_empty());

    poller.stop("radio-6");
}
