use meshradio_ui::{
    catalog::{BoardType, Category},
    gateway_client::{AtGateway, TransportError},
    sync::{SyncClass, SyncEngine},
};
use std::{collections::HashMap, sync::Arc};

/// Gateway double answering from a fixed command → reply table. Commands
/// without an entry fail like an offline device.
#[derive(Default)]
struct ScriptedGateway {
    replies: HashMap<&'static str, Result<&'static str, &'static str>>,
}

impl ScriptedGateway {
    fn reply(mut self, command: &'static str, raw: &'static str) -> Self {
        self.replies.insert(command, Ok(raw));
        self
    }

    fn fail(mut self, command: &'static str, reason: &'static str) -> Self {
        self.replies.insert(command, Err(reason));
        self
    }
}

impl AtGateway for ScriptedGateway {
    async fn send_command(
        &self,
        _device_id: &str,
        command: &str,
    ) -> Result<String, TransportError> {
        match self.replies.get(command) {
            Some(Ok(raw)) => Ok((*raw).to_string()),
            Some(Err(reason)) => Err(TransportError::new(*reason)),
            None => Err(TransportError::new("device unreachable")),
        }
    }

    async fn board_type(&self, _device_id: &str) -> Result<BoardType, TransportError> {
        Ok(BoardType::Mesh10)
    }
}

fn engine(gateway: ScriptedGateway) -> SyncEngine<ScriptedGateway> {
    SyncEngine::new(Arc::new(gateway))
}

#[tokio::test]
async fn debug_category_partial_when_one_command_unreachable() {
    let engine = engine(
        ScriptedGateway::default()
            .reply("AT^ELFUN?", "^ELFUN: 1\r\nOK")
            .fail("AT^DRPR?", "device unreachable"),
    );

    let report = engine
        .sync("radio-1", BoardType::Mesh10, Some(Category::Debug))
        .await;

    assert_eq!(report.total_commands, 2);
    assert_eq!(report.success_count, 1);
    assert_eq!(report.classification, SyncClass::Partial);
    assert_eq!(report.merged_config.len(), 1);
    assert_eq!(report.merged_config["debug_switch"], "1");

    let drpr = &report.results[1];
    assert_eq!(drpr.command_name, "get_drpr_status");
    assert!(!drpr.success);
    // the gateway's reason survives verbatim
    assert_eq!(drpr.error.as_deref(), Some("device unreachable"));
    assert!(drpr.raw_response.is_none());
}

#[tokio::test]
async fn all_commands_failing_is_unreachable_never_partial() {
    let engine = engine(ScriptedGateway::default());

    let report = engine
        .sync("radio-2", BoardType::Mesh10, Some(Category::Debug))
        .await;

    assert_eq!(report.total_commands, 2);
    assert_eq!(report.success_count, 0);
    assert_eq!(report.classification, SyncClass::Unreachable);
    assert!(report.merged_config.is_empty());
}

#[tokio::test]
async fn empty_category_yields_zero_zero_report() {
    let engine = engine(ScriptedGateway::default());

    // 1.0 star boards have no role category
    let report = engine
        .sync("radio-3", BoardType::Star10, Some(Category::Role))
        .await;

    assert_eq!(report.total_commands, 0);
    assert_eq!(report.success_count, 0);
    assert_eq!(report.classification, SyncClass::Complete);
    assert!(report.results.is_empty());
    assert!(report.merged_config.is_empty());
}

#[tokio::test]
async fn later_command_wins_merge_collisions() {
    // radio reports the configured bandwidth (code 2 → 5M), DRPR status
    // reports the bandwidth in effect (code 3 → 10M); debug runs after radio
    // in the all-categories order, so its value must win
    let engine = engine(
        ScriptedGateway::default()
            .reply("AT^DRPC?", "^DRPC: 806000,2,27\r\nOK")
            .reply("AT^DRPR?", "^DRPR: 1,500,3\r\nOK"),
    );

    let report = engine.sync("radio-4", BoardType::Mesh10, None).await;

    assert_eq!(report.classification, SyncClass::Partial);
    assert_eq!(report.merged_config["bandwidth"], "10M");
    assert_eq!(report.merged_config["freq_khz"], "806000");
    assert_eq!(report.merged_config["drpr_switch"], "on");
}

#[tokio::test]
async fn unparseable_reply_is_command_failure_not_crash() {
    let engine = engine(
        ScriptedGateway::default()
            .reply("AT^ELFUN?", "garbage\r\nOK")
            .reply("AT^DRPR?", "^DRPR: 1,500,3\r\nOK"),
    );

    let report = engine
        .sync("radio-5", BoardType::Mesh10, Some(Category::Debug))
        .await;

    assert_eq!(report.success_count, 1);
    assert_eq!(report.classification, SyncClass::Partial);

    let elfun = &report.results[0];
    assert!(!elfun.success);
    assert!(elfun.error.as_deref().unwrap().starts_with("parse failed"));
    // the raw reply is kept for inspection
    assert_eq!(elfun.raw_response.as_deref(), Some("garbage\r\nOK"));
}

#[tokio::test]
async fn sync_is_idempotent_for_stable_devices() {
    let engine = engine(
        ScriptedGateway::default()
            .reply("AT^ELFUN?", "^ELFUN: 1\r\nOK")
            .reply("AT^DRPR?", "^DRPR: 1,500,3\r\nOK"),
    );

    let first = engine
        .sync("radio-6", BoardType::Mesh10, Some(Category::Debug))
        .await;
    let second = engine
        .sync("radio-6", BoardType::Mesh10, Some(Category::Debug))
        .await;

    assert_eq!(first.merged_config, second.merged_config);
    assert_eq!(first.success_count, second.success_count);
    assert_eq!(first.classification, second.classification);
}

#[tokio::test]
async fn success_count_never_exceeds_total() {
    let gateways = [
        ScriptedGateway::default(),
        ScriptedGateway::default().reply("AT^ELFUN?", "^ELFUN: 1\r\nOK"),
        ScriptedGateway::default()
            .reply("AT^ELFUN?", "^ELFUN: 1\r\nOK")
            .reply("AT^DRPR?", "^DRPR: 1,500,3\r\nOK"),
    ];

    for gateway in gateways {
        let report = engine(gateway)
            .sync("radio-7", BoardType::Mesh10, Some(Category::Debug))
            .await;
        assert!(report.success_count <= report.total_commands);
    }
}
