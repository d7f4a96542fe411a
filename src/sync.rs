//! Configuration sync orchestration.
//!
//! A sync run resolves the command list for a board and category, executes
//! the commands strictly in order (the AT channel is a shared,
//! one-command-at-a-time resource per device) and folds the per-command
//! outcomes into a [`SyncReport`]. Command failures never abort the batch
//! and are never retried here; pressing "Sync" again is the retry path.

use crate::{
    catalog::{self, BoardType, Category, CommandSpec},
    gateway_client::AtGateway,
    parser::{self, FieldMap},
};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;

/// Aggregate outcome class surfaced to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncClass {
    Unreachable,
    Partial,
    Complete,
}

/// Reproducible three-way classification of a sync run.
///
/// A run with no applicable commands counts as complete: there was nothing
/// to do, which is a valid state for boards lacking a category.
pub fn classify(success_count: usize, total_commands: usize) -> SyncClass {
    if success_count == total_commands {
        SyncClass::Complete
    } else if success_count == 0 {
        SyncClass::Unreachable
    } else {
        SyncClass::Partial
    }
}

/// Outcome of one command against one device.
#[derive(Clone, Debug, Serialize)]
pub struct SyncTask {
    pub command_name: &'static str,
    pub raw_response: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<FieldMap>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SyncReport {
    pub device_id: String,
    pub board_type: BoardType,
    /// `None` means all categories were synced.
    pub category: Option<Category>,
    pub total_commands: usize,
    pub success_count: usize,
    pub classification: SyncClass,
    /// Per-command outcomes in execution order.
    pub results: Vec<SyncTask>,
    /// Union of all successful field maps; later commands win on collision
    /// because they re-report fields with fresher values.
    pub merged_config: FieldMap,
}

pub struct SyncEngine<G> {
    gateway: Arc<G>,
}

impl<G> Clone for SyncEngine<G> {
    fn clone(&self) -> Self {
        SyncEngine {
            gateway: Arc::clone(&self.gateway),
        }
    }
}

impl<G: AtGateway> SyncEngine<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        SyncEngine { gateway }
    }

    /// Queries the device's live configuration and aggregates a report.
    ///
    /// Never fails as a whole: transport and parse errors are recorded per
    /// command and reflected in the classification.
    pub async fn sync(
        &self,
        device_id: &str,
        board_type: BoardType,
        category: Option<Category>,
    ) -> SyncReport {
        let specs = catalog::resolve(board_type, category);
        info!(
            "syncing {device_id} ({board_type}), category {}: {} commands",
            category.map_or("all", Category::as_str),
            specs.len()
        );

        let mut results = Vec::with_capacity(specs.len());
        for spec in specs {
            results.push(self.run_command(device_id, spec).await);
        }

        let total_commands = results.len();
        let success_count = results.iter().filter(|task| task.success).count();

        let mut merged_config = FieldMap::new();
        for task in results.iter().filter(|task| task.success) {
            if let Some(parsed) = &task.parsed {
                merged_config.extend(parsed.clone());
            }
        }

        let classification = classify(success_count, total_commands);
        info!("sync of {device_id} finished: {success_count}/{total_commands} ({classification:?})");

        SyncReport {
            device_id: device_id.to_string(),
            board_type,
            category,
            total_commands,
            success_count,
            classification,
            results,
            merged_config,
        }
    }

    async fn run_command(&self, device_id: &str, spec: &'static CommandSpec) -> SyncTask {
        debug!("{device_id}: {}", spec.template);

        let raw = match self.gateway.send_command(device_id, spec.template).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("{device_id}: {} failed: {e}", spec.name);
                return SyncTask {
                    command_name: spec.name,
                    raw_response: None,
                    success: false,
                    // gateway reason kept verbatim so the dashboard can
                    // distinguish unreachable from malformed
                    error: Some(e.reason),
                    parsed: None,
                };
            }
        };

        match parser::parse(spec, &raw) {
            Ok(parsed) => SyncTask {
                command_name: spec.name,
                raw_response: Some(raw),
                success: true,
                error: None,
                parsed: Some(parsed),
            },
            Err(e) => {
                warn!("{device_id}: {} returned unparseable reply: {e}", spec.name);
                SyncTask {
                    command_name: spec.name,
                    raw_response: Some(raw),
                    success: false,
                    error: Some(format!("parse failed: {e}")),
                    parsed: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_three_way() {
        assert_eq!(classify(0, 2), SyncClass::Unreachable);
        assert_eq!(classify(1, 2), SyncClass::Partial);
        assert_eq!(classify(2, 2), SyncClass::Complete);
        // empty runs are valid, not unreachable
        assert_eq!(classify(0, 0), SyncClass::Complete);
    }
}
