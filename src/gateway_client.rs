//! Client for the AT gateway daemon.
//!
//! The gateway owns the physical link to the boards: connection management,
//! timeouts and per-radio quirks all live there. This client sends one
//! command per call and surfaces whatever reason the gateway reports,
//! verbatim, so the dashboard can tell "device unreachable" apart from
//! "malformed response".

use crate::{catalog::BoardType, socket_client::SocketClient};
use hyperlocal::Uri;
#[cfg(feature = "mock")]
use mockall::automock;
use serde::Serialize;
use std::{path::Path, str::FromStr};
use thiserror::Error;
use trait_variant::make;

/// Command could not be delivered or answered. Non-fatal to a sync batch,
/// fatal to the one command it hit.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct TransportError {
    pub reason: String,
}

impl TransportError {
    pub fn new(reason: impl Into<String>) -> Self {
        TransportError {
            reason: reason.into(),
        }
    }
}

#[make(Send)]
#[cfg_attr(feature = "mock", automock)]
pub trait AtGateway {
    /// Sends one AT command to one device. Single attempt, no retry.
    async fn send_command(&self, device_id: &str, command: &str)
    -> Result<String, TransportError>;

    /// Device registry lookup.
    async fn board_type(&self, device_id: &str) -> Result<BoardType, TransportError>;
}

#[derive(Serialize)]
struct CommandRequest<'a> {
    device_id: &'a str,
    command: &'a str,
}

#[derive(Clone, Debug)]
pub struct GatewayClient {
    socket: SocketClient,
}

impl GatewayClient {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        GatewayClient {
            socket: SocketClient::new(socket_path),
        }
    }
}

impl AtGateway for GatewayClient {
    async fn send_command(
        &self,
        device_id: &str,
        command: &str,
    ) -> Result<String, TransportError> {
        let uri: hyper::Uri = Uri::new(self.socket.socket_path(), "/command/v1").into();

        let (status, body) = self
            .socket
            .post_json(&uri, CommandRequest { device_id, command })
            .await
            .map_err(|e| TransportError::new(format!("gateway unreachable: {e:#}")))?;

        if !status.is_success() {
            // the gateway reports reasons like "device unreachable" as plain text
            if body.is_empty() {
                return Err(TransportError::new(format!("gateway error {status}")));
            }
            return Err(TransportError::new(body));
        }

        Ok(body)
    }

    async fn board_type(&self, device_id: &str) -> Result<BoardType, TransportError> {
        let uri: hyper::Uri =
            Uri::new(self.socket.socket_path(), &format!("/board-type/v1/{device_id}")).into();

        let (status, body) = self
            .socket
            .get(&uri)
            .await
            .map_err(|e| TransportError::new(format!("gateway unreachable: {e:#}")))?;

        if !status.is_success() {
            return Err(TransportError::new(format!(
                "board type lookup failed ({status}): {body}"
            )));
        }

        BoardType::from_str(body.trim()).map_err(|e| TransportError::new(e.to_string()))
    }
}
