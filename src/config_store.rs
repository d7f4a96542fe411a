//! Client for the configuration persistence daemon.
//!
//! Sync results may optionally be written here so the dashboard can show the
//! last known configuration of an offline board. The store owns durability;
//! this side only posts the merged field map.

use crate::{parser::FieldMap, socket_client::SocketClient};
use anyhow::{Context, Result, bail};
use hyperlocal::Uri;
#[cfg(feature = "mock")]
use mockall::automock;
use std::path::Path;
use trait_variant::make;

#[make(Send)]
#[cfg_attr(feature = "mock", automock)]
pub trait ConfigStore {
    async fn persist(&self, device_id: &str, config: &FieldMap) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct HttpConfigStore {
    socket: SocketClient,
}

impl HttpConfigStore {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        HttpConfigStore {
            socket: SocketClient::new(socket_path),
        }
    }
}

impl ConfigStore for HttpConfigStore {
    async fn persist(&self, device_id: &str, config: &FieldMap) -> Result<()> {
        let uri: hyper::Uri = Uri::new(
            self.socket.socket_path(),
            &format!("/device-config/v1/{device_id}"),
        )
        .into();

        let (status, body) = self
            .socket
            .post_json(&uri, config)
            .await
            .context("config store request failed")?;

        if !status.is_success() {
            bail!("config store rejected update ({status}): {body}");
        }

        Ok(())
    }
}
