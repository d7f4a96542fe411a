//! Plain HTTP/1 over a unix domain socket.
//!
//! The AT gateway and the config store are local daemons; both are spoken to
//! with one short-lived connection per request.

use anyhow::{Context, Result};
use http_body_util::BodyExt;
use hyper::{Request, StatusCode, Uri, client::conn::http1};
use hyper_util::rt::TokioIo;
use log::error;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::net::UnixStream;

#[derive(Clone, Debug)]
pub struct SocketClient {
    socket_path: PathBuf,
}

impl SocketClient {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        SocketClient {
            socket_path: socket_path.as_ref().to_path_buf(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub async fn get(&self, uri: &Uri) -> Result<(StatusCode, String)> {
        let request = Request::builder()
            .uri(uri.clone())
            .method("GET")
            .header("Host", "localhost")
            .body(String::new())
            .context("build request failed")?;

        self.send(request).await
    }

    pub async fn post_json(&self, uri: &Uri, body: impl Serialize) -> Result<(StatusCode, String)> {
        let body = serde_json::to_string(&body).context("serialize request body failed")?;
        let request = Request::builder()
            .uri(uri.clone())
            .method("POST")
            .header("Host", "localhost")
            .header("Content-Type", "application/json")
            .body(body)
            .context("build request failed")?;

        self.send(request).await
    }

    async fn send(&self, request: Request<String>) -> Result<(StatusCode, String)> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .with_context(|| format!("cannot connect to {:?}", self.socket_path))?;

        let (mut sender, conn) = http1::handshake(TokioIo::new(stream))
            .await
            .context("unix stream handshake failed")?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                error!("socket connection failed: {e:?}");
            }
        });

        sender
            .ready()
            .await
            .context("unix stream unexpectedly closed")?;

        let res = sender
            .send_request(request)
            .await
            .context("send request failed")?;

        let status = res.status();

        let body = res
            .collect()
            .await
            .context("collect response body failed")?;
        let body = String::from_utf8(body.to_bytes().to_vec())
            .context("response body is not utf-8")?;

        Ok((status, body))
    }
}
