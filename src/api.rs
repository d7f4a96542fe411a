//! HTTP surface of the service.
//!
//! Thin mapping from routes onto the sync engine and the telemetry poller;
//! no device or protocol logic lives here.

use crate::{
    catalog::Category,
    config_store::ConfigStore,
    gateway_client::AtGateway,
    sync::SyncEngine,
    telemetry::TelemetryPoller,
};
use actix_web::{HttpResponse, Responder, web};
use log::{debug, error, warn};
use serde::Deserialize;
use std::{str::FromStr, sync::Arc};

#[derive(Deserialize)]
pub struct SyncQuery {
    /// Category name or "all"; omitted means all.
    pub category: Option<String>,
    /// Write the merged configuration to the config store after the run.
    #[serde(default)]
    pub persist: bool,
}

pub struct Api<G, S> {
    engine: SyncEngine<G>,
    gateway: Arc<G>,
    poller: Arc<TelemetryPoller<G>>,
    store: S,
}

impl<G, S: Clone> Clone for Api<G, S> {
    fn clone(&self) -> Self {
        Api {
            engine: self.engine.clone(),
            gateway: Arc::clone(&self.gateway),
            poller: Arc::clone(&self.poller),
            store: self.store.clone(),
        }
    }
}

impl<G, S> Api<G, S>
where
    G: AtGateway + Send + Sync + 'static,
    S: ConfigStore + Clone + Send + Sync + 'static,
{
    pub fn new(gateway: Arc<G>, poller: Arc<TelemetryPoller<G>>, store: S) -> Self {
        Api {
            engine: SyncEngine::new(Arc::clone(&gateway)),
            gateway,
            poller,
            store,
        }
    }

    pub async fn sync(
        path: web::Path<String>,
        query: web::Query<SyncQuery>,
        api: web::Data<Self>,
    ) -> impl Responder {
        let device_id = path.into_inner();
        debug!("sync() called for {device_id}");

        let category = match query.category.as_deref().filter(|c| *c != "all") {
            None => None,
            Some(name) => match Category::from_str(name) {
                Ok(category) => Some(category),
                Err(e) => {
                    error!("sync: {e}");
                    return HttpResponse::BadRequest().body(e.to_string());
                }
            },
        };

        let board_type = match api.gateway.board_type(&device_id).await {
            Ok(board_type) => board_type,
            Err(e) => {
                error!("sync: board type lookup for {device_id} failed: {e}");
                return HttpResponse::BadGateway().body(e.to_string());
            }
        };

        let report = api.engine.sync(&device_id, board_type, category).await;

        if query.persist && !report.merged_config.is_empty() {
            // persistence is best effort; the report is still returned
            if let Err(e) = api.store.persist(&device_id, &report.merged_config).await {
                warn!("persisting config for {device_id} failed: {e:#}");
            }
        }

        HttpResponse::Ok().json(report)
    }

    pub async fn start_telemetry(path: web::Path<String>, api: web::Data<Self>) -> impl Responder {
        let device_id = path.into_inner();
        debug!("start_telemetry() called for {device_id}");

        match api.gateway.board_type(&device_id).await {
            Ok(board) => {
                api.poller.start(&device_id, board);
                HttpResponse::Ok().finish()
            }
            Err(e) => {
                error!("start_telemetry: board type lookup for {device_id} failed: {e}");
                HttpResponse::BadGateway().body(e.to_string())
            }
        }
    }

    pub async fn stop_telemetry(path: web::Path<String>, api: web::Data<Self>) -> impl Responder {
        let device_id = path.into_inner();
        debug!("stop_telemetry() called for {device_id}");

        api.poller.stop(&device_id);
        HttpResponse::Ok().finish()
    }

    pub async fn telemetry(path: web::Path<String>, api: web::Data<Self>) -> impl Responder {
        let device_id = path.into_inner();
        HttpResponse::Ok().json(api.poller.snapshot(&device_id))
    }

    pub async fn version() -> impl Responder {
        HttpResponse::Ok().body(env!("CARGO_PKG_VERSION"))
    }
}
