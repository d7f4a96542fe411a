use actix_web::{
    App, HttpServer,
    web::{self, Data},
};
use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use log::{debug, error, info};
use meshradio_ui::{
    api::Api,
    catalog,
    config::AppConfig,
    config_store::HttpConfigStore,
    gateway_client::GatewayClient,
    telemetry::{PollerSettings, TelemetryPoller},
};
use std::{io::Write, sync::Arc};

type UiApi = Api<GatewayClient, HttpConfigStore>;

#[actix_web::main]
async fn main() {
    if let Err(e) = run().await {
        error!("application error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    log_panics::init();
    init_logging();

    info!("module version: {}", env!("CARGO_PKG_VERSION"));

    catalog::validate().context("command catalog is inconsistent")?;

    let config = AppConfig::get();
    let gateway = Arc::new(GatewayClient::new(&config.gateway_socket_path));
    let poller = Arc::new(TelemetryPoller::new(
        Arc::clone(&gateway),
        PollerSettings {
            interval: config.telemetry_poll_interval,
            retention: config.telemetry_retention,
        },
    ));
    let store = HttpConfigStore::new(&config.config_store_socket_path);
    let api = UiApi::new(gateway, poller, store);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(Data::new(api.clone()))
            .route("/device/{id}/sync", web::post().to(UiApi::sync))
            .route(
                "/device/{id}/telemetry/start",
                web::post().to(UiApi::start_telemetry),
            )
            .route(
                "/device/{id}/telemetry/stop",
                web::post().to(UiApi::stop_telemetry),
            )
            .route("/device/{id}/telemetry", web::get().to(UiApi::telemetry))
            .route("/version", web::get().to(UiApi::version))
    })
    .bind(("0.0.0.0", config.ui_port))
    .with_context(|| format!("cannot bind 0.0.0.0:{}", config.ui_port))?
    .disable_signals()
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            debug!("ctrl-c");
            server_handle.stop(true).await;
        },
        _ = server_task => {
            debug!("server stopped");
        }
    }

    debug!("good bye");
    Ok(())
}

fn init_logging() {
    let mut builder = if cfg!(debug_assertions) {
        Builder::from_env(Env::default().default_filter_or("debug"))
    } else {
        Builder::from_env(Env::default().default_filter_or("info"))
    };

    builder.format(|f, record| match record.level() {
        log::Level::Error => {
            eprintln!("{}", record.args());
            Ok(())
        }
        _ => {
            writeln!(f, "{}", record.args())
        }
    });

    builder.target(Target::Stdout).init();
}
