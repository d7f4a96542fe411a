pub mod api;
pub mod catalog;
pub mod config;
pub mod config_store;
pub mod gateway_client;
pub mod parser;
pub mod socket_client;
pub mod sync;
pub mod telemetry;
