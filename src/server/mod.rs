mod admin;
mod auth;
pub mod config;
mod errors;
mod http_layers;
pub mod metrics;
pub mod server;
mod songs;
pub mod state;

pub use config::{BasicCredentials, ServerConfig};
pub use errors::{ApiError, ErrorBody};
pub use http_layers::*;
pub use server::{make_app, run_server};
