use std::sync::Arc;
use std::time::Duration;

use crate::{
    backend::BookingBackend, clock::Clock, configuration::Configuration,
    configuration_handler::ConfigurationHandler, database_interface::DatabaseInterface,
    http::create_app, local_storage::LocalStorage, sessions::SessionStore,
};
use axum::Router;
use tokio::time::sleep;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod accounts;
mod availability;
mod backend;
mod booking;
mod clock;
mod configuration;
mod configuration_handler;
mod database_interface;
mod error;
mod http;
mod local_storage;
mod schedule;
mod schema;
mod sessions;
#[cfg(test)]
mod testutils;
mod types;
mod wizard;

#[derive(Clone)]
pub struct AppState<T: BookingBackend> {
    backend: T,
    sessions: SessionStore,
    clock: Arc<dyn Clock>,
    website_title: String,
    max_agenda_days: u32,
}

fn prepare<T: BookingBackend>(backend: T, configuration: &ConfigurationHandler) -> Router {
    if let Some((email, password)) = configuration.admin_credentials() {
        if let Err(err) = accounts::seed_admin(&backend, &email, &password) {
            error!(?err, "Failed to create admin account");
        }
    }
    create_app(backend, configuration.clone())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let configuration = ConfigurationHandler::parse_arguments();

    let address = format!("0.0.0.0:{}", configuration.port());
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(?err, %address, "Failed to bind");
            return;
        }
    };
    info!(%address, title = %configuration.website_title(), "Listening");

    let app = if let Some(database_url) = configuration.database_url() {
        let backend = loop {
            match DatabaseInterface::new(&database_url) {
                Ok(backend) => {
                    info!("Successfully connected to database");
                    break backend;
                }
                Err(err) => {
                    error!(
                        ?err,
                        "Failed to establish database connection. Retry in 1 sec. \
                         Restart without a database URL to keep bookings in memory."
                    );
                    sleep(Duration::from_secs(1)).await;
                }
            }
        };
        prepare(backend, &configuration)
    } else {
        warn!("No database configured, bookings are kept in memory");
        prepare(LocalStorage::default(), &configuration)
    };

    if let Err(err) = axum::serve(listener, app).await {
        error!(?err, "Server stopped");
    }
}
