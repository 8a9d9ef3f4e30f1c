//! gym-cloud: booking, payment reconciliation and member messaging
//!
//! Long-running service that:
//! - Opens Stripe checkouts for class and coach-slot bookings
//! - Reconciles completed checkouts into bookings and the payment ledger
//!   (webhook and return-page paths, idempotent per session)
//! - Retries failed reconciliation steps in the background
//! - Auto-replies to WhatsApp availability questions with booking links
//! - Sends staff-triggered WhatsApp messages and member emails

mod api;
mod auth;
mod config;
mod db;
mod email;
mod error;
mod services;
mod state;
mod stripe;
#[cfg(test)]
mod testing;
mod whatsapp;

use std::time::Duration;

use config::Config;
use state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gym_cloud=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting gym-cloud (env: {})", config.environment);

    let state = AppState::new(&config).await?;

    // Failed-step sweeper
    tokio::spawn(services::sweeper::run(
        state.clone(),
        Duration::from_secs(config.sweeper_interval_secs),
    ));

    let app = api::create_router(state);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("gym-cloud HTTP listening on {http_addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
