// This is the entry point of the todo relay service.
//
// **Architecture Overview:**
// - `core/` = Business logic (summarization, notifications; no HTTP, no vendors)
// - `infra/` = Implementations of core traits (Gemini, Slack, Firestore credentials)
// - `http/` = axum adapters (routes, origin policy, error translation)
//
// This file's job is to:
// 1. Load configuration
// 2. Resolve the Firestore identity (or exit)
// 3. Initialize services (dependency injection)
// 4. Serve the HTTP API

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "http/http_layer.rs"]
mod http;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::core::notifications::ChatWebhook;
use crate::core::summarization::SummaryProvider;
use crate::http::{build_router, AppState, OriginPolicy};
use crate::infra::ai::GeminiClient;
use crate::infra::slack::SlackWebhookClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env first so RUST_LOG from the file applies to the subscriber
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    // ========================================================================
    // FIRESTORE IDENTITY
    // ========================================================================
    // No credentials means no service. There is no degraded mode.
    let identity = match config.credentials.load().await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize Firestore credentials");
            std::process::exit(1);
        }
    };

    if config.verify_credentials_on_startup {
        if let Err(e) = identity.access_token().await {
            tracing::error!(error = %e, "Firestore credential verification failed");
            std::process::exit(1);
        }
        tracing::info!(project_id = %identity.project_id(), "Firestore credentials verified");
    }

    // ========================================================================
    // SERVICES
    // ========================================================================
    if config.gemini.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; summarize requests will fail");
    }
    if config.slack_webhook_url.is_none() {
        tracing::warn!("SLACK_WEBHOOK_URL is not set; Slack requests will fail");
    }

    let provider: Box<dyn SummaryProvider> = Box::new(GeminiClient::new(config.gemini.clone()));
    let webhook: Box<dyn ChatWebhook> = Box::new(SlackWebhookClient::new(
        config.slack_webhook_url.clone(),
        config.slack_format,
    ));

    let state = AppState::new(provider, webhook, identity);
    let app = build_router(state, OriginPolicy::from_origins(config.allowed_origins.clone()));

    // ========================================================================
    // SERVE
    // ========================================================================
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(
        %addr,
        model = %config.gemini.model,
        origins = config.allowed_origins.len(),
        "Todo relay listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
