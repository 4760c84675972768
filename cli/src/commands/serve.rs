// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP service
//!
//! Wires the GitHub client, the token store and the compliance service into
//! the Axum router and serves it until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use policy_compliance_core::{
    application::{ComplianceService, TokenService},
    domain::{
        repository::{OneTimeTokenRepository, StorageBackend},
        service_config::ServiceConfig,
    },
    infrastructure::{
        db::Database,
        github::GitHubClient,
        repositories::{InMemoryOneTimeTokenRepository, PostgresOneTimeTokenRepository},
    },
    presentation::api::{app, AppState},
};

pub async fn execute(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let config =
        ServiceConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    let client =
        GitHubClient::from_config(&config.github).context("Failed to create GitHub client")?;

    let token_repository: Arc<dyn OneTimeTokenRepository> = match config.storage_backend() {
        StorageBackend::InMemory => {
            warn!(
                "No database configured, one-time tokens are kept in memory (single process only)"
            );
            Arc::new(InMemoryOneTimeTokenRepository::new())
        }
        StorageBackend::PostgreSQL(postgres) => {
            let database = Database::new(&postgres.connection_string).await?;
            database.migrate().await?;
            info!("One-time tokens stored in PostgreSQL");
            Arc::new(PostgresOneTimeTokenRepository::new(database.get_pool().clone()))
        }
    };

    let default_policy = config.used_policy();
    info!(?default_policy, "Default policy selected");

    let compliance = ComplianceService::new(Arc::new(client), default_policy);
    let tokens = TokenService::new(token_repository, config.charm_token().map(str::to_string));
    let router = app(Arc::new(AppState::new(compliance, tokens)));

    let addr = format!(
        "{}:{}",
        host.unwrap_or(config.server.bind_address),
        port.unwrap_or(config.server.port)
    );
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Policy compliance service listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Policy compliance service shutting down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
