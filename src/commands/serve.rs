//! Serve command - run the HTTP API.

use anyhow::{Context, Result};
use clap::Args;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::ConfigArgs;
use crate::api::{AppState, build_router};
use crate::keyauth::SellerClient;

#[derive(Args)]
pub struct ServeCmd {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Listen address (overrides config)
    #[arg(long, env = "KEYSHOP_BIND")]
    pub bind: Option<String>,
}

impl ServeCmd {
    pub async fn run(&self) -> Result<()> {
        let config = self.config.load()?;

        let settings = config.keyauth_settings()?;
        if settings.app.is_none() {
            warn!("KEYAUTH_NAME or KEYAUTH_OWNER_ID not set, login and registration will fail");
        }
        let upstream = SellerClient::new(settings).context("Failed to build upstream client")?;
        let sessions = config.session_store()?;

        let state = AppState::new(upstream, sessions, config.storefront.clone());
        let app = build_router(state);

        let bind = self.bind.as_deref().unwrap_or(&config.bind);
        let listener = TcpListener::bind(bind)
            .await
            .with_context(|| format!("Failed to bind {bind}"))?;
        info!(addr = %listener.local_addr()?, "listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutting down");
            })
            .await
            .context("Server error")
    }
}
