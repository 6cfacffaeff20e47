//! HTTP server assembly

pub mod routes;
pub mod state;

pub use state::AppState;

use std::net::SocketAddr;

use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::RagConfig;
use crate::error::{Error, Result};

/// The HTTP server wrapping one `AppState`.
pub struct RagServer {
    config: RagConfig,
    state: AppState,
}

impl RagServer {
    pub async fn new(config: RagConfig) -> Result<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Wrap an already constructed state, e.g. one with test providers.
    pub fn from_state(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Routes plus the middleware stack.
    pub fn build_router(&self) -> axum::Router {
        let mut router = routes::app_routes(self.config.server.max_upload_size)
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new());

        if self.config.server.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router = router.layer(cors);
        }
        router
    }

    /// Bind and serve until shutdown.
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .server
            .bind_address()
            .parse()
            .map_err(|e| Error::configuration(format!("invalid bind address: {e}")))?;

        tracing::info!("docq server listening on http://{}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.build_router()).await?;
        Ok(())
    }
}
