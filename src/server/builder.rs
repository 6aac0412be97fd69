//! ServerBuilder for fluent API to build HTTP servers

use super::auth::PageGuard;
use super::handlers::OrderApiState;
use super::router::{build_order_routes, health_routes};
use crate::core::auth::{AuthProvider, PagePolicy, TrustedHeaderAuthProvider, pages};
use crate::core::service::OrderService;
use crate::core::store::OrderStorage;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builder for the CRM HTTP server
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_storage(InMemoryStorage::new())
///     .build()?;
/// ```
pub struct ServerBuilder {
    storage: Option<Arc<dyn OrderStorage>>,
    auth_provider: Arc<dyn AuthProvider>,
    page_policy: PagePolicy,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    ///
    /// Identity defaults to [`TrustedHeaderAuthProvider`] and access to
    /// [`PagePolicy::default`].
    pub fn new() -> Self {
        Self {
            storage: None,
            auth_provider: Arc::new(TrustedHeaderAuthProvider),
            page_policy: PagePolicy::default(),
            custom_routes: Vec::new(),
        }
    }

    /// Set the order storage (required)
    pub fn with_storage(self, storage: impl OrderStorage + 'static) -> Self {
        self.with_shared_storage(Arc::new(storage))
    }

    /// Set an order storage that is also held elsewhere
    pub fn with_shared_storage(mut self, storage: Arc<dyn OrderStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_auth_provider(mut self, provider: impl AuthProvider + 'static) -> Self {
        self.auth_provider = Arc::new(provider);
        self
    }

    pub fn with_page_policy(mut self, policy: PagePolicy) -> Self {
        self.page_policy = policy;
        self
    }

    /// Add custom routes to the server
    ///
    /// Custom routes are merged as-is; they are not behind the page guard.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the final router
    pub fn build(self) -> Result<Router> {
        let storage = self
            .storage
            .ok_or_else(|| anyhow::anyhow!("OrderStorage is required. Call .with_storage()"))?;

        let state = OrderApiState {
            service: OrderService::new(storage),
        };
        let guard = PageGuard::new(
            self.auth_provider,
            Arc::new(self.page_policy),
            pages::ORDERS,
        );

        let mut app = health_routes().merge(build_order_routes(state, guard));
        for custom_router in self.custom_routes {
            app = app.merge(custom_router);
        }

        Ok(app
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()))
    }

    /// Serve the application with graceful shutdown
    ///
    /// Handles SIGTERM and SIGINT (Ctrl+C).
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
