//! Page access middleware
//!
//! Resolves the caller through the configured [`AuthProvider`], checks the
//! [`PagePolicy`] once for the page guarding the wrapped routes and stores the
//! [`Principal`] in the request extensions for handlers.

use crate::core::auth::{AuthContext, AuthProvider, PagePolicy, Principal};
use crate::core::error::{CrmError, RequestError};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

/// State of one page guard
#[derive(Clone)]
pub struct PageGuard {
    pub provider: Arc<dyn AuthProvider>,
    pub policy: Arc<PagePolicy>,
    pub page: &'static str,
}

impl PageGuard {
    pub fn new(provider: Arc<dyn AuthProvider>, policy: Arc<PagePolicy>, page: &'static str) -> Self {
        Self {
            provider,
            policy,
            page,
        }
    }

    /// Decide whether `context` may open this guard's page
    pub fn authorize(&self, context: AuthContext) -> Result<Principal, RequestError> {
        let AuthContext::User(principal) = context else {
            return Err(RequestError::Unauthorized {
                message: "Authentication required".to_string(),
            });
        };

        if self.policy.allows(&principal, self.page) {
            Ok(principal)
        } else {
            tracing::warn!(
                user_id = %principal.id,
                role = %principal.role,
                page = self.page,
                "page access denied"
            );
            Err(RequestError::Forbidden {
                page: self.page.to_string(),
            })
        }
    }
}

/// Middleware enforcing a [`PageGuard`]
pub async fn require_page(
    State(guard): State<PageGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, CrmError> {
    let context = guard
        .provider
        .extract_context(request.headers())
        .await
        .map_err(|e| RequestError::Unauthorized {
            message: e.to_string(),
        })?;

    let principal = guard.authorize(context)?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}
