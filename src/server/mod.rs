//! HTTP server: order routes, page access middleware and the server builder

pub mod auth;
pub mod builder;
pub mod handlers;
pub mod router;

pub use auth::PageGuard;
pub use builder::ServerBuilder;
pub use handlers::OrderApiState;
