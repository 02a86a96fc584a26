//! # Cachet API
//!
//! HTTP surface for the credential verification engine.
//!
//! Features:
//! - Axum-based web server
//! - Tower middleware (auth, request IDs, CORS, timeouts)
//! - JWT authentication with a public verification endpoint
//! - OpenAPI docs via utoipa
//! - Graceful shutdown

pub mod auth;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use auth::{Claims, JwtAuth};
pub use error::{ApiError, ApiResult};
pub use routes::api_router;
pub use server::{init_tracing, CachetServer, ServerConfig};
pub use state::AppState;
