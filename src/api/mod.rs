//! The API layer: handlers, extractors, error mapping, middleware and
//! routing.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::ApiDoc;
pub use router::{
    RateLimitConfig, RouterOptions, build_router, create_router, create_router_with_rate_limit,
};
