//! HTTP routing

mod routes;

pub use routes::build_router;
