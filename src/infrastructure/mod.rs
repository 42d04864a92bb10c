//! Infrastructure layer - in-memory stores, engines and runtime wiring

pub mod api_key;
pub mod audit;
pub mod authorization;
pub mod cache;
pub mod logging;
pub mod observability;
pub mod services;
