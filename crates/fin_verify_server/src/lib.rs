//! fin_verify_server: REST surface for the verification pipeline.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
