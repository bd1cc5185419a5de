// Library exports for testing
pub mod cli;
pub mod config;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
