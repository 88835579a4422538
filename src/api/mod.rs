//! HTTP API server

pub mod admin;
pub mod patient;
pub mod routes;
pub mod server;

pub use server::*;
