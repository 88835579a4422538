//! Clinic - patient and admin authentication for the clinic web application
//!
//! This is the library interface for Clinic: the credential hasher, token
//! service, cookie adapters, access gate, auth endpoints and the data store
//! seam they run against.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod store;

pub use config::Config;
pub use error::Error;
