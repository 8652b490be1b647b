//! DOB Validator Backend Library
//!
//! This library exports the core modules for the DOB Validator backend server.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
