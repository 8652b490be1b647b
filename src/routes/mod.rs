//! Route definitions for the DOB Validator API

mod auth;

pub use auth::auth_routes;
