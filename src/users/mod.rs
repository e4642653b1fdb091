//! # Users Module
//!
//! User and trainer-profile records, the first-login upsert, and the
//! current-user endpoint.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod store;


pub use routes::users_routes;
