//! HTTP handlers: generic record CRUD plus the brew query routes.

pub mod brew;
pub mod crud;
pub use crud::*;
