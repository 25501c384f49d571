//! # Categories Module
//!
//! Admin-managed product category catalog:
//! - Category CRUD with soft delete
//! - Slug generation and de-duplication
//! - Paginated, filterable listing

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;

#[cfg(test)]
mod tests;

pub use routes::categories_routes;
pub use services::{CategoriesService, CategoryError};
