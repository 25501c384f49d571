// src/profile/mod.rs

pub mod handlers;
pub mod models;
pub mod routes;
pub mod service;
pub mod storage;

#[cfg(test)]
mod tests;

pub use routes::profile_routes;
pub use service::{ProfileError, ProfileService};
pub use storage::{AvatarStorage, LocalAvatarStorage};
