//! # Users Module
//!
//! Persistence for user accounts and their linked OAuth identities:
//! - `UserRepository` (credential store)
//! - `SocialAuthRepository` (social identity store)
//!
//! Every repository function takes a `&mut SqliteConnection`, so the same
//! code runs on a pooled connection or inside an open transaction.

pub mod models;
pub mod repository;
pub mod social;
pub mod store;


pub use models::{NewUser, User, UserResponse, UserRole, UserStatus};
pub use repository::UserRepository;
pub use social::{NewSocialIdentity, SocialAuthRepository, SocialIdentity};
pub use store::StoreError;
