//! Layrbase Core: domain models, error taxonomy and the repository
//! contract shared by every other crate.

pub mod error;
pub mod models;
pub mod repository;

pub use error::{LayrbaseError, LayrbaseResult};
pub use models::membership::can_manage_organization;
pub use models::organization::slugify;
