//! Domain models for Layrbase.
//!
//! These are the core types shared across all crates.

pub mod invitation;
pub mod membership;
pub mod organization;
pub mod user;
