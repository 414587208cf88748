//! citadel/crates/citadel-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Citadel:
//! the vote ledger, the comment tree, the post lifecycle and the identity
//! resolution they share.

pub mod accounts;
pub mod comments;
pub mod error;
pub mod forum;
pub mod identity;
pub mod ledger;
pub mod models;
pub mod posts;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use forum::{Forum, ForumPorts};
pub use models::*;
pub use traits::*;
