//! Saved connection profiles.
//!
//! Profiles live in a flat text file so they can be edited by hand. Secrets
//! are never stored.

mod book;
mod model;

pub use book::{ACCOUNTS_FILE, AccountBook, RECORD_SEPARATOR};
pub use model::AccountProfile;
