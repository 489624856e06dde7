//! mobsync MobEdu: one-way sync of directory users and classes into the
//! MobEdu school platform.
//!
//! The platform's REST API is undocumented and cookie-authenticated. This
//! crate wraps it in a [`session::Session`], mirrors its collections in a
//! [`catalog::Catalog`], and reconciles users and class/group pairs on top.

pub mod catalog;
pub mod classes;
pub mod client;
pub mod mappings;
pub mod models;
pub mod profile;
pub mod session;
pub mod sync;
pub mod users;

#[cfg(test)]
mod testing;
