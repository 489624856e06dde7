//! mobsync LDAP -- reads people and classes from an LDAP tree.
//!
//! Entries are flattened into attribute records that the MobEdu mapping
//! tables can project, with the raw entry kept under `original`.

pub mod client;
pub mod source;

pub use source::LdapDirectory;
