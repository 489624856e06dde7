//! mobsync core: source records, attribute mapping, error taxonomy and configuration.

pub mod config;
pub mod directory;
pub mod error;
pub mod mapping;
pub mod password;
pub mod record;
pub mod saga;
