//! Mirror core library: domain types, settings, input validation, errors.
//!
//! - [`types`]: interval, severity and root newtypes
//! - [`settings`]: YAML settings file, quote stripping, validation
//! - [`error`]: [`ConfigError`]

pub mod error;
pub mod settings;
pub mod types;

pub use error::ConfigError;
pub use settings::{RawSettings, Settings, ValidationNote};
pub use types::{MirrorRoots, Severity, SyncInterval};
