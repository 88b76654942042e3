//! Mandatory-update gate for store-distributed apps.
//!
//! [`bridge::Bridge`] is the callback surface an embedding application
//! drives; [`settings::AppSettings`] is its static configuration.

pub mod bridge;
pub mod logging;
pub mod settings;
pub mod terminal;

pub use bridge::{Bridge, BridgeStatus, CheckOptions, ManagedUpdateResult, ManagedUpdater};
pub use settings::{AppSettings, SettingsError};
pub use terminal::TerminalSurface;
