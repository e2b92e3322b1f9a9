//! # roomcast-settings
//!
//! Layered configuration for the roomcast server.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`RoomcastSettings::default()`]
//! 2. **Settings file**: `~/.roomcast/settings.json` or an explicit path
//!    (deep-merged over defaults)
//! 3. **Environment variables**: `ROOMCAST_*` and `JWT_SECRET` overrides
//!
//! Loaded settings are passed explicitly to whatever needs them.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings, load_settings_from_path,
    parse_bool, parse_ranged, read_settings_file, settings_path,
};
pub use types::{AuthSettings, HubSettings, LoggingSettings, RoomcastSettings, ServerSettings};
