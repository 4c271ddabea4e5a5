//! Configuration module for steamward.
//!
//! Settings come from `STEAMCMD_*` environment variables or a JSON file.

mod settings;

pub use settings::{
    debug_enabled, ConfigError, Settings, DEFAULT_APP_ID, DEFAULT_HOME_DIR, DEFAULT_USERNAME, DEFAULT_WORK_DIR,
    ENV_APP_ID, ENV_ARCHIVE_SHA256, ENV_BETA_NAME, ENV_BETA_PASSWORD, ENV_BINARY_DIR, ENV_HOME_DIR, ENV_INSTALL_DIR,
    ENV_LANGUAGE, ENV_PLATFORM, ENV_PLATFORM_BITNESS, ENV_USERNAME, ENV_WORK_DIR,
};
