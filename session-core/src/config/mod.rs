//! Layered configuration: a `base.yaml` file overridden by `APP_`-prefixed
//! environment variables (`APP_API__BASE_URL` sets `api.base_url`).

use crate::error::AppError;
use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Environment prefix for overrides.
pub const ENV_PREFIX: &str = "APP";

/// Resolves the `config` directory of a workspace member.
///
/// Works both when started from the member's own directory and from the
/// workspace root.
pub fn configuration_directory(member: &str) -> Result<PathBuf, AppError> {
    let base_path = std::env::current_dir()?;

    if base_path.ends_with(member) {
        Ok(base_path.join("config"))
    } else {
        Ok(base_path.join(member).join("config"))
    }
}

/// Loads `<dir>/base.yaml` and applies environment overrides.
pub fn load<T: DeserializeOwned>(configuration_directory: &Path) -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let settings = Config::builder()
        .add_source(File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize::<T>()?)
}
