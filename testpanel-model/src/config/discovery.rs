// Copyright (c) The testpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discovery of the config file location.

use crate::errors::ConfigError;
use camino::{Utf8Path, Utf8PathBuf};
use etcetera::{BaseStrategy, HomeDirError, base_strategy::Xdg};

/// Name of the config file looked up in the working directory.
pub(super) const LOCAL_CONFIG_FILE: &str = "testpanel.toml";

/// Returns candidate paths for the config file, in order of priority:
///
/// 1. `<cwd>/testpanel.toml`
/// 2. `$XDG_CONFIG_HOME/testpanel/config.toml`, falling back to `~/.config/testpanel/config.toml`
///
/// The caller should check each path in order and use the first one that exists.
pub fn config_paths(cwd: &Utf8Path) -> Result<Vec<Utf8PathBuf>, ConfigError> {
    let mut paths = vec![cwd.join(LOCAL_CONFIG_FILE)];

    if let Some(path) = xdg_config_path()? {
        paths.push(path);
    }

    Ok(paths)
}

fn xdg_config_path() -> Result<Option<Utf8PathBuf>, ConfigError> {
    let strategy = match Xdg::new() {
        Ok(s) => s,
        Err(HomeDirError) => return Ok(None),
    };

    let config_path = strategy.config_dir().join("testpanel").join("config.toml");

    Utf8PathBuf::try_from(config_path)
        .map(Some)
        .map_err(|error| ConfigError::NonUtf8Path { error })
}
