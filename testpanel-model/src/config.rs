// Copyright (c) The testpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporter configuration.
//!
//! Configuration is read from a TOML file and merged over the defaults embedded in the crate. The
//! file is looked up in the current directory (`testpanel.toml`), then in the user config
//! directory (`~/.config/testpanel/config.toml`).

mod discovery;
mod imp;

pub use discovery::config_paths;
pub use imp::*;
