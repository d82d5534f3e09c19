// Copyright (c) The testpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::discovery::config_paths;
use crate::errors::ConfigError;
use camino::Utf8Path;
use serde::Deserialize;
use std::{collections::BTreeSet, io, time::Duration};
use tracing::{debug, warn};

/// Special value for `--config-file` and `TESTPANEL_CONFIG_FILE` that skips loading a config
/// file entirely.
pub const CONFIG_NONE: &str = "none";

/// Specifies where to load configuration from.
#[derive(Clone, Copy, Debug)]
pub enum ConfigLocation<'a> {
    /// Discover the config file from the default locations.
    Default,

    /// Skip loading a config file, using only built-in defaults.
    ///
    /// This is useful for test isolation.
    Isolated,

    /// Load the config file from an explicit path.
    ///
    /// Returns an error if the file does not exist.
    Explicit(&'a Utf8Path),
}

impl<'a> ConfigLocation<'a> {
    /// Creates a config location from a CLI or environment variable value.
    ///
    /// Returns `Default` if `None`, `Isolated` if `"none"`, otherwise `Explicit` with the path.
    pub fn from_cli_or_env(s: Option<&'a str>) -> Self {
        match s {
            None => Self::Default,
            Some(s) if s == CONFIG_NONE => Self::Isolated,
            Some(s) => Self::Explicit(Utf8Path::new(s)),
        }
    }
}

/// Reporter configuration after the config file has been merged over the defaults.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReporterConfig {
    /// How long a command must stay pending before it is marked long-running.
    pub long_running_threshold: Duration,

    /// Which conditions open a test in the panel by default.
    pub auto_open: AutoOpen,
}

/// Conditions under which a test that hasn't been explicitly opened or closed is shown open.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AutoOpen {
    /// Open tests whose last attempt failed.
    pub failed: bool,

    /// Open tests with a long-running command.
    pub long_running: bool,

    /// Open the test if it is the only one loaded.
    pub single_test: bool,
}

impl ReporterConfig {
    /// Loads the config file from `location` and merges it over the defaults.
    ///
    /// `cwd` is the directory searched for `testpanel.toml` when using the default location.
    pub fn load(cwd: &Utf8Path, location: ConfigLocation<'_>) -> Result<Self, ConfigError> {
        Self::load_with_warnings(cwd, location, &mut DefaultConfigWarnings)
    }

    fn load_with_warnings(
        cwd: &Utf8Path,
        location: ConfigLocation<'_>,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigError> {
        let defaults = DefaultConfig::from_embedded();
        let config = match location {
            ConfigLocation::Isolated => {
                debug!("config: skipping (isolated)");
                None
            }
            ConfigLocation::Explicit(path) => {
                debug!("config: loading from explicit path {path}");
                match DeserializedConfig::from_path_with_warnings(path, warnings)? {
                    Some(config) => Some(config),
                    None => {
                        return Err(ConfigError::FileNotFound {
                            path: path.to_owned(),
                        });
                    }
                }
            }
            ConfigLocation::Default => {
                DeserializedConfig::from_default_location_with_warnings(cwd, warnings)?
            }
        };

        Ok(Self::resolve(&defaults, config.as_ref()))
    }

    fn resolve(defaults: &DefaultConfig, config: Option<&DeserializedConfig>) -> Self {
        let defaults = &defaults.reporter;
        let Some(config) = config.map(|config| &config.reporter) else {
            return Self {
                long_running_threshold: defaults.long_running_threshold,
                auto_open: defaults.auto_open,
            };
        };

        Self {
            long_running_threshold: config
                .long_running_threshold
                .unwrap_or(defaults.long_running_threshold),
            auto_open: AutoOpen {
                failed: config.auto_open.failed.unwrap_or(defaults.auto_open.failed),
                long_running: config
                    .auto_open
                    .long_running
                    .unwrap_or(defaults.auto_open.long_running),
                single_test: config
                    .auto_open
                    .single_test
                    .unwrap_or(defaults.auto_open.single_test),
            },
        }
    }
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self::resolve(&DefaultConfig::from_embedded(), None)
    }
}

/// Trait for handling config warnings.
///
/// This allows warnings to be logged (the default) or collected for testing purposes.
trait ConfigWarnings {
    /// Handle unknown configuration keys found in a config file.
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>);
}

/// Logs config warnings using the tracing crate.
struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>) {
        let mut unknown_str = String::new();
        if unknown.len() == 1 {
            // Print this on the same line.
            unknown_str.push_str("key: ");
            unknown_str.push_str(unknown.iter().next().expect("unknown has one element"));
        } else {
            unknown_str.push_str("keys:\n");
            for ignored_key in unknown {
                unknown_str.push('\n');
                unknown_str.push_str("  - ");
                unknown_str.push_str(ignored_key);
            }
        }

        warn!("in config file {config_file}, ignoring unknown configuration {unknown_str}");
    }
}

/// Config file contents (deserialized form). All fields are optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedConfig {
    #[serde(default)]
    reporter: DeserializedReporterConfig,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedReporterConfig {
    #[serde(default, with = "humantime_serde")]
    long_running_threshold: Option<Duration>,

    #[serde(default)]
    auto_open: DeserializedAutoOpen,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedAutoOpen {
    failed: Option<bool>,
    long_running: Option<bool>,
    single_test: Option<bool>,
}

impl DeserializedConfig {
    /// Loads config from a specific path.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    fn from_path_with_warnings(
        path: &Utf8Path,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Option<Self>, ConfigError> {
        debug!("config: attempting to load from {path}");
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("config: file does not exist at {path}");
                return Ok(None);
            }
            Err(error) => {
                return Err(ConfigError::Read {
                    path: path.to_owned(),
                    error,
                });
            }
        };

        let (config, unknown) =
            Self::deserialize_toml(&contents).map_err(|error| ConfigError::Parse {
                path: path.to_owned(),
                error,
            })?;

        if !unknown.is_empty() {
            warnings.unknown_config_keys(path, &unknown);
        }

        debug!("config: loaded successfully from {path}");
        Ok(Some(config))
    }

    fn from_default_location_with_warnings(
        cwd: &Utf8Path,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Option<Self>, ConfigError> {
        let paths = config_paths(cwd)?;
        for path in &paths {
            if let Some(config) = Self::from_path_with_warnings(path, warnings)? {
                return Ok(Some(config));
            }
        }

        debug!("config: no config file found at any candidate path: {paths:?}");
        Ok(None)
    }

    /// Deserializes TOML content and returns the config along with any unknown keys.
    fn deserialize_toml(contents: &str) -> Result<(Self, BTreeSet<String>), toml::de::Error> {
        let deserializer = toml::Deserializer::parse(contents)?;
        let mut unknown = BTreeSet::new();
        let config: DeserializedConfig = serde_ignored::deserialize(deserializer, |path| {
            unknown.insert(path.to_string());
        })?;
        Ok((config, unknown))
    }
}

/// Default configuration parsed from the embedded TOML. All fields are required.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultConfig {
    reporter: DefaultReporterConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultReporterConfig {
    #[serde(with = "humantime_serde")]
    long_running_threshold: Duration,
    auto_open: AutoOpen,
}

impl DefaultConfig {
    /// The embedded default config TOML.
    const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    fn from_embedded() -> Self {
        toml::from_str(Self::DEFAULT_CONFIG).expect("embedded default config is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[derive(Default)]
    struct TestConfigWarnings {
        unknown_keys: Vec<(String, BTreeSet<String>)>,
    }

    impl ConfigWarnings for TestConfigWarnings {
        fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>) {
            self.unknown_keys
                .push((config_file.to_string(), unknown.clone()));
        }
    }

    fn load_contents(contents: &str) -> (Result<ReporterConfig, ConfigError>, TestConfigWarnings) {
        let dir = Utf8TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, contents).unwrap();

        let mut warnings = TestConfigWarnings::default();
        let result = ReporterConfig::load_with_warnings(
            dir.path(),
            ConfigLocation::Explicit(&path),
            &mut warnings,
        );
        (result, warnings)
    }

    #[test]
    fn embedded_defaults() {
        let config = ReporterConfig::default();
        assert_eq!(
            config,
            ReporterConfig {
                long_running_threshold: Duration::from_secs(1),
                auto_open: AutoOpen {
                    failed: true,
                    long_running: true,
                    single_test: true,
                },
            }
        );
    }

    #[test_case(
        "",
        Duration::from_secs(1),
        AutoOpen { failed: true, long_running: true, single_test: true }

        ; "empty config uses defaults"
    )]
    #[test_case(
        indoc! {r#"
            [reporter]
            long-running-threshold = "250ms"
        "#},
        Duration::from_millis(250),
        AutoOpen { failed: true, long_running: true, single_test: true }

        ; "threshold override"
    )]
    #[test_case(
        indoc! {r#"
            [reporter.auto-open]
            single-test = false
            failed = false
        "#},
        Duration::from_secs(1),
        AutoOpen { failed: false, long_running: true, single_test: false }

        ; "partial auto-open table"
    )]
    fn config_merges_over_defaults(
        contents: &str,
        expected_threshold: Duration,
        expected_auto_open: AutoOpen,
    ) {
        let (result, warnings) = load_contents(contents);
        let config = result.expect("config should parse");

        assert_eq!(config.long_running_threshold, expected_threshold);
        assert_eq!(config.auto_open, expected_auto_open);
        assert!(warnings.unknown_keys.is_empty());
    }

    #[test]
    fn unknown_keys_are_reported() {
        let (result, warnings) = load_contents(indoc! {r#"
            [reporter]
            long-running-treshold = "2s"

            [reporter.auto-open]
            flaky = true
        "#});

        assert_eq!(result.unwrap(), ReporterConfig::default());
        assert_eq!(warnings.unknown_keys.len(), 1);
        let unknown: Vec<_> = warnings.unknown_keys[0].1.iter().cloned().collect();
        assert_eq!(
            unknown,
            ["reporter.auto-open.flaky", "reporter.long-running-treshold"]
        );
    }

    #[test]
    fn invalid_duration_is_an_error() {
        let (result, _) = load_contents(indoc! {r#"
            [reporter]
            long-running-threshold = "soon"
        "#});

        let error = result.unwrap_err();
        assert!(
            matches!(error, ConfigError::Parse { .. }),
            "unexpected error: {error:?}"
        );
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = Utf8TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");
        let error = ReporterConfig::load(dir.path(), ConfigLocation::Explicit(&path)).unwrap_err();
        assert!(
            matches!(error, ConfigError::FileNotFound { .. }),
            "unexpected error: {error:?}"
        );
    }

    #[test]
    fn isolated_ignores_local_file() {
        let dir = Utf8TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("testpanel.toml"),
            "[reporter]\nlong-running-threshold = \"5s\"\n",
        )
        .unwrap();

        let isolated = ReporterConfig::load(dir.path(), ConfigLocation::Isolated).unwrap();
        assert_eq!(isolated, ReporterConfig::default());

        let discovered = ReporterConfig::load(dir.path(), ConfigLocation::Default).unwrap();
        assert_eq!(discovered.long_running_threshold, Duration::from_secs(5));
    }

    #[test_case(None, "default"; "unset")]
    #[test_case(Some("none"), "isolated"; "none")]
    #[test_case(Some("custom.toml"), "explicit"; "path")]
    fn location_from_cli_or_env(input: Option<&str>, expected: &str) {
        let actual = match ConfigLocation::from_cli_or_env(input) {
            ConfigLocation::Default => "default",
            ConfigLocation::Isolated => "isolated",
            ConfigLocation::Explicit(_) => "explicit",
        };
        assert_eq!(actual, expected);
    }
}
