//! Loads a [`Config`] from a TOML configuration file plus environment
//! overrides (spec §1: "configuration file loading... produces a `Config`
//! value", an out-of-scope collaborator given a concrete implementation
//! here per SPEC_FULL §11).
//!
//! The on-disk format is a TOML document mirroring [`Config`] directly;
//! opkg's own `/etc/opkg/*.conf` line-oriented format is not reproduced —
//! this rewrite treats config loading as an adjacent surface, not part of
//! the ported core.

use std::fs;
use std::path::{Path, PathBuf};

use nanopkg_core::{Error, Result};

use crate::env::read_proxy_env;
use crate::types::Config;
use crate::validate;

/// Default locations searched for a config file, in order.
#[must_use]
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/opkg/nanopkg.toml")];
    if let Some(dirs) = directories::ProjectDirs::from("", "", "nanopkg") {
        paths.push(dirs.config_dir().join("nanopkg.toml"));
    }
    paths
}

/// Load configuration from an explicit path, or the first hit among
/// [`default_search_paths`].
///
/// # Errors
/// Returns `ConfigError` if no file is found, it cannot be parsed, or it
/// fails [`validate::validate`].
pub fn load(explicit_path: Option<&Path>) -> Result<Config> {
    let path = match explicit_path {
        Some(p) => p.to_path_buf(),
        None => default_search_paths()
            .into_iter()
            .find(|p| p.exists())
            .ok_or_else(|| {
                Error::config(
                    "no configuration file found in default search paths (/etc/opkg/nanopkg.toml)",
                )
            })?,
    };

    let contents = fs::read_to_string(&path).map_err(|e| Error::filesystem(&path, e))?;
    let mut config: Config = toml::from_str(&contents)
        .map_err(|e| Error::config(format!("invalid config file {}: {e}", path.display())))?;

    apply_env_overrides(&mut config);
    validate::validate(&config)?;
    Ok(config)
}

/// Parse a config value directly from a TOML string, skipping file I/O.
/// Used by tests and by callers embedding config inline.
///
/// # Errors
/// Returns `ConfigError` on malformed TOML or a failed [`validate::validate`].
pub fn parse(toml_source: &str) -> Result<Config> {
    let mut config: Config = toml::from_str(toml_source)
        .map_err(|e| Error::config(format!("invalid config: {e}")))?;
    apply_env_overrides(&mut config);
    validate::validate(&config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    let env_proxy = read_proxy_env();
    if config.proxy.http_proxy.is_none() {
        config.proxy.http_proxy = env_proxy.http_proxy;
    }
    if config.proxy.https_proxy.is_none() {
        config.proxy.https_proxy = env_proxy.https_proxy;
    }
    if config.proxy.ftp_proxy.is_none() {
        config.proxy.ftp_proxy = env_proxy.ftp_proxy;
    }
    if config.proxy.no_proxy.is_none() {
        config.proxy.no_proxy = env_proxy.no_proxy;
    }
}

#[cfg(test)]
mod tests {
    use super::parse;

    const MINIMAL: &str = r#"
        lists_dir = "/usr/lib/opkg/lists"
        cache_dir = "/var/cache/opkg"
        lock_file = "/usr/lib/opkg/lock"

        [[destinations]]
        name = "root"
        root_dir = "/"
        info_dir = "/usr/lib/opkg/info"
        status_file_name = "status"

        [[sources]]
        kind = "flat"
        name = "snapshot"
        url = "http://example.com/snapshot"

        [[architectures]]
        name = "all"
        priority = 1

        [[architectures]]
        name = "arm_cortex-a9"
        priority = 10
    "#;

    #[test]
    fn parses_minimal_config() {
        let config = parse(MINIMAL).expect("minimal config parses");
        assert_eq!(config.destinations.len(), 1);
        assert_eq!(config.sorted_architectures()[0].name, "all");
        assert_eq!(config.sorted_architectures()[1].name, "arm_cortex-a9");
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(parse("not = [valid").is_err());
    }
}
