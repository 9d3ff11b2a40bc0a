//! Configuration value types consumed by the transaction engine (spec §3, §6).
//!
//! `Config` is produced by [`crate::loader`] from a config file plus
//! environment overrides and is otherwise just a plain data value: nothing
//! in this crate reaches the network or the filesystem beyond its own
//! loading.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A destination: a filesystem root owning a subset of installed packages
/// and a status file (spec §3 `Dest`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dest {
    /// Destination name, referenced by `Src`/CLI `--dest` selection.
    pub name: String,
    /// Root directory files are unpacked under.
    pub root_dir: PathBuf,
    /// Directory holding per-package `.list`/`.control` metadata files.
    pub info_dir: PathBuf,
    /// File name (relative to `root_dir`) of the installed-package database.
    pub status_file_name: String,
}

impl Dest {
    /// Absolute path to the status file.
    #[must_use]
    pub fn status_file(&self) -> PathBuf {
        self.root_dir.join(&self.status_file_name)
    }
}

/// Signature verification mode for a distribution's `Release` manifest and
/// for individual package signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureMode {
    /// No signature checking.
    #[default]
    None,
    /// Detached OpenPGP signature, binary `.sig`.
    GpgSig,
    /// Detached OpenPGP signature, ASCII-armored `.asc`.
    GpgAsc,
}

/// A repository source: either a flat index or a distribution that expands
/// into one flat source per `(component, architecture)` (spec §3 `Src`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Src {
    /// A single `<base>/Packages` index.
    Flat {
        /// Source name; also the `lists/<name>` cache file name.
        name: String,
        /// Base URL the `Packages` file is relative to.
        url: String,
    },
    /// A `dists/<name>/Release`-rooted distribution.
    Dist {
        /// Distribution name (e.g. `stable`).
        name: String,
        /// Base URL (parent of `dists/`).
        url: String,
        /// Components to require from the `Release` manifest (e.g. `main`).
        components: Vec<String>,
        /// Key used to verify the `Release` signature, if any.
        #[serde(default)]
        signature_key: Option<String>,
        /// How the `Release` (and package) signatures are checked.
        #[serde(default)]
        signature_mode: SignatureMode,
    },
}

impl Src {
    /// The source's configured name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Flat { name, .. } | Self::Dist { name, .. } => name,
        }
    }

    /// The source's base URL.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Flat { url, .. } | Self::Dist { url, .. } => url,
        }
    }

    /// Expand a `Dist` source into one flat `lists/<dist>-<component>-<arch>`
    /// entry per `(component, architecture)`; a `Flat` source expands to
    /// itself.
    #[must_use]
    pub fn expand(&self, architectures: &[Architecture]) -> Vec<ExpandedSource> {
        match self {
            Self::Flat { name, url } => vec![ExpandedSource {
                lists_key: name.clone(),
                base_url: url.clone(),
                packages_url: format!("{}/Packages", url.trim_end_matches('/')),
                component: None,
                architecture: None,
            }],
            Self::Dist {
                name,
                url,
                components,
                ..
            } => {
                let base = url.trim_end_matches('/');
                let mut out = Vec::with_capacity(components.len() * architectures.len());
                for component in components {
                    for arch in architectures {
                        out.push(ExpandedSource {
                            lists_key: format!("{name}-{component}-{}", arch.name),
                            base_url: base.to_string(),
                            packages_url: format!(
                                "{base}/dists/{name}/{component}/binary-{}/Packages",
                                arch.name
                            ),
                            component: Some(component.clone()),
                            architecture: Some(arch.name.clone()),
                        });
                    }
                }
                out
            }
        }
    }

    /// The `Release` manifest URL for a `Dist` source, `None` for `Flat`.
    #[must_use]
    pub fn release_url(&self) -> Option<String> {
        match self {
            Self::Flat { .. } => None,
            Self::Dist { name, url, .. } => {
                Some(format!("{}/dists/{name}/Release", url.trim_end_matches('/')))
            }
        }
    }
}

/// One `(component, architecture)` slice of a [`Src`], ready for the
/// repository loader to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedSource {
    /// Cache key under `lists_dir`.
    pub lists_key: String,
    /// Base URL of the owning source.
    pub base_url: String,
    /// Full URL of the `Packages` index.
    pub packages_url: String,
    /// Component name, if this came from a `Dist` source.
    pub component: Option<String>,
    /// Architecture name, if this came from a `Dist` source.
    pub architecture: Option<String>,
}

/// One entry of the architecture table (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Architecture {
    /// Architecture name, e.g. `arm_cortex-a9`.
    pub name: String,
    /// Priority; higher is preferred. Table is kept sorted ascending.
    pub priority: u32,
}

/// Proxy settings exported to the download backend (spec §4.5, §6).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// `http_proxy`.
    #[serde(default)]
    pub http_proxy: Option<String>,
    /// `https_proxy`.
    #[serde(default)]
    pub https_proxy: Option<String>,
    /// `ftp_proxy`.
    #[serde(default)]
    pub ftp_proxy: Option<String>,
    /// `no_proxy`.
    #[serde(default)]
    pub no_proxy: Option<String>,
}

/// Top-level configuration value consumed by every component (spec §9:
/// `Context { config, pool, status_store, cache }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Destinations, first is the default.
    pub destinations: Vec<Dest>,
    /// Configured repository sources, in priority order (first = highest).
    pub sources: Vec<Src>,
    /// Architecture table, kept sorted ascending by priority.
    pub architectures: Vec<Architecture>,
    /// Directory the repository loader caches fetched indices under.
    pub lists_dir: PathBuf,
    /// Directory the download cache is rooted at.
    pub cache_dir: PathBuf,
    /// Advisory lock file path (spec §5).
    pub lock_file: PathBuf,
    /// Root directory maintainer scripts are run relative to, when running
    /// against an offline/alternate root.
    pub offline_root: Option<PathBuf>,
    /// Proxy environment to export to the downloader.
    #[serde(default)]
    pub proxy: ProxyConfig,
    /// Hard-link (default) or copy `file:` URLs into the cache.
    #[serde(default = "default_true")]
    pub cache_local_files: bool,
    /// Bypass the cache entirely: download straight to destination, discard.
    #[serde(default)]
    pub volatile_cache: bool,
    /// Concurrent downloads in the download phase (spec §5); default 1.
    #[serde(default = "default_one")]
    pub download_parallelism: usize,
    /// Number of retries for a failed fetch before the source/package fails.
    #[serde(default = "default_retries")]
    pub max_retries: usize,
    /// Promote satisfiable `Recommends` into hard `Requires` (spec §4.6).
    #[serde(default = "default_true")]
    pub install_recommends: bool,
    /// Ignore `Recommends` entirely, equivalent to the `ignore-recommended`
    /// resolver flag.
    #[serde(default)]
    pub ignore_recommends: bool,
    /// Force-off dependency checking: clears every `Requires` edge.
    #[serde(default)]
    pub force_depends: bool,
    /// Re-fetch and reinstall even when already at the target version.
    #[serde(default)]
    pub force_reinstall: bool,
    /// Names/globs excluded from the pool's considered set.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Interactive mode: resolver/executor may prompt on problems/confirm.
    #[serde(default)]
    pub interactive: bool,
}

fn default_true() -> bool {
    true
}

fn default_one() -> usize {
    1
}

fn default_retries() -> usize {
    1
}

impl Config {
    /// The default destination (first configured), if any.
    #[must_use]
    pub fn default_dest(&self) -> Option<&Dest> {
        self.destinations.first()
    }

    /// Look up a destination by name.
    #[must_use]
    pub fn dest(&self, name: &str) -> Option<&Dest> {
        self.destinations.iter().find(|d| d.name == name)
    }

    /// Architectures sorted ascending by priority (highest priority last),
    /// as required by spec §3.
    #[must_use]
    pub fn sorted_architectures(&self) -> Vec<Architecture> {
        let mut archs = self.architectures.clone();
        archs.sort_by_key(|a| a.priority);
        archs
    }

    /// Is `arch` present in the architecture table?
    #[must_use]
    pub fn is_known_architecture(&self, arch: &str) -> bool {
        self.architectures.iter().any(|a| a.name == arch)
    }

    /// Root a relative path under the offline root, if configured.
    #[must_use]
    pub fn rooted(&self, path: &Path) -> PathBuf {
        match &self.offline_root {
            Some(root) if path.is_absolute() => {
                root.join(path.strip_prefix("/").unwrap_or(path))
            }
            _ => path.to_path_buf(),
        }
    }
}
