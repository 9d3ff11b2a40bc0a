//! Environment variable overrides layered on top of a loaded [`crate::types::Config`].
//!
//! Only the variables the core spec names as consumed (spec §6) are read
//! here; CLI flag parsing is `nanopkg-cli`'s concern.

use std::env;

use crate::types::ProxyConfig;

/// Read the proxy environment (`http_proxy`, `https_proxy`, `ftp_proxy`,
/// `no_proxy`) the way the download backend expects it exported.
#[must_use]
pub fn read_proxy_env() -> ProxyConfig {
    ProxyConfig {
        http_proxy: read_first(&["http_proxy", "HTTP_PROXY"]),
        https_proxy: read_first(&["https_proxy", "HTTPS_PROXY"]),
        ftp_proxy: read_first(&["ftp_proxy", "FTP_PROXY"]),
        no_proxy: read_first(&["no_proxy", "NO_PROXY"]),
    }
}

fn read_first(names: &[&str]) -> Option<String> {
    names.iter().find_map(|n| env::var(n).ok())
}

/// Export `config`'s proxy settings into the process environment so the
/// download backend (an external collaborator) inherits them unmodified
/// (spec §4.5).
pub fn export_proxy_env(proxy: &ProxyConfig) {
    set_or_remove("http_proxy", &proxy.http_proxy);
    set_or_remove("https_proxy", &proxy.https_proxy);
    set_or_remove("ftp_proxy", &proxy.ftp_proxy);
    set_or_remove("no_proxy", &proxy.no_proxy);
}

fn set_or_remove(name: &str, value: &Option<String>) {
    // SAFETY: this process is single-threaded cooperative per spec §5; no
    // concurrent reader can observe a torn environment variable here.
    #[allow(unsafe_code)]
    unsafe {
        match value {
            Some(v) => env::set_var(name, v),
            None => env::remove_var(name),
        }
    }
}

/// `TMPDIR`, consulted when creating the intercept runner's `statedir`.
#[must_use]
pub fn tmpdir() -> std::path::PathBuf {
    env::var_os("TMPDIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}
