//! Structural validation of a loaded [`crate::types::Config`] (spec §7 `ConfigError`).

use nanopkg_core::{Error, Result};

use crate::types::Config;

/// Validate a config value, returning every problem found rather than
/// failing on the first (the CLI reports all of them at once).
///
/// # Errors
/// Returns a `ConfigError` listing every validation problem found.
pub fn validate(config: &Config) -> Result<()> {
    let mut problems = Vec::new();

    if config.architectures.is_empty() {
        problems.push("architecture table is empty".to_string());
    }
    let mut seen_arch = std::collections::HashSet::new();
    for arch in &config.architectures {
        if !seen_arch.insert(arch.name.clone()) {
            problems.push(format!("architecture '{}' declared more than once", arch.name));
        }
    }

    if config.destinations.is_empty() {
        problems.push("no destinations configured".to_string());
    }
    let mut seen_dest = std::collections::HashSet::new();
    for dest in &config.destinations {
        if !seen_dest.insert(dest.name.clone()) {
            problems.push(format!("destination '{}' declared more than once", dest.name));
        }
    }

    let mut seen_src = std::collections::HashSet::new();
    for src in &config.sources {
        if !seen_src.insert(src.name().to_string()) {
            problems.push(format!("source '{}' declared more than once", src.name()));
        }
        if url::Url::parse(src.url()).is_err() {
            problems.push(format!("source '{}' has an invalid URL: {}", src.name(), src.url()));
        }
    }

    // volatile_cache discards the fetched file instead of retaining it,
    // which leaves nowhere durable to stage a detached signature fetch
    // alongside it, so the two are rejected together rather than silently
    // skipping signature checking (spec §9.1).
    if config.volatile_cache
        && config.sources.iter().any(|s| {
            matches!(s, crate::types::Src::Dist { signature_mode, .. } if *signature_mode != crate::types::SignatureMode::None)
        })
    {
        problems.push(
            "volatile_cache is set but a source requires signature verification: \
             disable volatile_cache or signature checking for that source"
                .to_string(),
        );
    }

    if config.download_parallelism == 0 {
        problems.push("download_parallelism must be at least 1".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::config_with(
            format!("{} configuration problem(s) found", problems.len()),
            problems,
        ))
    }
}
