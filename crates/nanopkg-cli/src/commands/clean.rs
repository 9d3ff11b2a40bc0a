//! `clean` — purge the download cache directory (spec §6, §4.3).

use nanopkg_core::{Error, Result};

use super::Cli;
use crate::support;

pub fn run(cli: &Cli) -> Result<i32> {
    let config = support::load_config(cli)?;
    let _lock = support::lock_destination(&config)?;

    let cache_dir = config.rooted(&config.cache_dir);
    if cache_dir.is_dir() {
        for entry in std::fs::read_dir(&cache_dir).map_err(|e| Error::filesystem(&cache_dir, e))? {
            let entry = entry.map_err(|e| Error::filesystem(&cache_dir, e))?;
            let path = entry.path();
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            result.map_err(|e| Error::filesystem(&path, e))?;
        }
    }

    println!("Cache at {} cleaned.", cache_dir.display());
    Ok(0)
}
