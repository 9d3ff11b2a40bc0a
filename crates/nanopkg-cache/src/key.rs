//! Cache key derivation (spec §4.5).

use url::Url;

/// The cache key for `url`: `/` substituted with `_`, case-sensitive
/// (spec §4.5).
#[must_use]
pub fn cache_key(url: &Url) -> String {
    url.as_str().replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_slashes_case_sensitively() {
        let url = Url::parse("http://example.com/a/B/c.ipk").unwrap();
        assert_eq!(cache_key(&url), "http:__example.com_a_B_c.ipk");
    }
}
