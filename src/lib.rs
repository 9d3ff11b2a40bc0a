//! No library surface of its own — this crate exists only to host the
//! end-to-end scenario tests under `tests/` (spec §8), which need a real
//! package to attach an integration-test target to in the otherwise
//! virtual workspace manifest.
