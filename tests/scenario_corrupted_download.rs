//! Spec §8 scenario 6: the index declares a `SHA256` that doesn't match
//! the fetched archive's real contents. The fetch must fail, the cache
//! entry must not be retained, and nothing gets installed.

mod common;

use common::{control_entry, ArchiveEntry, Harness};

#[test]
fn corrupted_download_fails_closed_without_mutation() {
    let harness = Harness::new("");

    let data = [ArchiveEntry::new("./usr/bin/c", b"c binary".to_vec())];
    let control = [control_entry("c", "1.0", "")];
    harness.write_archive("c_1.0_all.ipk", &control, &data);
    let bytes = common::build_ipk(&control, &data);
    assert_eq!(bytes.len(), common::build_ipk(&control, &data).len());

    // Declare a SHA256 that does not match the archive actually on disk.
    let wrong_sha256 = "0".repeat(64);
    harness.replace_index(&common::simple_package_stanza("c", "1.0", &wrong_sha256, bytes.len() as u64));

    let status_before = harness.status_text();

    let assert = harness.nanopkg().arg("install").arg("c").assert().failure();
    let output = assert.get_output();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.to_lowercase().contains("checksum") || stderr.to_lowercase().contains("verif"),
        "{stderr}"
    );

    assert!(!harness.installed_path("usr/bin/c").exists());
    assert_eq!(harness.status_text(), status_before);

    // The bad fetch must not be left behind in the cache.
    let stray_entries: Vec<_> = std::fs::read_dir(&harness.cache_dir)
        .map(|rd| rd.filter_map(Result::ok).collect())
        .unwrap_or_default();
    for entry in stray_entries {
        let len = entry.metadata().map(|m| m.len()).unwrap_or(0);
        assert_ne!(len, bytes.len() as u64, "corrupted fetch must not remain cached: {entry:?}");
    }
}
