//! Spec §8 scenario 1: fresh install of a package with transitive
//! depends. Repo provides `a (Depends: b (>=1.0), c)`, `b (Depends: c)`,
//! `c`. Requesting `install a` must install `c`, then `b`, then `a`, all
//! ending `install ok installed`.

mod common;

use common::{control_entry, sha256_of, ArchiveEntry, Harness};

#[test]
fn transitive_depends_install_in_dependency_order() {
    let harness = Harness::new("");

    let c_data = [ArchiveEntry::new("./usr/bin/c", b"c binary".to_vec())];
    let c_control = [control_entry("c", "1.0", "")];
    let c_bytes = common::build_ipk(&c_control, &c_data);
    let c_path = harness.write_archive("c_1.0_all.ipk", &c_control, &c_data);
    assert_eq!(std::fs::read(&c_path).unwrap(), c_bytes);

    let b_data = [ArchiveEntry::new("./usr/bin/b", b"b binary".to_vec())];
    let b_control = [control_entry("b", "1.0", "c")];
    harness.write_archive("b_1.0_all.ipk", &b_control, &b_data);
    let b_bytes = common::build_ipk(&b_control, &b_data);

    let a_data = [ArchiveEntry::new("./usr/bin/a", b"a binary".to_vec())];
    let a_control = [control_entry("a", "1.0", "b (>= 1.0), c")];
    harness.write_archive("a_1.0_all.ipk", &a_control, &a_data);
    let a_bytes = common::build_ipk(&a_control, &a_data);

    let index = format!(
        "{}{}{}",
        common::simple_package_stanza("c", "1.0", &sha256_of(&c_bytes), c_bytes.len() as u64),
        common::simple_package_stanza("b", "1.0", &sha256_of(&b_bytes), b_bytes.len() as u64),
        common::simple_package_stanza("a", "1.0", &sha256_of(&a_bytes), a_bytes.len() as u64),
    );
    harness.replace_index(&index);

    harness
        .nanopkg()
        .arg("install")
        .arg("a")
        .assert()
        .success();

    assert!(harness.installed_path("usr/bin/a").is_file());
    assert!(harness.installed_path("usr/bin/b").is_file());
    assert!(harness.installed_path("usr/bin/c").is_file());

    let status = harness.status_text();
    for (pkg, version) in [("a", "1.0"), ("b", "1.0"), ("c", "1.0")] {
        assert!(
            status.contains(&format!("Package: {pkg}")),
            "status missing {pkg}: {status}"
        );
        assert!(status.contains(&format!("Version: {version}")));
    }
    assert!(status.contains("Status: install ok installed"));

    // `a` was named directly; `b`/`c` were pulled in as dependencies.
    let a_stanza_start = status.find("Package: a\n").unwrap();
    let a_stanza = &status[a_stanza_start..];
    assert!(a_stanza.contains("Auto-Installed: no"));
}
