//! Spec §8 scenario 2: upgrading a package whose conffile was locally
//! modified preserves the modification and saves the new version
//! side-by-side (spec §4.7, `apply.rs`'s `-opkg` sibling naming).

mod common;

use common::{sha256_of, ArchiveEntry, Harness};

fn control_with_conffile(name: &str, version: &str, conffile: &str) -> [ArchiveEntry; 2] {
    [
        ArchiveEntry::new(
            "./control",
            format!("Package: {name}\nVersion: {version}\nArchitecture: all\n\n").into_bytes(),
        ),
        ArchiveEntry::new("./conffiles", format!("{conffile}\n").into_bytes()),
    ]
}

#[test]
fn locally_modified_conffile_survives_an_upgrade() {
    let harness = Harness::new("");

    // v1.0: ships /etc/x.conf with content "m1".
    let v1_data = [ArchiveEntry::new("./etc/x.conf", b"m1".to_vec())];
    let v1_control = control_with_conffile("x", "1.0", "/etc/x.conf");
    harness.write_archive("x_1.0_all.ipk", &v1_control, &v1_data);
    let v1_bytes = common::build_ipk(&v1_control, &v1_data);

    harness.replace_index(&common::simple_package_stanza(
        "x",
        "1.0",
        &sha256_of(&v1_bytes),
        v1_bytes.len() as u64,
    ));

    harness.nanopkg().arg("install").arg("x").assert().success();

    let conf_path = harness.installed_path("etc/x.conf");
    assert_eq!(std::fs::read(&conf_path).unwrap(), b"m1");

    // The user edits the conffile.
    std::fs::write(&conf_path, b"m2").unwrap();

    // v1.1 declares a different conffile payload, "m3".
    let v2_data = [ArchiveEntry::new("./etc/x.conf", b"m3".to_vec())];
    let v2_control = control_with_conffile("x", "1.1", "/etc/x.conf");
    harness.write_archive("x_1.1_all.ipk", &v2_control, &v2_data);
    let v2_bytes = common::build_ipk(&v2_control, &v2_data);
    harness.replace_index(&common::simple_package_stanza(
        "x",
        "1.1",
        &sha256_of(&v2_bytes),
        v2_bytes.len() as u64,
    ));

    harness.nanopkg().arg("upgrade").arg("x").assert().success();

    // The on-disk file keeps the user's edit...
    assert_eq!(std::fs::read(&conf_path).unwrap(), b"m2");
    // ...and the new version is saved alongside it.
    let side_path = harness.installed_path("etc/x.conf-opkg");
    assert_eq!(std::fs::read(&side_path).unwrap(), b"m3");

    let status = harness.status_text();
    assert!(status.contains("Version: 1.1"));
    assert!(status.contains("Status: install ok installed"));
}
