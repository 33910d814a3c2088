use assert_cmd::Command;
use assert_cmd::cargo;
use mockito::Server;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn paku() -> Command {
    Command::new(cargo::cargo_bin!("paku"))
}

/// A package layout for MarkdownSharp 1.13.0.0 carrying one library and one
/// tool executable.
fn write_layout(root: &Path) {
    fs::write(
        root.join("MarkdownSharp.paku.json"),
        r#"{"id": "MarkdownSharp", "version": "1.13.0.0"}"#,
    )
    .unwrap();
    fs::create_dir_all(root.join("lib/35")).unwrap();
    fs::write(root.join("lib/35/MarkdownSharp.dll"), "library bytes").unwrap();
    fs::create_dir_all(root.join("tools")).unwrap();
    fs::write(root.join("tools/sharpen.exe"), "tool bytes").unwrap();
}

#[test]
fn test_pack_install_list_remove() {
    let layout = tempdir().unwrap();
    let out = tempdir().unwrap();
    let root = tempdir().unwrap();
    write_layout(layout.path());

    // Pack the layout into an archive.
    paku()
        .arg("pack")
        .arg(layout.path())
        .arg("--out")
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("MarkdownSharp-1.13.0.0.paku"));

    let archive = out.path().join("MarkdownSharp-1.13.0.0.paku");
    assert!(archive.is_file());

    // Install the archive into a fresh store.
    paku()
        .arg("install")
        .arg(&archive)
        .arg("--root")
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("Installed MarkdownSharp-1.13.0.0"));

    let unpacked = root.path().join("packages/MarkdownSharp-1.13.0.0");
    assert!(unpacked.is_dir());
    assert_eq!(
        fs::read_to_string(unpacked.join("lib/35/MarkdownSharp.dll")).unwrap(),
        "library bytes"
    );
    assert!(root.path().join("cache/MarkdownSharp-1.13.0.0.paku").is_file());
    // The tool executable got a launcher script.
    assert!(root.path().join("bin/sharpen").is_file());
    assert!(root.path().join("bin/sharpen.bat").is_file());
    assert!(root.path().join("sources.list").is_file());

    paku()
        .arg("list")
        .arg("--root")
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("MarkdownSharp-1.13.0.0"));

    paku()
        .arg("search")
        .arg("Mark")
        .arg("--root")
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("MarkdownSharp-1.13.0.0"));

    paku()
        .arg("search")
        .arg("Nope")
        .arg("--root")
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicates::str::is_empty());

    // Fetch copies the cached archive out.
    let fetched = tempdir().unwrap();
    paku()
        .arg("fetch")
        .arg("MarkdownSharp")
        .arg("--root")
        .arg(root.path())
        .arg("--out")
        .arg(fetched.path())
        .assert()
        .success();
    assert!(fetched.path().join("MarkdownSharp-1.13.0.0.paku").is_file());

    // Remove takes the package and its launchers with it.
    paku()
        .arg("remove")
        .arg("MarkdownSharp")
        .arg("--root")
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("Removed MarkdownSharp"));

    assert!(!unpacked.exists());
    assert!(!root.path().join("bin/sharpen").exists());

    paku()
        .arg("list")
        .arg("--root")
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicates::str::is_empty());
}

#[test]
fn test_install_from_directory_source() {
    let layout = tempdir().unwrap();
    let archives = tempdir().unwrap();
    let root = tempdir().unwrap();
    write_layout(layout.path());

    paku()
        .arg("pack")
        .arg(layout.path())
        .arg("--out")
        .arg(archives.path())
        .assert()
        .success();

    paku()
        .arg("install")
        .arg("MarkdownSharp")
        .arg("--source")
        .arg(archives.path())
        .arg("--root")
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("Installed MarkdownSharp-1.13.0.0"));

    assert!(root.path().join("packages/MarkdownSharp-1.13.0.0").is_dir());
}

#[test]
fn test_install_from_remote_feed() {
    let layout = tempdir().unwrap();
    let archives = tempdir().unwrap();
    let root = tempdir().unwrap();
    write_layout(layout.path());

    paku()
        .arg("pack")
        .arg(layout.path())
        .arg("--out")
        .arg(archives.path())
        .assert()
        .success();
    let archive_bytes = fs::read(archives.path().join("MarkdownSharp-1.13.0.0.paku")).unwrap();

    let mut server = Server::new();
    let url = server.url();

    let _listing = server
        .mock("GET", "/packages")
        .match_query(mockito::Matcher::UrlEncoded(
            "id".into(),
            "MarkdownSharp".into(),
        ))
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"packages": [{{"id": "MarkdownSharp", "version": "1.13.0.0", "archive_url": "{}/archives/MarkdownSharp-1.13.0.0.paku"}}]}}"#,
            url
        ))
        .create();
    let _download = server
        .mock("GET", "/archives/MarkdownSharp-1.13.0.0.paku")
        .with_body(&archive_bytes)
        .create();

    paku()
        .arg("install")
        .arg("MarkdownSharp")
        .arg("--source")
        .arg(&url)
        .arg("--root")
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("Installed MarkdownSharp-1.13.0.0"));

    assert!(root.path().join("packages/MarkdownSharp-1.13.0.0").is_dir());
}

#[test]
fn test_install_unknown_package_fails() {
    let archives = tempdir().unwrap();
    let root = tempdir().unwrap();

    paku()
        .arg("install")
        .arg("DoesntExist")
        .arg("--source")
        .arg(archives.path())
        .arg("--root")
        .arg(root.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("Package not found"));
}

#[test]
fn test_unpack_archive() {
    let layout = tempdir().unwrap();
    let archives = tempdir().unwrap();
    let dest = tempdir().unwrap();
    write_layout(layout.path());

    paku()
        .arg("pack")
        .arg(layout.path())
        .arg("--out")
        .arg(archives.path())
        .assert()
        .success();

    paku()
        .arg("unpack")
        .arg(archives.path().join("MarkdownSharp-1.13.0.0.paku"))
        .arg("--out")
        .arg(dest.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("MarkdownSharp-1.13.0.0"));

    assert!(
        dest.path()
            .join("MarkdownSharp-1.13.0.0/tools/sharpen.exe")
            .is_file()
    );
}

#[test]
fn test_sources_lists_configured_entries() {
    let root = tempdir().unwrap();
    fs::write(
        root.path().join("sources.list"),
        "Main Feed\thttps://feed.example.com/\n/var/archives\n",
    )
    .unwrap();

    paku()
        .arg("sources")
        .arg("--root")
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("https://feed.example.com/ (feed)"))
        .stdout(predicates::str::contains("/var/archives (directory)"));
}
