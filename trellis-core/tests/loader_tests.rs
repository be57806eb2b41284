//! Directory loader and config-file integration tests.

use assert_fs::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use trellis_core::{Config, ConfigError, DirLoader, LoadError, Loader, LoaderSet, MapLoader};

// ---------------------------------------------------------------------------
// 1. DirLoader
// ---------------------------------------------------------------------------

#[test]
fn dir_loader_reads_nested_names() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("pages/index.html").write_str("<INDEX>").unwrap();

    let loader = DirLoader::new(dir.path());
    assert_eq!(loader.load("pages/index.html").unwrap(), "<INDEX>");
}

#[test]
fn dir_loader_missing_file_is_not_found() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let err = DirLoader::new(dir.path()).load("missing.html").unwrap_err();
    assert!(matches!(err, LoadError::NotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("missing.html"));
}

#[rstest]
#[case("../outside.html")]
#[case("nested/../../outside.html")]
#[case("/etc/hostname")]
fn dir_loader_rejects_escaping_names(#[case] name: &str) {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let err = DirLoader::new(dir.path()).load(name).unwrap_err();
    assert!(matches!(err, LoadError::InvalidName { .. }), "got: {err}");
}

#[test]
fn dir_loader_enforces_extension_allow_list() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("ok.html").write_str("ok").unwrap();
    dir.child("secret.env").write_str("KEY=1").unwrap();

    let loader = DirLoader::new(dir.path()).with_extensions(["html"]);
    assert_eq!(loader.load("ok.html").unwrap(), "ok");
    let err = loader.load("secret.env").unwrap_err();
    assert!(matches!(err, LoadError::DisallowedExtension { .. }), "got: {err}");
}

#[test]
fn dir_loader_lists_allowed_files_across_bases() {
    let a = assert_fs::TempDir::new().expect("tempdir");
    let b = assert_fs::TempDir::new().expect("tempdir");
    a.child("base.html").write_str("x").unwrap();
    a.child("partials/nav.html").write_str("x").unwrap();
    a.child("notes.md").write_str("x").unwrap();
    b.child("base.html").write_str("y").unwrap();
    b.child("extra.html").write_str("y").unwrap();

    let loader = DirLoader::with_bases([a.path(), b.path()]).with_extensions(["html"]);
    assert_eq!(
        loader.list_templates().unwrap(),
        vec!["base.html", "extra.html", "partials/nav.html"]
    );
}

#[test]
fn dir_loader_skips_missing_base_when_listing() {
    let a = assert_fs::TempDir::new().expect("tempdir");
    a.child("one.html").write_str("1").unwrap();
    let loader = DirLoader::new(a.path()).add_base(a.path().join("does-not-exist"));
    assert_eq!(loader.list_templates().unwrap(), vec!["one.html"]);
}

#[test]
fn loader_set_falls_back_from_dir_to_map() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("disk.html").write_str("from disk").unwrap();

    let mut set = LoaderSet::new();
    set.push(DirLoader::new(dir.path()));
    set.push(MapLoader::new().with("memory.html", "from memory"));

    assert_eq!(set.load("disk.html").unwrap(), "from disk");
    assert_eq!(set.load("memory.html").unwrap(), "from memory");
}

// ---------------------------------------------------------------------------
// 2. Config files
// ---------------------------------------------------------------------------

#[test]
fn config_resolves_relative_dirs_against_file_location() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let file = root.child("trellis.yaml");
    file.write_str("cache:\n  enabled: true\n  capacity: 3\ntemplate_dirs: [views]\nextensions: [html]\n")
        .unwrap();

    let cfg = Config::load_at(file.path()).unwrap();
    assert!(cfg.cache.enabled);
    assert_eq!(cfg.cache.capacity, 3);
    assert_eq!(cfg.template_dirs, vec![root.path().join("views")]);
    assert_eq!(cfg.extensions, vec!["html".to_string()]);
}

#[test]
fn config_dir_loader_reads_from_configured_dirs() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("views/page.html").write_str("<PAGE>").unwrap();
    let file = root.child("trellis.yaml");
    file.write_str("template_dirs: [views]\n").unwrap();

    let cfg = Config::load_at(file.path()).unwrap();
    let loader = cfg.dir_loader().expect("dir loader");
    assert_eq!(loader.load("page.html").unwrap(), "<PAGE>");
}

#[test]
fn config_missing_file_is_io_error_with_path() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let err = Config::load_at(&root.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "got: {err}");
    assert!(predicate::str::contains("absent.yaml").eval(&err.to_string()));
}

#[test]
fn config_corrupt_yaml_is_parse_error() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let file = root.child("bad.yaml");
    file.write_str("cache: [unclosed").unwrap();

    let err = Config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("bad.yaml"));
}
