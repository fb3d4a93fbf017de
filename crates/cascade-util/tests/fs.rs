use cascade_util::fs::{read_source, IncludePath};
use tempfile::TempDir;

#[test]
fn test_from_colon_list_skips_empty_entries() {
    let path = IncludePath::from_colon_list("a::b: :c:");
    let dirs: Vec<_> = path.dirs().iter().map(|d| d.to_string_lossy().to_string()).collect();
    assert_eq!(dirs, vec!["a", "b", "c"]);
}

#[test]
fn test_push_ignores_duplicates() {
    let mut path = IncludePath::new();
    path.push("lib");
    path.push("lib");
    assert_eq!(path.dirs().len(), 1);
}

#[test]
fn test_resolve_searches_dirs_in_order() {
    let tmp = TempDir::new().unwrap();
    let first = tmp.path().join("first");
    let second = tmp.path().join("second");
    std::fs::create_dir_all(&first).unwrap();
    std::fs::create_dir_all(&second).unwrap();
    std::fs::write(second.join("top.v"), "").unwrap();

    let mut path = IncludePath::new();
    path.push(&first);
    path.push(&second);
    assert_eq!(path.resolve("top.v", None), Some(second.join("top.v")));

    std::fs::write(first.join("top.v"), "").unwrap();
    assert_eq!(path.resolve("top.v", None), Some(first.join("top.v")));
}

#[test]
fn test_resolve_prefers_relative_directory() {
    let tmp = TempDir::new().unwrap();
    let local = tmp.path().join("local");
    let search = tmp.path().join("search");
    std::fs::create_dir_all(&local).unwrap();
    std::fs::create_dir_all(&search).unwrap();
    std::fs::write(local.join("inc.v"), "").unwrap();
    std::fs::write(search.join("inc.v"), "").unwrap();

    let mut path = IncludePath::new();
    path.push(&search);
    assert_eq!(path.resolve("inc.v", Some(&local)), Some(local.join("inc.v")));
}

#[test]
fn test_resolve_absolute_path() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("abs.v");
    std::fs::write(&file, "").unwrap();
    let path = IncludePath::new();
    assert_eq!(path.resolve(file.to_str().unwrap(), None), Some(file.clone()));
    assert_eq!(path.resolve(tmp.path().join("missing.v").to_str().unwrap(), None), None);
}

#[test]
fn test_resolve_missing_file() {
    let path = IncludePath::from_colon_list("/definitely/not/here");
    assert_eq!(path.resolve("nothing.v", None), None);
}

#[test]
fn test_read_source_error_mentions_path() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("gone.v");
    let err = read_source(&missing).unwrap_err();
    assert!(err.to_string().contains("gone.v"), "got: {err}");
}
