//! End-to-end tagging scenarios against real files and a JSON store

use photo_renamer::{Config, Error, JsonStore, Library, Version};
use std::fs;
use std::path::Path;

fn store_in(dir: &Path) -> JsonStore {
    let config = Config {
        data_dir: dir.join("store"),
        ..Config::default()
    };
    config.open_store()
}

fn write_photo(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"not really a jpeg").unwrap();
    path
}

#[test]
fn test_beach_sunset_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_photo(dir.path(), "img.jpg");
    let mut library = Library::open(store_in(dir.path())).unwrap();
    let identity = library.select_photo(&path).unwrap();

    library.add_tag(&identity, "beach").unwrap();
    assert_eq!(library.photo(&identity).unwrap().current_name(), "img@beach.jpg");

    library.add_tag(&identity, "sunset").unwrap();
    assert_eq!(
        library.photo(&identity).unwrap().current_name(),
        "img@beach@sunset.jpg"
    );

    library.delete_tag(&identity, "beach").unwrap();
    assert_eq!(library.photo(&identity).unwrap().current_name(), "img@sunset.jpg");
    assert!(dir.path().join("img@sunset.jpg").exists());

    assert!(library.revert(&identity, Version::BASELINE).unwrap());

    let photo = library.photo(&identity).unwrap();
    assert_eq!(photo.current_name(), "img.jpg");
    assert!(photo.tags().is_empty());
    assert!(library.tags().find("beach").is_none());
    assert!(library.tags().find("sunset").is_none());
    assert!(dir.path().join("img.jpg").exists());
    assert!(!dir.path().join("img@sunset.jpg").exists());
    library.verify_consistency().unwrap();
}

#[test]
fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_photo(dir.path(), "img.jpg");

    let identity = {
        let mut library = Library::open(store_in(dir.path())).unwrap();
        let identity = library.select_photo(&path).unwrap();
        library.add_tags(&identity, "beach, sunset").unwrap();
        identity
    };

    let mut library = Library::open(store_in(dir.path())).unwrap();
    let photo = library.photo(&identity).unwrap();
    assert_eq!(photo.current_name(), "img@beach@sunset.jpg");
    assert_eq!(photo.history().count(), 3);
    assert!(library.tags().find("sunset").unwrap().has_photo(&identity));

    // Selecting the renamed file finds the same record
    let again = library
        .select_photo(&dir.path().join("img@beach@sunset.jpg"))
        .unwrap();
    assert_eq!(again, identity);
    assert_eq!(library.photos().len(), 1);
}

#[test]
fn test_revert_shared_tag_keeps_other_photo() {
    let dir = tempfile::tempdir().unwrap();
    let a_path = write_photo(dir.path(), "a.jpg");
    let b_path = write_photo(dir.path(), "b.jpg");
    let mut library = Library::open(store_in(dir.path())).unwrap();
    let a = library.select_photo(&a_path).unwrap();
    let b = library.select_photo(&b_path).unwrap();

    library.add_tag(&a, "beach").unwrap();
    library.add_tag(&b, "beach").unwrap();
    library.revert(&a, Version::BASELINE).unwrap();

    let beach = library.tags().find("beach").unwrap();
    assert!(beach.has_photo(&b));
    assert!(!beach.has_photo(&a));
    library.verify_consistency().unwrap();
}

#[test]
fn test_failed_rename_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_photo(dir.path(), "img.jpg");
    let mut library = Library::open(store_in(dir.path())).unwrap();
    let identity = library.select_photo(&path).unwrap();

    // Another file already occupies the name the tag would produce
    write_photo(dir.path(), "img@beach.jpg");

    let err = library.add_tag(&identity, "beach").unwrap_err();

    assert!(matches!(err, Error::DestinationExists { .. }));
    let photo = library.photo(&identity).unwrap();
    assert_eq!(photo.current_name(), "img.jpg");
    assert!(photo.tags().is_empty());
    assert!(library.tags().find("beach").is_none());
    assert!(path.exists());
    library.verify_consistency().unwrap();
}

#[test]
fn test_revert_prunes_later_history_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_photo(dir.path(), "img.jpg");
    let mut library = Library::open(store_in(dir.path())).unwrap();
    let identity = library.select_photo(&path).unwrap();

    let first = library.add_tag(&identity, "a").unwrap();
    library.add_tag(&identity, "b").unwrap();
    library.add_tag(&identity, "c").unwrap();

    library.revert(&identity, first).unwrap();
    let photo = library.photo(&identity).unwrap();
    assert!(photo.history().all(|(version, _)| version <= first));
    assert_eq!(photo.current_name(), "img@a.jpg");

    library.add_tag(&identity, "d").unwrap();
    let photo = library.photo(&identity).unwrap();
    assert_eq!(photo.current_name(), "img@a@d.jpg");
    let versions: Vec<Version> = photo.history().map(|(version, _)| version).collect();
    assert_eq!(versions, vec![Version(0), Version(1), Version(2)]);
}

#[test]
fn test_revert_to_missing_version_is_silent() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_photo(dir.path(), "img.jpg");
    let mut library = Library::open(store_in(dir.path())).unwrap();
    let identity = library.select_photo(&path).unwrap();

    // No mutation yet, so not even the baseline exists
    assert!(!library.revert(&identity, Version::BASELINE).unwrap());
    assert!(!library.revert(&identity, Version(7)).unwrap());
    assert_eq!(library.photo(&identity).unwrap().current_name(), "img.jpg");
}

#[test]
fn test_revert_to_creation_timestamp_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_photo(dir.path(), "img.jpg");
    let mut library = Library::open(store_in(dir.path())).unwrap();
    let identity = library.select_photo(&path).unwrap();

    // All within the same second in practice
    library.add_tag(&identity, "beach").unwrap();
    library.add_tag(&identity, "sunset").unwrap();
    library.delete_tag(&identity, "beach").unwrap();
    let created = library
        .photo(&identity)
        .unwrap()
        .creation_timestamp()
        .unwrap()
        .to_string();

    assert!(library.revert_to_timestamp(&identity, &created).unwrap());

    let photo = library.photo(&identity).unwrap();
    assert_eq!(photo.current_name(), "img.jpg");
    assert!(photo.tags().is_empty());
    assert_eq!(photo.current_version(), Some(Version::BASELINE));
    assert!(library.tags().find("beach").is_none());
    assert!(library.tags().find("sunset").is_none());
    assert!(path.exists());
}

#[test]
fn test_repeated_token_name_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_photo(dir.path(), "a@b@b.jpg");

    let identity = {
        let mut library = Library::open(store_in(dir.path())).unwrap();
        library.select_photo(&path).unwrap()
    };
    assert_eq!(identity, "a@b@b.jpg");

    let mut library = Library::open(store_in(dir.path())).unwrap();
    library.add_tag(&identity, "c").unwrap();
    assert!(dir.path().join("a@b@b@c.jpg").exists());
    library.verify_consistency().unwrap();
}

#[test]
fn test_reselecting_tagged_odd_name_keeps_one_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_photo(dir.path(), "me@example.com.jpg");
    let mut library = Library::open(store_in(dir.path())).unwrap();
    let identity = library.select_photo(&path).unwrap();
    library.add_tag(&identity, "beach").unwrap();

    let again = library
        .select_photo(&dir.path().join("me@example.com@beach.jpg"))
        .unwrap();

    assert_eq!(again, identity);
    assert_eq!(library.photos().len(), 1);
    assert!(library.revert(&identity, Version::BASELINE).unwrap());
    assert!(path.exists());
}

#[test]
fn test_second_file_with_same_identity_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_photo(dir.path(), "img.jpg");
    let mut library = Library::open(store_in(dir.path())).unwrap();
    library.select_photo(&path).unwrap();

    let other = write_photo(dir.path(), "img@beach.jpg");
    let err = library.select_photo(&other).unwrap_err();

    assert!(matches!(err, Error::IdentityConflict { .. }));
    assert!(library.tags().is_empty());
    assert_eq!(library.photos().len(), 1);
}
