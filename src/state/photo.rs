/// Photo records and their rename history
///
/// A `PhotoRecord` is the versioned entity behind one image file. Every
/// mutation captures a `PhotoSnapshot` (name + tag names) under a new
/// `Version`, so the photo can later be reverted to any recorded state.
/// Snapshots are plain values; they never reference the live record.
///
/// Mutations here move the file on disk *before* touching any in-memory
/// state. A failed move therefore leaves the record, its history and the
/// tag index exactly as they were.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use super::tag::{validate_tag_name, TagIndex};
use crate::error::{Error, Result};
use crate::rename::{self, TaggedName};

/// Format of every history timestamp (second precision)
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Current local time in `TIMESTAMP_FORMAT`
pub fn timestamp_now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Position of a snapshot in a photo's history
///
/// Versions increase with every recorded mutation. Timestamps only have
/// second precision, so several mutations may share one; versions never do.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Version(pub u64);

impl Version {
    /// The untagged creation baseline
    pub const BASELINE: Version = Version(0);

    fn next(self) -> Version {
        Version(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Immutable capture of a photo's name and tags at one moment
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PhotoSnapshot {
    pub recorded_at: String,
    pub name: String,
    /// Tag names in the order they appear in `name`
    pub tags: Vec<String>,
}

impl PhotoSnapshot {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PhotoRecord {
    /// Filename at first registration, with every tag stripped
    identity: String,
    /// Parent directory of the file; fixed for the record's lifetime
    directory: PathBuf,
    current_name: String,
    /// Current tag names in filename order, without duplicates
    tags: Vec<String>,
    history: BTreeMap<Version, PhotoSnapshot>,
    /// Set by the first mutation, together with the baseline snapshot
    creation_timestamp: Option<String>,
    current_version: Option<Version>,
}

impl PhotoRecord {
    /// Build a record for the file at `path`
    ///
    /// A filename that already encodes tags (see `split_identity`) keeps them
    /// as the record's current tags; the identity is the name with those
    /// tokens stripped. The caller links the adopted tags into the tag index.
    pub(crate) fn from_path(path: &Path) -> Result<Self> {
        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| not_a_file(path))?;
        let current_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| not_a_file(path))?;

        let (identity, tags) = split_identity(&current_name);

        Ok(Self {
            identity,
            directory,
            current_name,
            tags,
            history: BTreeMap::new(),
            creation_timestamp: None,
            current_version: None,
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn current_name(&self) -> &str {
        &self.current_name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Absolute path of the file as it is named right now
    pub fn file_path(&self) -> PathBuf {
        self.directory.join(&self.current_name)
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn creation_timestamp(&self) -> Option<&str> {
        self.creation_timestamp.as_deref()
    }

    /// Version of the snapshot matching the current state, if any mutation happened
    pub fn current_version(&self) -> Option<Version> {
        self.current_version
    }

    /// Every recorded snapshot, oldest first
    pub fn history(&self) -> impl Iterator<Item = (Version, &PhotoSnapshot)> + '_ {
        self.history.iter().map(|(version, snapshot)| (*version, snapshot))
    }

    pub fn snapshot(&self, version: Version) -> Option<&PhotoSnapshot> {
        self.history.get(&version)
    }

    /// Version a history timestamp refers to
    ///
    /// The creation timestamp always means the untagged baseline, even when
    /// later mutations were recorded in the same second. Any other timestamp
    /// resolves to the latest version recorded in that second.
    pub fn version_at(&self, timestamp: &str) -> Option<Version> {
        if self.creation_timestamp.as_deref() == Some(timestamp)
            && self.history.contains_key(&Version::BASELINE)
        {
            return Some(Version::BASELINE);
        }
        self.history
            .iter()
            .rev()
            .find(|(_, snapshot)| snapshot.recorded_at == timestamp)
            .map(|(version, _)| *version)
    }

    /// The name the rename engine derives from the identity and current tags
    pub fn derived_name(&self) -> String {
        rename::compose(&self.identity, &self.tags)
    }

    /// Attach `tag`, rename the file and record a snapshot
    ///
    /// Re-adding a tag the photo already carries leaves the tags and name
    /// unchanged but still records a snapshot.
    pub(crate) fn add_tag(&mut self, index: &mut TagIndex, tag: &str) -> Result<Version> {
        validate_tag_name(tag)?;

        let mut tags = self.tags.clone();
        if !self.has_tag(tag) {
            tags.push(tag.to_string());
        }
        let new_name = rename::compose(&self.identity, &tags);
        rename::move_file(&self.file_path(), &new_name)?;

        self.ensure_baseline();
        self.tags = tags;
        index.link(tag, &self.identity);
        self.current_name = new_name;

        let version = self.record_snapshot();
        info!(identity = %self.identity, tag, name = %self.current_name, %version, "tagged photo");
        Ok(version)
    }

    /// Detach `tag`, sweep orphaned tags, rename the file and record a snapshot
    ///
    /// Deleting a tag the photo does not carry still records an unchanged snapshot.
    pub(crate) fn delete_tag(&mut self, index: &mut TagIndex, tag: &str) -> Result<Version> {
        let mut tags = self.tags.clone();
        tags.retain(|t| t != tag);
        let new_name = rename::compose(&self.identity, &tags);
        rename::move_file(&self.file_path(), &new_name)?;

        self.ensure_baseline();
        self.tags = tags;
        index.unlink(tag, &self.identity);
        index.sweep_unused();
        self.current_name = new_name;

        let version = self.record_snapshot();
        info!(identity = %self.identity, tag, name = %self.current_name, %version, "untagged photo");
        Ok(version)
    }

    /// Restore the name and tags recorded at `version`
    ///
    /// Fails with `SnapshotNotFound`, touching nothing, when no such
    /// snapshot exists. Every history entry after `version` is discarded and
    /// unused tags are swept.
    pub(crate) fn revert(&mut self, index: &mut TagIndex, version: Version) -> Result<()> {
        let target = self
            .history
            .get(&version)
            .cloned()
            .ok_or_else(|| Error::SnapshotNotFound {
                identity: self.identity.clone(),
                version,
            })?;

        rename::move_file(&self.file_path(), &target.name)?;

        for tag in target.tags.iter().filter(|t| !self.has_tag(t)) {
            index.link(tag, &self.identity);
        }
        for tag in self.tags.iter().filter(|t| !target.has_tag(t)) {
            index.unlink(tag, &self.identity);
        }
        self.tags = target.tags;
        self.current_name = target.name;

        let discarded = self.history.split_off(&version.next());
        self.current_version = Some(version);
        index.sweep_unused();

        info!(
            identity = %self.identity,
            %version,
            name = %self.current_name,
            discarded = discarded.len(),
            "reverted photo"
        );
        Ok(())
    }

    /// Capture the untagged baseline the first time the record is mutated
    fn ensure_baseline(&mut self) {
        if self.creation_timestamp.is_some() {
            return;
        }
        let now = timestamp_now();
        self.history.insert(
            Version::BASELINE,
            PhotoSnapshot {
                recorded_at: now.clone(),
                name: self.identity.clone(),
                tags: Vec::new(),
            },
        );
        self.creation_timestamp = Some(now);
        self.current_version = Some(Version::BASELINE);
    }

    fn record_snapshot(&mut self) -> Version {
        let version = self
            .history
            .keys()
            .next_back()
            .map_or(Version::BASELINE, |last| last.next());
        self.history.insert(
            version,
            PhotoSnapshot {
                recorded_at: timestamp_now(),
                name: self.current_name.clone(),
                tags: self.tags.clone(),
            },
        );
        self.current_version = Some(version);
        version
    }
}

/// Split a filename into the photo identity and the tags it encodes
///
/// A name counts as tagged only when its tag tokens are valid, distinct, and
/// composing them back onto the stripped identity reproduces the name
/// exactly. Anything else (`me@example.com.jpg`, `a@b@b.jpg`) is its own
/// identity with no tags.
pub(crate) fn split_identity(file_name: &str) -> (String, Vec<String>) {
    let parsed = TaggedName::parse(file_name);
    let tags = parsed.tags();
    let distinct = tags
        .iter()
        .enumerate()
        .all(|(i, tag)| !tags[..i].contains(tag));
    let encodes_tags = !tags.is_empty()
        && distinct
        && tags.iter().all(|t| validate_tag_name(t).is_ok());

    if encodes_tags {
        let identity = parsed.identity();
        if rename::compose(&identity, tags) == file_name {
            return (identity, tags.to_vec());
        }
    }
    (file_name.to_string(), Vec::new())
}

fn not_a_file(path: &Path) -> Error {
    Error::io(
        path,
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a photo file path"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn photo_in(dir: &Path, name: &str) -> PhotoRecord {
        let path = dir.join(name);
        fs::write(&path, b"jpeg").unwrap();
        PhotoRecord::from_path(&path).unwrap()
    }

    #[test]
    fn test_add_tag_renames_file_and_links_tag() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = TagIndex::new();
        let mut photo = photo_in(dir.path(), "img.jpg");

        photo.add_tag(&mut index, "beach").unwrap();

        assert_eq!(photo.current_name(), "img@beach.jpg");
        assert!(dir.path().join("img@beach.jpg").exists());
        assert!(index.find("beach").unwrap().has_photo("img.jpg"));
    }

    #[test]
    fn test_first_mutation_records_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = TagIndex::new();
        let mut photo = photo_in(dir.path(), "img.jpg");
        assert!(photo.creation_timestamp().is_none());
        assert_eq!(photo.history().count(), 0);

        let version = photo.add_tag(&mut index, "beach").unwrap();

        let baseline = photo.snapshot(Version::BASELINE).unwrap();
        assert_eq!(baseline.name, "img.jpg");
        assert!(baseline.tags.is_empty());
        assert_eq!(photo.creation_timestamp(), Some(baseline.recorded_at.as_str()));
        assert_eq!(version, Version(1));
        assert_eq!(photo.current_version(), Some(Version(1)));
    }

    #[test]
    fn test_re_adding_tag_still_records_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = TagIndex::new();
        let mut photo = photo_in(dir.path(), "img.jpg");

        photo.add_tag(&mut index, "beach").unwrap();
        photo.add_tag(&mut index, "beach").unwrap();

        assert_eq!(photo.tags(), ["beach".to_string()]);
        assert_eq!(photo.current_name(), "img@beach.jpg");
        assert_eq!(photo.history().count(), 3);
    }

    #[test]
    fn test_invalid_tag_is_rejected_before_rename() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = TagIndex::new();
        let mut photo = photo_in(dir.path(), "img.jpg");

        let err = photo.add_tag(&mut index, "a@b").unwrap_err();

        assert!(matches!(err, Error::InvalidTagName { .. }));
        assert!(photo.tags().is_empty());
        assert_eq!(photo.history().count(), 0);
        assert!(dir.path().join("img.jpg").exists());
    }

    #[test]
    fn test_failed_move_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = TagIndex::new();
        let mut photo = photo_in(dir.path(), "img.jpg");
        fs::remove_file(dir.path().join("img.jpg")).unwrap();

        let err = photo.add_tag(&mut index, "beach").unwrap_err();

        assert!(matches!(err, Error::FileIo { .. }));
        assert_eq!(photo.current_name(), "img.jpg");
        assert!(photo.tags().is_empty());
        assert!(index.is_empty());
        assert_eq!(photo.history().count(), 0);
    }

    #[test]
    fn test_delete_tag_sweeps_orphans() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = TagIndex::new();
        let mut photo = photo_in(dir.path(), "img.jpg");

        photo.add_tag(&mut index, "beach").unwrap();
        photo.delete_tag(&mut index, "beach").unwrap();

        assert_eq!(photo.current_name(), "img.jpg");
        assert!(index.find("beach").is_none());
    }

    #[test]
    fn test_delete_absent_tag_records_unchanged_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = TagIndex::new();
        let mut photo = photo_in(dir.path(), "img.jpg");
        photo.add_tag(&mut index, "beach").unwrap();

        let version = photo.delete_tag(&mut index, "sunset").unwrap();

        let snapshot = photo.snapshot(version).unwrap();
        assert_eq!(snapshot.name, "img@beach.jpg");
        assert_eq!(snapshot.tags, vec!["beach".to_string()]);
    }

    #[test]
    fn test_revert_to_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = TagIndex::new();
        let mut photo = photo_in(dir.path(), "img.jpg");
        photo.add_tag(&mut index, "beach").unwrap();
        photo.add_tag(&mut index, "sunset").unwrap();
        photo.delete_tag(&mut index, "beach").unwrap();
        assert_eq!(photo.current_name(), "img@sunset.jpg");

        photo.revert(&mut index, Version::BASELINE).unwrap();

        assert_eq!(photo.current_name(), "img.jpg");
        assert!(photo.tags().is_empty());
        assert!(dir.path().join("img.jpg").exists());
        assert!(index.is_empty());
        assert_eq!(photo.history().count(), 1);
        assert_eq!(photo.current_version(), Some(Version::BASELINE));
    }

    #[test]
    fn test_revert_restores_middle_state_and_prunes_later() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = TagIndex::new();
        let mut photo = photo_in(dir.path(), "img.jpg");
        let with_beach = photo.add_tag(&mut index, "beach").unwrap();
        photo.add_tag(&mut index, "sunset").unwrap();
        photo.delete_tag(&mut index, "beach").unwrap();

        photo.revert(&mut index, with_beach).unwrap();

        assert_eq!(photo.current_name(), "img@beach.jpg");
        assert_eq!(photo.tags(), ["beach".to_string()]);
        assert!(photo.history().all(|(version, _)| version <= with_beach));
        assert!(index.find("beach").unwrap().has_photo("img.jpg"));
        assert!(index.find("sunset").is_none());

        // New mutations continue right after the revert target
        let next = photo.add_tag(&mut index, "dusk").unwrap();
        assert_eq!(next, Version(with_beach.0 + 1));
        assert_eq!(photo.current_name(), "img@beach@dusk.jpg");
    }

    #[test]
    fn test_revert_to_unknown_version_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = TagIndex::new();
        let mut photo = photo_in(dir.path(), "img.jpg");
        photo.add_tag(&mut index, "beach").unwrap();

        let err = photo.revert(&mut index, Version(42)).unwrap_err();

        assert!(matches!(err, Error::SnapshotNotFound { version: Version(42), .. }));
        assert!(err.is_not_found());
        assert_eq!(photo.current_name(), "img@beach.jpg");
        assert_eq!(photo.history().count(), 2);
    }

    #[test]
    fn test_from_path_adopts_encoded_tags() {
        let dir = tempfile::tempdir().unwrap();
        let photo = photo_in(dir.path(), "img@beach@sunset.jpg");

        assert_eq!(photo.identity(), "img.jpg");
        assert_eq!(photo.tags(), ["beach".to_string(), "sunset".to_string()]);
        assert_eq!(photo.derived_name(), photo.current_name());
    }

    #[test]
    fn test_from_path_keeps_unparseable_names_whole() {
        let dir = tempfile::tempdir().unwrap();
        let photo = photo_in(dir.path(), "me@example.com.jpg");

        assert_eq!(photo.identity(), "me@example.com.jpg");
        assert!(photo.tags().is_empty());
    }

    #[test]
    fn test_version_at_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = TagIndex::new();
        let mut photo = photo_in(dir.path(), "img.jpg");
        let version = photo.add_tag(&mut index, "beach").unwrap();
        let stamp = photo.snapshot(version).unwrap().recorded_at.clone();

        assert!(photo.version_at(&stamp).is_some());
        assert!(photo.version_at("1999/01/01 00:00:00").is_none());
    }

    #[test]
    fn test_creation_timestamp_resolves_to_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = TagIndex::new();
        let mut photo = photo_in(dir.path(), "img.jpg");
        photo.add_tag(&mut index, "beach").unwrap();
        photo.add_tag(&mut index, "sunset").unwrap();
        photo.delete_tag(&mut index, "beach").unwrap();
        let created = photo.creation_timestamp().unwrap().to_string();

        // Usually every snapshot above shares the creation second
        assert_eq!(photo.version_at(&created), Some(Version::BASELINE));

        let latest = photo.history().last().map(|(version, _)| version).unwrap();
        let latest_stamp = photo.snapshot(latest).unwrap().recorded_at.clone();
        if latest_stamp != created {
            assert_eq!(photo.version_at(&latest_stamp), Some(latest));
        }
    }

    #[test]
    fn test_split_identity_requires_exact_encoding() {
        assert_eq!(
            split_identity("img@beach@sunset.jpg"),
            ("img.jpg".to_string(), vec!["beach".to_string(), "sunset".to_string()])
        );
        assert_eq!(split_identity("a@b@b.jpg"), ("a@b@b.jpg".to_string(), Vec::new()));
        assert_eq!(split_identity("a@@b.jpg"), ("a@@b.jpg".to_string(), Vec::new()));
        assert_eq!(split_identity("img.jpg"), ("img.jpg".to_string(), Vec::new()));
    }

    #[test]
    fn test_identity_with_repeated_tokens_stays_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = TagIndex::new();
        let mut photo = photo_in(dir.path(), "a@b@b.jpg");
        assert_eq!(photo.identity(), "a@b@b.jpg");

        photo.add_tag(&mut index, "b").unwrap();
        assert_eq!(photo.current_name(), "a@b@b@b.jpg");
        assert_eq!(photo.derived_name(), photo.current_name());

        photo.delete_tag(&mut index, "b").unwrap();
        assert_eq!(photo.current_name(), "a@b@b.jpg");
        assert!(dir.path().join("a@b@b.jpg").exists());
    }
}
