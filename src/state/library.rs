use std::fs;
use std::path::Path;
use tracing::{debug, error, info, warn};

use super::photo::{split_identity, PhotoRecord, Version};
use super::photo_index::PhotoIndex;
use super::store::Store;
use super::tag::{split_tag_input, validate_tag_name, TagIndex};
use crate::error::{Error, Result};

/// The Library owns the tag index, the photo index and their store.
///
/// It is the single entry point for every mutation. Each operation updates
/// the in-memory indices, then persists both before returning, so the
/// store reflects every completed step.
pub struct Library<S: Store> {
    tags: TagIndex,
    photos: PhotoIndex,
    store: S,
}

impl<S: Store> Library<S> {
    /// Load both indices from `store` and check they agree with each other
    pub fn open(store: S) -> Result<Self> {
        let (tags, photos) = store.load()?;
        let library = Library { tags, photos, store };
        library.verify_consistency()?;

        info!(
            tags = library.tags.len(),
            photos = library.photos.len(),
            "library opened"
        );
        Ok(library)
    }

    pub fn tags(&self) -> &TagIndex {
        &self.tags
    }

    pub fn photos(&self) -> &PhotoIndex {
        &self.photos
    }

    pub fn photo(&self, identity: &str) -> Option<&PhotoRecord> {
        self.photos.find(identity)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Look up the record for the file at `path`, registering it on first sight
    ///
    /// A file a record already points at resolves to that record, whatever
    /// its current tags. A new file whose identity is already owned by a
    /// different file fails with `IdentityConflict`. Returns the photo's
    /// identity.
    pub fn select_photo(&mut self, path: &Path) -> Result<String> {
        let metadata =
            fs::metadata(path).map_err(|e| Error::io_with_context(path, e, "selecting photo"))?;
        if !metadata.is_file() {
            return Err(Error::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }

        let path = fs::canonicalize(path).map_err(|e| Error::io(path, e))?;
        if let Some(known) = self.photos.find_by_path(&path) {
            debug!(identity = known.identity(), "selected known photo");
            return Ok(known.identity().to_string());
        }

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        let (identity, _) = split_identity(file_name);
        if let Some(known) = self.photos.find(&identity) {
            warn!(
                identity = %identity,
                recorded = %known.file_path().display(),
                selected = %path.display(),
                "identity already owned by another file"
            );
            return Err(Error::IdentityConflict {
                identity,
                recorded: known.file_path(),
                selected: path,
            });
        }

        let photo = PhotoRecord::from_path(&path)?;
        if photo.derived_name() != photo.current_name() {
            return Err(Error::ConsistencyViolation(format!(
                "file '{}' cannot be derived from identity '{}'",
                photo.current_name(),
                photo.identity()
            )));
        }

        let identity = photo.identity().to_string();
        for tag in photo.tags() {
            self.tags.link(tag, &identity);
        }
        info!(identity = %identity, tags = photo.tags().len(), "registered photo");
        self.photos.register(photo);
        self.verify_consistency()?;
        self.persist()?;

        Ok(identity)
    }

    /// Attach `tag` to the photo and rename its file
    pub fn add_tag(&mut self, identity: &str, tag: &str) -> Result<Version> {
        let photo = self
            .photos
            .find_mut(identity)
            .ok_or_else(|| Error::PhotoNotFound(identity.to_string()))?;

        let version = photo.add_tag(&mut self.tags, tag).inspect_err(|e| {
            error!(identity, tag, "failed to add tag: {e}");
        })?;
        self.finish_mutation()?;
        Ok(version)
    }

    /// Add every comma-separated tag in `input` the photo does not carry yet
    ///
    /// All names are validated before the first mutation. Returns the tags
    /// that were added, in input order.
    pub fn add_tags(&mut self, identity: &str, input: &str) -> Result<Vec<String>> {
        let photo = self
            .photos
            .find(identity)
            .ok_or_else(|| Error::PhotoNotFound(identity.to_string()))?;

        let names = split_tag_input(input);
        for name in &names {
            validate_tag_name(name)?;
        }
        let fresh: Vec<String> = names.into_iter().filter(|n| !photo.has_tag(n)).collect();

        for name in &fresh {
            self.add_tag(identity, name)?;
        }
        Ok(fresh)
    }

    /// Detach `tag` from the photo, rename its file and sweep unused tags
    pub fn delete_tag(&mut self, identity: &str, tag: &str) -> Result<Version> {
        let photo = self
            .photos
            .find_mut(identity)
            .ok_or_else(|| Error::PhotoNotFound(identity.to_string()))?;

        let version = photo.delete_tag(&mut self.tags, tag).inspect_err(|e| {
            error!(identity, tag, "failed to delete tag: {e}");
        })?;
        self.finish_mutation()?;
        Ok(version)
    }

    /// Roll the photo back to the snapshot recorded at `version`
    ///
    /// Returns `Ok(false)` if the photo has no such snapshot.
    pub fn revert(&mut self, identity: &str, version: Version) -> Result<bool> {
        let photo = self
            .photos
            .find_mut(identity)
            .ok_or_else(|| Error::PhotoNotFound(identity.to_string()))?;

        match photo.revert(&mut self.tags, version) {
            Ok(()) => {
                self.finish_mutation()?;
                Ok(true)
            }
            Err(e) if e.is_not_found() => {
                debug!(identity, %version, "nothing to revert: {e}");
                Ok(false)
            }
            Err(e) => {
                error!(identity, %version, "failed to revert: {e}");
                Err(e)
            }
        }
    }

    /// Revert to the snapshot `timestamp` refers to
    ///
    /// The creation timestamp always restores the untagged baseline; see
    /// `PhotoRecord::version_at` for other timestamps.
    pub fn revert_to_timestamp(&mut self, identity: &str, timestamp: &str) -> Result<bool> {
        let photo = self
            .photos
            .find(identity)
            .ok_or_else(|| Error::PhotoNotFound(identity.to_string()))?;

        match photo.version_at(timestamp) {
            Some(version) => self.revert(identity, version),
            None => {
                debug!(identity, timestamp, "no snapshot at timestamp");
                Ok(false)
            }
        }
    }

    /// Check that every tag lists exactly the photos that carry it, and
    /// that every filename matches its tags
    pub fn verify_consistency(&self) -> Result<()> {
        for photo in self.photos.all() {
            for tag in photo.tags() {
                let linked = self
                    .tags
                    .find(tag)
                    .is_some_and(|t| t.has_photo(photo.identity()));
                if !linked {
                    return Err(Error::ConsistencyViolation(format!(
                        "photo '{}' carries tag '{tag}' but the tag does not list it",
                        photo.identity()
                    )));
                }
            }
            if photo.derived_name() != photo.current_name() {
                return Err(Error::ConsistencyViolation(format!(
                    "photo '{}' is named '{}' but its tags derive '{}'",
                    photo.identity(),
                    photo.current_name(),
                    photo.derived_name()
                )));
            }
        }

        for tag in self.tags.all().values() {
            for identity in tag.photos() {
                let carries = self
                    .photos
                    .find(identity)
                    .is_some_and(|p| p.has_tag(tag.name()));
                if !carries {
                    return Err(Error::ConsistencyViolation(format!(
                        "tag '{}' lists photo '{identity}' which does not carry it",
                        tag.name()
                    )));
                }
            }
        }

        Ok(())
    }

    fn finish_mutation(&mut self) -> Result<()> {
        debug_assert!(
            self.verify_consistency().is_ok(),
            "{:?}",
            self.verify_consistency()
        );
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        self.store.store_tags(&self.tags)?;
        self.store.store_photos(&self.photos)
    }
}

// Implement Debug for better error messages
impl<S: Store> std::fmt::Debug for Library<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("tags", &self.tags.len())
            .field("photos", &self.photos.len())
            .finish()
    }
}
