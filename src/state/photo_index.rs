/// Index of every photo the user has ever selected, keyed by identity

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::photo::PhotoRecord;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct PhotoIndex {
    photos: BTreeMap<String, PhotoRecord>,
}

impl PhotoIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, identity: &str) -> Option<&PhotoRecord> {
        self.photos.get(identity)
    }

    /// The record whose file is currently named `path`
    pub fn find_by_path(&self, path: &Path) -> Option<&PhotoRecord> {
        self.photos.values().find(|photo| photo.file_path() == path)
    }

    pub(crate) fn find_mut(&mut self, identity: &str) -> Option<&mut PhotoRecord> {
        self.photos.get_mut(identity)
    }

    /// Insert a record, replacing any record with the same identity
    pub(crate) fn register(&mut self, photo: PhotoRecord) {
        self.photos.insert(photo.identity().to_string(), photo);
    }

    pub fn all(&self) -> impl Iterator<Item = &PhotoRecord> + '_ {
        self.photos.values()
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}
