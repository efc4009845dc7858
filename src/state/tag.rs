/// Tags and the tag index
///
/// A tag knows which photos carry it (by photo identity). The index owns
/// every known tag by name. Tags whose photo set has gone empty are only
/// removed by an explicit sweep.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::error::{Error, Result};
use crate::rename::TAG_MARKER;

/// A named label and the identities of the photos bearing it
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: String,
    photos: BTreeSet<String>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            photos: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identities of every photo currently bearing this tag
    pub fn photos(&self) -> &BTreeSet<String> {
        &self.photos
    }

    pub fn has_photo(&self, identity: &str) -> bool {
        self.photos.contains(identity)
    }

    /// Unused tags are purged by the next sweep
    pub fn is_unused(&self) -> bool {
        self.photos.is_empty()
    }

    pub(crate) fn add_photo(&mut self, identity: &str) {
        self.photos.insert(identity.to_string());
    }

    pub(crate) fn remove_photo(&mut self, identity: &str) {
        self.photos.remove(identity);
    }
}

/// Every known tag, keyed by name
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct TagIndex {
    tags: BTreeMap<String, Tag>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, name: &str) -> Option<&Tag> {
        self.tags.get(name)
    }

    /// Insert a tag, replacing any existing tag of the same name
    pub fn register(&mut self, tag: Tag) {
        self.tags.insert(tag.name.clone(), tag);
    }

    /// All tags by name, in name order
    pub fn all(&self) -> &BTreeMap<String, Tag> {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Remove every tag with no photos; returns the purged names
    pub fn sweep_unused(&mut self) -> Vec<String> {
        let unused: Vec<String> = self
            .tags
            .values()
            .filter(|tag| tag.is_unused())
            .map(|tag| tag.name.clone())
            .collect();

        for name in &unused {
            self.tags.remove(name);
        }

        if !unused.is_empty() {
            debug!(?unused, "swept unused tags");
        }
        unused
    }

    /// Record that `identity` carries the tag, creating the tag on first use
    pub(crate) fn link(&mut self, name: &str, identity: &str) {
        self.tags
            .entry(name.to_string())
            .or_insert_with(|| Tag::new(name))
            .add_photo(identity);
    }

    /// Record that `identity` no longer carries the tag; the tag itself stays until swept
    pub(crate) fn unlink(&mut self, name: &str, identity: &str) {
        if let Some(tag) = self.tags.get_mut(name) {
            tag.remove_photo(identity);
        }
    }
}

/// Check that a tag name can be encoded into a filename unambiguously
pub fn validate_tag_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        Some("tag name is empty")
    } else if name.contains(TAG_MARKER) {
        Some("tag name must not contain '@'")
    } else if name.contains('.') {
        Some("tag name must not contain '.'")
    } else if name.contains(['/', '\\']) {
        Some("tag name must not contain a path separator")
    } else if name.chars().any(char::is_control) {
        Some("tag name must not contain control characters")
    } else if name != name.trim() {
        Some("tag name must not start or end with whitespace")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::InvalidTagName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Split a comma-separated entry into trimmed, non-empty, de-duplicated names
pub fn split_tag_input(input: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for part in input.split(',') {
        let part = part.trim();
        if !part.is_empty() && !names.iter().any(|n| n == part) {
            names.push(part.to_string());
        }
    }
    names
}
