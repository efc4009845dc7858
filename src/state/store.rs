/// Persistence for the tag and photo indices
///
/// Each index is stored whole, as one JSON blob, after every mutation.
/// `JsonStore` writes to a sibling temp file and renames it into place, so
/// a reader sees either the previous blob or the new one, never half of it.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::photo_index::PhotoIndex;
use super::tag::TagIndex;
use crate::error::{Error, Result};

pub trait Store {
    /// Load what was last stored, or empty indices if nothing ever was
    fn load(&self) -> Result<(TagIndex, PhotoIndex)>;

    fn store_tags(&self, tags: &TagIndex) -> Result<()>;

    fn store_photos(&self, photos: &PhotoIndex) -> Result<()>;
}

/// Two JSON files at fixed paths
#[derive(Debug, Clone)]
pub struct JsonStore {
    tags_path: PathBuf,
    photos_path: PathBuf,
}

impl JsonStore {
    pub fn new(tags_path: impl Into<PathBuf>, photos_path: impl Into<PathBuf>) -> Self {
        Self {
            tags_path: tags_path.into(),
            photos_path: photos_path.into(),
        }
    }

    pub fn tags_path(&self) -> &Path {
        &self.tags_path
    }

    pub fn photos_path(&self) -> &Path {
        &self.photos_path
    }
}

impl Store for JsonStore {
    fn load(&self) -> Result<(TagIndex, PhotoIndex)> {
        Ok((read_json(&self.tags_path)?, read_json(&self.photos_path)?))
    }

    fn store_tags(&self, tags: &TagIndex) -> Result<()> {
        write_json_atomic(&self.tags_path, tags)
    }

    fn store_photos(&self, photos: &PhotoIndex) -> Result<()> {
        write_json_atomic(&self.photos_path, photos)
    }
}

/// Missing and empty files both read as the default value
fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(Error::io_with_context(path, e, "reading index")),
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(&bytes).map_err(|source| Error::Serialization {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value).map_err(|source| Error::Serialization {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| Error::io_with_context(parent, e, "creating store directory"))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let mut file =
        File::create(&tmp_path).map_err(|e| Error::io_with_context(&tmp_path, e, "creating temp file"))?;
    file.write_all(&json)
        .and_then(|()| file.sync_all())
        .map_err(|e| Error::io_with_context(&tmp_path, e, "writing index"))?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|e| Error::io_with_context(path, e, "replacing index"))?;

    debug!(path = %path.display(), bytes = json.len(), "stored index");
    Ok(())
}

/// Keeps the serialized blobs in memory; used by tests and embedders
#[derive(Debug, Default)]
pub struct MemoryStore {
    tags: RefCell<Option<String>>,
    photos: RefCell<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn load(&self) -> Result<(TagIndex, PhotoIndex)> {
        Ok((
            decode_blob(self.tags.borrow().as_deref())?,
            decode_blob(self.photos.borrow().as_deref())?,
        ))
    }

    fn store_tags(&self, tags: &TagIndex) -> Result<()> {
        *self.tags.borrow_mut() = Some(encode_blob(tags)?);
        Ok(())
    }

    fn store_photos(&self, photos: &PhotoIndex) -> Result<()> {
        *self.photos.borrow_mut() = Some(encode_blob(photos)?);
        Ok(())
    }
}

fn encode_blob<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|source| Error::Serialization {
        path: PathBuf::from("<memory>"),
        source,
    })
}

fn decode_blob<T: DeserializeOwned + Default>(blob: Option<&str>) -> Result<T> {
    match blob {
        Some(json) => serde_json::from_str(json).map_err(|source| Error::Serialization {
            path: PathBuf::from("<memory>"),
            source,
        }),
        None => Ok(T::default()),
    }
}
