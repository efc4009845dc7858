/// Directory scan for the browse view
///
/// Walks a folder recursively and collects every image file, recognised by
/// extension.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions treated as photos (compared lowercase)
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp", "heic",
    // RAW formats
    "nef", "dng", "cr2", "cr3", "arw", "raf", "orf", "rw2", "pef", "srw",
];

/// Prefix repeated once per nesting level in the rendered tree
pub const TREE_PREFIX: &str = "--";

/// One image file found under the scanned folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoEntry {
    pub path: PathBuf,
    /// 1 for files directly inside the scanned folder
    pub depth: usize,
}

impl PhotoEntry {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }
}

pub fn is_image(path: &Path) -> bool {
    match path.extension() {
        Some(extension) => {
            let ext = extension.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Every image file under `dir`, sorted by path
///
/// Unreadable entries are skipped.
pub fn scan_photos(dir: &Path) -> Vec<PhotoEntry> {
    let mut entries: Vec<PhotoEntry> = WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_image(e.path()))
        .map(|e| PhotoEntry {
            depth: e.depth(),
            path: e.into_path(),
        })
        .collect();

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!(dir = %dir.display(), found = entries.len(), "scanned folder");
    entries
}

/// Render the scan as a nested listing
///
/// The folder itself comes first, then every directory that holds photos
/// and the photos, each prefixed once per nesting level.
pub fn render_tree(dir: &Path, entries: &[PhotoEntry]) -> String {
    let mut out = format!("{}\n", dir.display());
    let mut last_parent: Option<&Path> = None;

    for entry in entries {
        let parent = entry.path.parent();
        if entry.depth > 1 && parent != last_parent {
            if let Some(folder) = parent.and_then(Path::file_name) {
                out.push_str(&TREE_PREFIX.repeat(entry.depth - 1));
                out.push_str(&folder.to_string_lossy());
                out.push('\n');
            }
        }
        last_parent = parent;

        out.push_str(&TREE_PREFIX.repeat(entry.depth));
        out.push_str(&entry.file_name());
        out.push('\n');
    }
    out
}
