/// Rename engine
///
/// Tags live in the filename itself: every tag is appended before the
/// extension as `@` followed by the tag name, in the order the tags were
/// added. `img.jpg` tagged `beach` then `sunset` becomes
/// `img@beach@sunset.jpg`.
///
/// Names are modelled as a base stem plus an ordered list of tag tokens
/// instead of being edited with substring arithmetic, so tags that are
/// substrings of each other (`sun` / `sunset`) never clobber one another.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Character that introduces every tag token in a filename
pub const TAG_MARKER: char = '@';

/// Whether a tag is being attached to or removed from a name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameMode {
    Add,
    Delete,
}

/// A filename split into its stem, tag tokens and extension
///
/// The extension keeps its leading dot (`.jpg`) and is empty when the name
/// has none. Formatting a parsed name reproduces the input byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedName {
    stem: String,
    tags: Vec<String>,
    extension: String,
}

impl TaggedName {
    /// Split a base filename into stem, tag tokens and extension
    pub fn parse(file_name: &str) -> Self {
        let (base, extension) = split_extension(file_name);

        let mut tokens = base.split(TAG_MARKER);
        // split() always yields at least one item
        let stem = tokens.next().unwrap_or_default().to_string();
        let tags = tokens.map(str::to_string).collect();

        Self {
            stem,
            tags,
            extension: extension.to_string(),
        }
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Tag tokens in filename order
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Append a tag token unless it is already present
    pub fn with_tag(mut self, tag: &str) -> Self {
        if !self.has_tag(tag) {
            self.tags.push(tag.to_string());
        }
        self
    }

    /// Drop the first token equal to `tag`; unknown tags leave the name alone
    pub fn without_tag(mut self, tag: &str) -> Self {
        if let Some(pos) = self.tags.iter().position(|t| t == tag) {
            self.tags.remove(pos);
        }
        self
    }

    /// The untagged name: stem and extension only
    pub fn identity(&self) -> String {
        format!("{}{}", self.stem, self.extension)
    }
}

impl fmt::Display for TaggedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem)?;
        for tag in &self.tags {
            write!(f, "{}{}", TAG_MARKER, tag)?;
        }
        f.write_str(&self.extension)
    }
}

/// Derive the filename after `tag` is added to or removed from `current`
///
/// Pure and deterministic. Adding a tag the name already carries and
/// deleting one it does not carry both return the name unchanged.
pub fn apply(current: &str, tag: &str, mode: RenameMode) -> String {
    let name = TaggedName::parse(current);
    let renamed = match mode {
        RenameMode::Add => name.with_tag(tag),
        RenameMode::Delete => name.without_tag(tag),
    };
    renamed.to_string()
}

/// The untagged filename a tagged filename derives from
pub fn identity_of(file_name: &str) -> String {
    TaggedName::parse(file_name).identity()
}

/// The filename of `identity` once it carries `tags`, in order
///
/// The identity is opaque: a `@` inside it belongs to the stem and is never
/// read back as a tag token, so `a@b.jpg` tagged `b` is `a@b@b.jpg`.
pub fn compose(identity: &str, tags: &[String]) -> String {
    let (stem, extension) = split_extension(identity);
    let untagged = TaggedName {
        stem: stem.to_string(),
        tags: Vec::new(),
        extension: extension.to_string(),
    };
    tags.iter()
        .fold(untagged, |name, tag| name.with_tag(tag))
        .to_string()
}

fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(dot) => file_name.split_at(dot),
        None => (file_name, ""),
    }
}

/// Rename the file at `path` to `new_name` within the same directory
///
/// Returns the new path. Renaming to the current name is a no-op as long as
/// the source exists. Fails if the source is missing, if the destination is
/// occupied by a different file, or if the OS refuses the rename.
pub fn move_file(path: &Path, new_name: &str) -> Result<PathBuf> {
    let target = path.with_file_name(new_name);

    if !path.exists() {
        warn!(path = %path.display(), "rename source is missing");
        return Err(Error::io_with_context(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "source file does not exist"),
            "renaming photo",
        ));
    }

    if target == path {
        return Ok(target);
    }

    // Case-insensitive filesystems report the target as existing when only
    // the case differs; that is still the same file.
    if target.exists() && !same_file(path, &target) {
        return Err(Error::DestinationExists {
            from: path.to_path_buf(),
            to: target,
        });
    }

    fs::rename(path, &target)
        .map_err(|e| Error::io_with_context(path, e, format!("renaming to '{new_name}'")))?;

    debug!(from = %path.display(), to = %target.display(), "renamed file");
    Ok(target)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
