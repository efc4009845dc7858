//! Photo renamer core
//!
//! Tags are encoded straight into image filenames (`img@beach@sunset.jpg`).
//! Every tag change is recorded as a snapshot so a photo can be reverted to
//! any earlier name and tag set. [`Library`] is the entry point: it owns the
//! tag index, the photo index and the store they are persisted to.

pub mod config;
pub mod error;
pub mod rename;
pub mod scan;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use rename::{RenameMode, TaggedName, TAG_MARKER};
pub use state::library::Library;
pub use state::photo::{PhotoRecord, PhotoSnapshot, Version};
pub use state::photo_index::PhotoIndex;
pub use state::store::{JsonStore, MemoryStore, Store};
pub use state::tag::{split_tag_input, validate_tag_name, Tag, TagIndex};
