/// State management module
///
/// This module handles all tagging state, including:
/// - Tags and the tag index (tag.rs)
/// - Photo records and their rename history (photo.rs)
/// - The index of every known photo (photo_index.rs)
/// - Persistence of both indices (store.rs)
/// - The library that ties them together (library.rs)

pub mod library;
pub mod photo;
pub mod photo_index;
pub mod store;
pub mod tag;
