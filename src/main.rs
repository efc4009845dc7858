use iced::widget::{button, column, container, image, row, scrollable, text, text_input, Column};
use iced::{Alignment, Element, Length, Task, Theme};
use rfd::FileDialog;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use photo_renamer::scan::{self, PhotoEntry};
use photo_renamer::{Config, JsonStore, Library, PhotoRecord, Version};

/// Result of a folder scan
#[derive(Debug, Clone)]
struct ScanResult {
    folder: PathBuf,
    entries: Vec<PhotoEntry>,
}

/// Main application state
struct PhotoRenamer {
    /// Tag and photo indices, persisted after every change
    library: Library<JsonStore>,
    /// Status message to display to the user
    status: String,
    /// Rendered listing of the last scanned folder
    listing: String,
    /// Identity of the photo being edited
    selected: Option<String>,
    /// Contents of the tag entry box
    tag_input: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked "Choose Directory To View Photos"
    ChooseDirectory,
    /// Background scan completed
    ScanComplete(ScanResult),
    /// User clicked "Select A Photo"
    SelectPhoto,
    TagInputChanged(String),
    /// Add every comma-separated tag typed in the entry box
    AddTags,
    /// Add a tag picked from the list of all tags
    AddExisting(String),
    DeleteTag(String),
    Revert(Version),
    /// Leave the editing view
    GoBack,
}

impl PhotoRenamer {
    fn new(library: Library<JsonStore>) -> (Self, Task<Message>) {
        let status = format!(
            "Ready. {} photos and {} tags in library.",
            library.photos().len(),
            library.tags().len()
        );

        (
            PhotoRenamer {
                library,
                status,
                listing: String::new(),
                selected: None,
                tag_input: String::new(),
            },
            Task::none(),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::ChooseDirectory => {
                let folder = FileDialog::new()
                    .set_title("Choose Directory To View Photos")
                    .set_directory(start_directory())
                    .pick_folder();

                if let Some(folder) = folder {
                    self.status = format!("Scanning {}...", folder.display());
                    return Task::perform(scan_folder_async(folder), Message::ScanComplete);
                }
                Task::none()
            }
            Message::ScanComplete(result) => {
                self.listing = scan::render_tree(&result.folder, &result.entries);
                self.status = format!(
                    "Found {} photos under {}",
                    result.entries.len(),
                    result.folder.display()
                );
                Task::none()
            }
            Message::SelectPhoto => {
                let picked = FileDialog::new()
                    .set_title("Select A Photo")
                    .set_directory(start_directory())
                    .add_filter("Image files", scan::IMAGE_EXTENSIONS)
                    .pick_file();

                match picked {
                    Some(path) => match self.library.select_photo(&path) {
                        Ok(identity) => {
                            self.status = format!("Selected Photo: {}", path.display());
                            self.selected = Some(identity);
                            self.tag_input.clear();
                        }
                        Err(e) => self.report(e),
                    },
                    None => self.status = "No Photo Selected".to_string(),
                }
                Task::none()
            }
            Message::TagInputChanged(value) => {
                self.tag_input = value;
                Task::none()
            }
            Message::AddTags => {
                let Some(identity) = self.selected.clone() else {
                    return Task::none();
                };
                let input = std::mem::take(&mut self.tag_input);
                if input.trim().is_empty() {
                    self.status = "Please enter a non-empty tag.".to_string();
                    return Task::none();
                }

                match self.library.add_tags(&identity, &input) {
                    Ok(added) if added.is_empty() => {
                        self.status = "This photo already has those tags.".to_string();
                    }
                    Ok(added) => {
                        self.status = format!(
                            "✅ Added {} → {}",
                            added.join(", "),
                            self.current_name()
                        );
                    }
                    Err(e) => {
                        self.tag_input = input;
                        self.report(e);
                    }
                }
                Task::none()
            }
            Message::AddExisting(tag) => {
                if let Some(identity) = self.selected.clone() {
                    match self.library.add_tag(&identity, &tag) {
                        Ok(_) => self.status = format!("✅ Added {tag} → {}", self.current_name()),
                        Err(e) => self.report(e),
                    }
                }
                Task::none()
            }
            Message::DeleteTag(tag) => {
                if let Some(identity) = self.selected.clone() {
                    match self.library.delete_tag(&identity, &tag) {
                        Ok(_) => {
                            self.status = format!("🗑️  Deleted {tag} → {}", self.current_name())
                        }
                        Err(e) => self.report(e),
                    }
                }
                Task::none()
            }
            Message::Revert(version) => {
                if let Some(identity) = self.selected.clone() {
                    match self.library.revert(&identity, version) {
                        Ok(true) => {
                            self.status = format!("⏪ Reverted to {version} → {}", self.current_name())
                        }
                        Ok(false) => {
                            self.status = "That history entry no longer exists.".to_string()
                        }
                        Err(e) => self.report(e),
                    }
                }
                Task::none()
            }
            Message::GoBack => {
                self.selected = None;
                self.tag_input.clear();
                Task::none()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let content = match self.selected.as_deref().and_then(|id| self.library.photo(id)) {
            Some(photo) => self.editing_view(photo),
            None => self.browse_view(),
        };

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .padding(20)
            .into()
    }

    fn browse_view(&self) -> Element<Message> {
        let listing = if self.listing.is_empty() {
            "Select a destination directory to view photos"
        } else {
            self.listing.as_str()
        };

        column![
            text("Photo Renamer").size(36),
            row![
                button("Choose Directory To View Photos")
                    .on_press(Message::ChooseDirectory)
                    .padding(10),
                button("Select A Photo")
                    .on_press(Message::SelectPhoto)
                    .padding(10),
            ]
            .spacing(10),
            scrollable(text(listing).size(14)).height(Length::Fill),
            text(&self.status).size(16),
        ]
        .spacing(20)
        .align_x(Alignment::Center)
        .into()
    }

    fn editing_view<'a>(&'a self, photo: &'a PhotoRecord) -> Element<'a, Message> {
        // Every known tag; the photo's own tags cannot be added twice
        let mut all_tags = Column::new()
            .spacing(5)
            .push(text("All currently used tags").size(16));
        for name in self.library.tags().all().keys() {
            all_tags = all_tags.push(
                row![
                    text(name.as_str()),
                    button("Add")
                        .on_press_maybe((!photo.has_tag(name)).then(|| Message::AddExisting(name.clone()))),
                ]
                .spacing(10)
                .align_y(Alignment::Center),
            );
        }

        let mut photo_tags = Column::new()
            .spacing(5)
            .push(text("All tags of this photo").size(16));
        for name in photo.tags() {
            photo_tags = photo_tags.push(
                row![
                    text(name.as_str()),
                    button("Delete").on_press(Message::DeleteTag(name.clone())),
                ]
                .spacing(10)
                .align_y(Alignment::Center),
            );
        }

        let mut history = Column::new()
            .spacing(5)
            .push(text("Revert change to").size(16));
        for (version, snapshot) in photo.history() {
            let is_current = photo.current_version() == Some(version);
            history = history.push(
                row![
                    text(format!("{} --> {}", snapshot.recorded_at, snapshot.name)),
                    button("Revert").on_press_maybe((!is_current).then_some(Message::Revert(version))),
                ]
                .spacing(10)
                .align_y(Alignment::Center),
            );
        }

        let preview = image(image::Handle::from_path(photo.file_path()))
            .width(Length::FillPortion(3))
            .height(Length::Fill);

        let entry = text_input("Tags, separated by commas", &self.tag_input)
            .on_input(Message::TagInputChanged)
            .on_submit(Message::AddTags)
            .width(Length::Fixed(280.0));

        column![
            text(photo.current_name()).size(24),
            row![
                scrollable(all_tags).width(Length::FillPortion(1)),
                preview,
                scrollable(photo_tags).width(Length::FillPortion(1)),
            ]
            .spacing(20)
            .height(Length::Fill),
            row![
                entry,
                button("Add Tag").on_press(Message::AddTags),
                button("Back").on_press(Message::GoBack),
            ]
            .spacing(10)
            .align_y(Alignment::Center),
            scrollable(history).height(Length::Fixed(160.0)),
            text(&self.status).size(16),
        ]
        .spacing(15)
        .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }

    fn current_name(&self) -> String {
        self.selected
            .as_deref()
            .and_then(|id| self.library.photo(id))
            .map(|photo| photo.current_name().to_string())
            .unwrap_or_default()
    }

    fn report(&mut self, err: photo_renamer::Error) {
        error!("{err}");
        self.status = format!("⚠️  {err}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // The indices must load before any window opens
    let library = Library::open(config.open_store())?;
    info!(data_dir = %config.data_dir.display(), "🎨 Photo Renamer initialized");

    iced::application("Photo Renamer", PhotoRenamer::update, PhotoRenamer::view)
        .theme(PhotoRenamer::theme)
        .centered()
        .run_with(move || PhotoRenamer::new(library))?;

    Ok(())
}

/// Where file dialogs open: the user's pictures folder when there is one
fn start_directory() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Scan a folder for photos
/// Runs on the blocking pool to avoid stalling the UI
async fn scan_folder_async(folder: PathBuf) -> ScanResult {
    let root = folder.clone();
    let entries = tokio::task::spawn_blocking(move || scan::scan_photos(&root))
        .await
        .unwrap_or_else(|e| {
            error!("folder scan failed: {e}");
            Vec::new()
        });

    info!(folder = %folder.display(), found = entries.len(), "📊 Scan complete");
    ScanResult { folder, entries }
}
