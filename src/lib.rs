//! Title Card Fetcher - Download media library artwork from a YAML manifest
//!
//! This library provides the core functionality for reading an artwork
//! manifest, looking up show and episode names with a metadata provider and
//! saving posters, backgrounds and episode title cards into a folder layout
//! media servers understand.

mod config;
mod image_fetcher;
mod manifest;
mod manifest_processor;
mod metadata_retrieval;
mod path_planner;
mod progress;
mod temp;
mod worker;

use chrono::{DateTime, Local};
use manifest_processor::ManifestRun;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Re-export error types
pub use config::ConfigError;
pub use image_fetcher::DownloadError;
pub use manifest::ManifestError;
pub use metadata_retrieval::MetadataRetrievalError;

// Re-export pipeline building blocks
pub use config::{ConfigStore, UserConfig};
pub use image_fetcher::{HttpImageFetcher, ImageFetcher};
pub use manifest::{EpisodeEntry, Manifest, SeasonEntry, ShowEntry};
pub use metadata_retrieval::{
    EpisodeTitleIndex, MetadataProvider, ResolvedShow, ShowInfo, TmdbProvider, TvdbProvider,
};
pub use path_planner::{
    LayoutPolicy, episode_filename, extension_from_url, sanitize_filename, season_folder_name,
    season_poster_filename, show_artwork_filename, show_folder_name,
};
pub use progress::ProgressCounter;
pub use worker::{RunHandle, spawn_run};

/// Metadata provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// TMDB, keyed by TVDB identifiers resolved through `/find`
    Tmdb,
    /// TVDB, keyed by native identifiers
    Tvdb,
}

impl ProviderKind {
    /// The library layout each provider integration uses by default
    ///
    /// The TMDB integration writes `Season 01` folders and always uses the
    /// exact show folder name. The TVDB integration writes `Season 1` folders
    /// and reuses existing folders that start with the show folder name.
    pub fn default_layout(self) -> LayoutPolicy {
        match self {
            ProviderKind::Tmdb => LayoutPolicy {
                season_padding: 2,
                reuse_existing_show_dirs: false,
            },
            ProviderKind::Tvdb => LayoutPolicy {
                season_padding: 0,
                reuse_existing_show_dirs: true,
            },
        }
    }
}

/// A timestamped line of the run log
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// When the line was emitted
    pub timestamp: DateTime<Local>,
    pub message: String,
}

impl LogEntry {
    /// Creates a log entry stamped with the current local time
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.message
        )
    }
}

/// Progress event emitted during a run
///
/// These events allow library users to display the run log and a progress
/// indicator, or to remain silent.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A line for the run log
    Log(LogEntry),

    /// Episode entries processed so far
    Progress { current: usize, total: usize },
}

/// What a completed run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Shows whose metadata was found and whose artwork was processed
    pub shows_processed: usize,
    /// Shows skipped because their metadata could not be retrieved
    pub shows_skipped: usize,
    /// Files written in this run
    pub downloaded: usize,
    /// Files that already existed and were left untouched
    pub already_present: usize,
    /// Downloads that did not produce a file
    pub failed: usize,
    /// Episode entries without an image URL or without a known episode title
    pub skipped_missing_data: usize,
}

/// Errors that end a run early
#[derive(Debug, Error)]
pub enum RunError {
    /// The manifest could not be parsed; nothing was processed
    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] ManifestError),

    /// The metadata provider rejected the credentials
    #[error("Metadata provider authentication failed: {0}")]
    Authentication(MetadataRetrievalError),

    /// A show or season folder could not be created
    #[error("Failed to create directory {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The background worker terminated abnormally
    #[error("Download worker panicked")]
    WorkerPanicked,
}

/// Processes an artwork manifest and downloads everything it lists
///
/// The manifest is parsed first; a parse failure is reported as a single log
/// event and ends the run before anything touches the network or the file
/// system. Otherwise the total number of episode entries is published through
/// `progress`, and every show is looked up with the metadata provider and
/// its artwork is saved below `dest_root`. Files that already exist are never
/// downloaded again, so re-running a manifest only fetches what is missing.
///
/// Shows that cannot be found and downloads that fail are logged and
/// skipped. Only a parse failure, an authentication failure or a folder that
/// cannot be created ends the run with an error.
///
/// # Arguments
///
/// * `manifest_text` - The YAML manifest
/// * `dest_root` - The library root the show folders are created in
/// * `provider` - The metadata provider used for show and episode names
/// * `fetcher` - The image fetcher used for downloads
/// * `layout` - Folder naming policy
/// * `progress` - Counter advanced once per episode entry
/// * `progress_callback` - Closure called with log and progress events
///
/// # Examples
///
/// ```no_run
/// use title_card_fetcher::{
///     HttpImageFetcher, ProgressCounter, ProgressEvent, ProviderKind, TmdbProvider,
///     process_manifest,
/// };
/// use std::path::Path;
///
/// let provider = TmdbProvider::new("api-key");
/// let fetcher = HttpImageFetcher::new().unwrap();
/// let progress = ProgressCounter::new();
///
/// let summary = process_manifest(
///     "81189:\n  url_poster: https://example.com/poster.jpg\n",
///     Path::new("/srv/media/tv"),
///     &provider,
///     &fetcher,
///     &ProviderKind::Tmdb.default_layout(),
///     &progress,
///     |event| {
///         if let ProgressEvent::Log(entry) = event {
///             println!("{}", entry);
///         }
///     },
/// )
/// .unwrap();
///
/// println!("Downloaded {} file(s)", summary.downloaded);
/// ```
pub fn process_manifest<F>(
    manifest_text: &str,
    dest_root: &Path,
    provider: &dyn MetadataProvider,
    fetcher: &dyn ImageFetcher,
    layout: &LayoutPolicy,
    progress: &ProgressCounter,
    progress_callback: F,
) -> Result<RunSummary, RunError>
where
    F: FnMut(ProgressEvent),
{
    ManifestRun {
        dest_root,
        provider,
        fetcher,
        layout,
        progress,
        on_event: progress_callback,
        summary: RunSummary::default(),
    }
    .run(manifest_text)
}
