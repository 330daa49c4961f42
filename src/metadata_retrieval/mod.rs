/// Data structures and traits for TV series metadata retrieval.
///
/// This module provides the show and episode information needed to name
/// artwork files, as well as the trait implemented by each metadata provider.
mod tmdb;
mod tmdb_types;
mod tvdb;
mod tvdb_types;

pub use tmdb::TmdbProvider;
pub use tvdb::TvdbProvider;

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during metadata retrieval operations.
#[derive(Debug, Error)]
pub enum MetadataRetrievalError {
    /// Request to the metadata provider failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Failed to parse the provider's JSON response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The provider has no usable record for the identifier
    #[error("Not found: {0}")]
    NotFound(String),

    /// Logging in to the provider failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
}

impl MetadataRetrievalError {
    /// Whether no further metadata call can succeed in this run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_))
    }
}

/// Title and first-air year of a show, ready to be used in paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowInfo {
    pub title: String,
    pub year: String,
}

impl ShowInfo {
    /// Builds show info from raw provider fields
    ///
    /// Colons in the title become `" -"` and the year is the first four
    /// characters of the air date. Empty values are reported as not found.
    pub fn from_provider(
        id: &str,
        name: &str,
        air_date: &str,
    ) -> Result<Self, MetadataRetrievalError> {
        let title = name.trim().replace(':', " -");
        let year: String = air_date.trim().chars().take(4).collect();

        if title.is_empty() || year.is_empty() {
            return Err(MetadataRetrievalError::NotFound(format!(
                "show {} has no title or air date",
                id
            )));
        }

        Ok(Self { title, year })
    }
}

/// A show resolved against the provider for the duration of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedShow {
    /// The provider's own identifier
    pub internal_id: String,
    pub display_title: String,
    pub air_year: String,
}

/// Episode number to episode title, for a single season of a single show
pub type EpisodeTitleIndex = BTreeMap<u32, String>;

/// Adds an episode to the index when both number and title are usable
pub(crate) fn insert_episode_title(
    index: &mut EpisodeTitleIndex,
    number: Option<i64>,
    name: Option<&str>,
) {
    let Some(number) = number.and_then(|n| u32::try_from(n).ok()) else {
        return;
    };
    let title = name.map(str::trim).unwrap_or_default();
    if !title.is_empty() {
        index.insert(number, title.to_string());
    }
}

/// Trait for metadata providers that can look up shows and episode titles.
///
/// Implementors of this trait retrieve metadata from a media database such as
/// TMDB or TVDB.
pub trait MetadataProvider {
    /// Short provider name used in log messages
    fn name(&self) -> &str;

    /// Maps a manifest key to the provider's internal show identifier.
    ///
    /// Providers whose native identifiers are used as manifest keys keep the
    /// default, which returns the key unchanged.
    fn resolve_show_id(&self, external_id: &str) -> Result<String, MetadataRetrievalError> {
        Ok(external_id.to_string())
    }

    /// Fetches the title and first-air year of a show.
    fn show_info(&self, id: &str) -> Result<ShowInfo, MetadataRetrievalError>;

    /// Fetches the titles of all episodes in one season of a show.
    ///
    /// # Arguments
    ///
    /// * `id` - The provider's internal show identifier
    /// * `season_number` - The season to list, `0` for specials
    fn episode_titles(
        &self,
        id: &str,
        season_number: u32,
    ) -> Result<EpisodeTitleIndex, MetadataRetrievalError>;
}

/// Maps a non-success HTTP status to a metadata error
pub(crate) fn status_error(status: reqwest::StatusCode, what: &str) -> MetadataRetrievalError {
    MetadataRetrievalError::NotFound(format!(
        "{} (HTTP {} {})",
        what,
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    ))
}
