/// TMDB API response types for deserialization.
///
/// These structures mirror the JSON response format of the TMDB v3 API.
use serde::Deserialize;

/// Response of the `/find/{external_id}` endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbFindResult {
    /// Matching TV shows, best match first
    #[serde(default)]
    pub tv_results: Vec<TmdbFoundShow>,
}

/// A TV show found by external identifier.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbFoundShow {
    pub id: u64,
}

/// Response of the `/tv/{id}` endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbShow {
    #[serde(default)]
    pub name: Option<String>,
    /// Date in `YYYY-MM-DD` format, may be empty for unaired shows
    #[serde(default)]
    pub first_air_date: Option<String>,
}

/// Response of the `/tv/{id}/season/{season_number}` endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbSeason {
    #[serde(default)]
    pub episodes: Vec<TmdbEpisode>,
}

/// A single episode in a TMDB season listing.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbEpisode {
    pub episode_number: Option<i64>,
    pub name: Option<String>,
}
