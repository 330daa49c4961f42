/// TVDB API response types for deserialization.
///
/// These structures mirror the JSON response format of the TVDB v4 API.
use serde::{Deserialize, Serialize};

/// Request body of the `/login` endpoint.
#[derive(Debug, Serialize)]
pub(super) struct TvdbLoginRequest<'a> {
    pub apikey: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<&'a str>,
}

/// Every TVDB response wraps its payload in a `data` field.
#[derive(Debug, Deserialize)]
pub(super) struct TvdbEnvelope<T> {
    pub data: T,
}

/// Payload of the `/login` endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct TvdbToken {
    pub token: String,
}

/// Payload of the `/series/{id}` endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct TvdbSeries {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "firstAired", default)]
    pub first_aired: Option<String>,
}

/// One page of the `/series/{id}/episodes/default` endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct TvdbEpisodePage {
    pub data: TvdbEpisodeData,
    #[serde(default)]
    pub links: TvdbLinks,
}

/// The episode list is either bare or nested next to the series record.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum TvdbEpisodeData {
    List(Vec<TvdbEpisode>),
    Nested {
        #[serde(default)]
        episodes: Vec<TvdbEpisode>,
    },
}

impl TvdbEpisodeData {
    pub fn into_episodes(self) -> Vec<TvdbEpisode> {
        match self {
            Self::List(episodes) | Self::Nested { episodes } => episodes,
        }
    }
}

/// Pagination links of a listing page.
#[derive(Debug, Default, Deserialize)]
pub(super) struct TvdbLinks {
    /// Absent, null or empty on the last page
    #[serde(default)]
    pub next: Option<serde_json::Value>,
}

impl TvdbLinks {
    pub fn has_next(&self) -> bool {
        match &self.next {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }
}

/// A single episode from the TVDB API.
#[derive(Debug, Deserialize)]
pub(super) struct TvdbEpisode {
    #[serde(rename = "seasonNumber", default)]
    pub season_number: Option<i64>,
    #[serde(default)]
    pub number: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}
