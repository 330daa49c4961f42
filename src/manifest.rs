//! Manifest parsing module
//!
//! A manifest is a YAML document mapping show identifiers to the artwork
//! URLs for the show, its seasons and its episodes:
//!
//! ```yaml
//! 121361:
//!   url_poster: https://example.com/poster.jpg
//!   url_background: https://example.com/background.jpg
//!   seasons:
//!     1:
//!       url_poster: https://example.com/season1.jpg
//!       episodes:
//!         1:
//!           url_poster: https://example.com/s01e01.jpg
//! ```
//!
//! Parsing only checks the structure that is actually accessed. Unknown keys
//! are ignored and missing sections are treated as empty.

use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Errors that can occur while parsing a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The text is not valid YAML
    #[error("{0}")]
    Syntax(#[from] serde_yaml::Error),

    /// The YAML is valid but a node has the wrong shape
    #[error("{path}: expected {expected}")]
    Structure { path: String, expected: &'static str },

    /// A season or episode key is not a non-negative integer
    #[error("{path}: '{key}' is not a valid number")]
    InvalidNumber { path: String, key: String },
}

/// A parsed manifest, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub shows: Vec<ShowEntry>,
}

/// Artwork for one show
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowEntry {
    /// External show identifier used as the manifest key
    pub key: String,
    pub url_poster: Option<String>,
    pub url_background: Option<String>,
    pub seasons: Vec<SeasonEntry>,
}

/// Artwork for one season of a show
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonEntry {
    /// Season number, `0` for specials
    pub number: u32,
    pub url_poster: Option<String>,
    pub episodes: Vec<EpisodeEntry>,
}

/// The title card of one episode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeEntry {
    pub number: u32,
    pub url_poster: Option<String>,
}

impl Manifest {
    /// Parses manifest text
    ///
    /// An empty document yields an empty manifest.
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let root: Value = serde_yaml::from_str(text)?;

        let shows = match &root {
            Value::Null => Vec::new(),
            Value::Mapping(mapping) => mapping
                .iter()
                .map(|(key, value)| parse_show(key_to_string(key), value))
                .collect::<Result<_, _>>()?,
            _ => {
                return Err(ManifestError::Structure {
                    path: "<root>".to_string(),
                    expected: "a mapping of show identifiers",
                });
            }
        };

        Ok(Self { shows })
    }

    /// Number of episode entries across all seasons of all shows
    ///
    /// This is the unit of work reported through the progress counter.
    pub fn total_episodes(&self) -> usize {
        self.shows.iter().map(ShowEntry::episode_count).sum()
    }
}

impl ShowEntry {
    /// Number of episode entries across all seasons of this show
    pub fn episode_count(&self) -> usize {
        self.seasons.iter().map(|s| s.episodes.len()).sum()
    }
}

fn parse_show(key: String, value: &Value) -> Result<ShowEntry, ManifestError> {
    let Some(mapping) = as_mapping(value, &key)? else {
        return Ok(ShowEntry {
            key,
            ..Default::default()
        });
    };

    let mut seasons = Vec::new();
    if let Some(season_map) = child_mapping(mapping, "seasons", &key)? {
        for (season_key, season_value) in season_map {
            let path = format!("{}/seasons", key);
            let number = parse_number(season_key, &path)?;
            seasons.push(parse_season(number, season_value, &path)?);
        }
    }

    Ok(ShowEntry {
        url_poster: url_field(mapping, "url_poster"),
        url_background: url_field(mapping, "url_background"),
        seasons,
        key,
    })
}

fn parse_season(number: u32, value: &Value, parent: &str) -> Result<SeasonEntry, ManifestError> {
    let path = format!("{}/{}", parent, number);
    let Some(mapping) = as_mapping(value, &path)? else {
        return Ok(SeasonEntry {
            number,
            ..Default::default()
        });
    };

    let mut episodes = Vec::new();
    if let Some(episode_map) = child_mapping(mapping, "episodes", &path)? {
        let episodes_path = format!("{}/episodes", path);
        for (episode_key, episode_value) in episode_map {
            let number = parse_number(episode_key, &episodes_path)?;
            let episode_path = format!("{}/{}", episodes_path, number);
            let url_poster = as_mapping(episode_value, &episode_path)?
                .and_then(|m| url_field(m, "url_poster"));
            episodes.push(EpisodeEntry { number, url_poster });
        }
    }

    Ok(SeasonEntry {
        number,
        url_poster: url_field(mapping, "url_poster"),
        episodes,
    })
}

/// Returns the mapping behind a node, `None` for null
fn as_mapping<'a>(value: &'a Value, path: &str) -> Result<Option<&'a Mapping>, ManifestError> {
    match value {
        Value::Mapping(mapping) => Ok(Some(mapping)),
        Value::Null => Ok(None),
        _ => Err(ManifestError::Structure {
            path: path.to_string(),
            expected: "a mapping",
        }),
    }
}

fn child_mapping<'a>(
    mapping: &'a Mapping,
    name: &str,
    path: &str,
) -> Result<Option<&'a Mapping>, ManifestError> {
    match mapping.get(name) {
        Some(value) => as_mapping(value, &format!("{}/{}", path, name)),
        None => Ok(None),
    }
}

fn url_field(mapping: &Mapping, name: &str) -> Option<String> {
    mapping
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

/// Stringifies a mapping key; YAML happily turns `100:` into an integer
fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

fn parse_number(key: &Value, path: &str) -> Result<u32, ManifestError> {
    let key = key_to_string(key);
    key.trim()
        .parse::<u32>()
        .map_err(|_| ManifestError::InvalidNumber {
            path: path.to_string(),
            key,
        })
}
