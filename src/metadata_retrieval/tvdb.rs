/// TVDB metadata provider implementation.
use super::tvdb_types::{
    TvdbEnvelope, TvdbEpisodePage, TvdbLoginRequest, TvdbSeries, TvdbToken,
};
use super::{
    EpisodeTitleIndex, MetadataProvider, MetadataRetrievalError, ShowInfo, insert_episode_title,
    status_error,
};
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api4.thetvdb.com/v4";

/// Metadata provider for the TVDB v4 API.
///
/// Manifest keys are native TVDB identifiers, so no resolution step is
/// needed. The API requires a bearer token which is obtained on the first
/// request and reused for the lifetime of the provider.
pub struct TvdbProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    pin: Option<String>,
    /// Session token, filled lazily by `bearer_token`
    token: RefCell<Option<String>>,
}

impl TvdbProvider {
    /// Creates a new TVDB provider instance.
    ///
    /// An empty PIN is treated as no PIN.
    pub fn new(api_key: impl Into<String>, pin: Option<String>) -> Self {
        Self::with_base_url(api_key, pin, DEFAULT_BASE_URL)
    }

    /// Creates a provider talking to a different API root.
    pub fn with_base_url(
        api_key: impl Into<String>,
        pin: Option<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            pin: pin.filter(|p| !p.trim().is_empty()),
            token: RefCell::new(None),
        }
    }

    /// Returns the session token, logging in first if there is none yet
    fn bearer_token(&self) -> Result<String, MetadataRetrievalError> {
        if let Some(token) = self.token.borrow().as_ref() {
            return Ok(token.clone());
        }

        let token = self.login()?;
        *self.token.borrow_mut() = Some(token.clone());
        Ok(token)
    }

    fn login(&self) -> Result<String, MetadataRetrievalError> {
        let url = format!("{}/login", self.base_url);
        debug!(url = %url, "TVDB login");

        let response = self
            .client
            .post(&url)
            .json(&TvdbLoginRequest {
                apikey: &self.api_key,
                pin: self.pin.as_deref(),
            })
            .send()
            .map_err(|e| MetadataRetrievalError::AuthenticationFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MetadataRetrievalError::AuthenticationFailed(format!(
                "TVDB login returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let envelope: TvdbEnvelope<TvdbToken> = response
            .json()
            .map_err(|e| MetadataRetrievalError::AuthenticationFailed(e.to_string()))?;

        Ok(envelope.data.token)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        what: &str,
    ) -> Result<T, MetadataRetrievalError> {
        let token = self.bearer_token()?;
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "TVDB request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(params)
            .send()
            .map_err(|e| MetadataRetrievalError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(status_error(response.status(), what));
        }

        response
            .json()
            .map_err(|e| MetadataRetrievalError::ParseError(e.to_string()))
    }
}

impl MetadataProvider for TvdbProvider {
    fn name(&self) -> &str {
        "TVDB"
    }

    fn show_info(&self, id: &str) -> Result<ShowInfo, MetadataRetrievalError> {
        let series: TvdbEnvelope<TvdbSeries> =
            self.get_json(&format!("/series/{}", id), &[], &format!("series {}", id))?;

        ShowInfo::from_provider(
            id,
            series.data.name.as_deref().unwrap_or("Unknown Title"),
            series.data.first_aired.as_deref().unwrap_or("0000"),
        )
    }

    /// Walks the paginated default-order listing, keeping one season.
    ///
    /// A failing page ends the walk; the titles collected so far are kept.
    fn episode_titles(
        &self,
        id: &str,
        season_number: u32,
    ) -> Result<EpisodeTitleIndex, MetadataRetrievalError> {
        let path = format!("/series/{}/episodes/default", id);
        let mut index = EpisodeTitleIndex::new();
        let mut page: u32 = 0;

        loop {
            let page_param = page.to_string();
            let result: Result<TvdbEpisodePage, _> = self.get_json(
                &path,
                &[("page", page_param.as_str())],
                &format!("episodes page {} of series {}", page, id),
            );

            let listing = match result {
                Ok(listing) => listing,
                Err(e) if e.is_fatal() || page == 0 => return Err(e),
                Err(e) => {
                    debug!(error = %e, page, "stopping episode pagination");
                    break;
                }
            };

            let has_next = listing.links.has_next();
            for episode in listing.data.into_episodes() {
                if episode.season_number == Some(i64::from(season_number)) {
                    insert_episode_title(&mut index, episode.number, episode.name.as_deref());
                }
            }

            if !has_next {
                break;
            }
            page += 1;
        }

        Ok(index)
    }
}
