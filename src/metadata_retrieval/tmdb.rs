/// TMDB metadata provider implementation.
use super::tmdb_types::{TmdbFindResult, TmdbSeason, TmdbShow};
use super::{
    EpisodeTitleIndex, MetadataProvider, MetadataRetrievalError, ShowInfo, insert_episode_title,
    status_error,
};
use serde::de::DeserializeOwned;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Metadata provider for the TMDB v3 API.
///
/// Manifest keys are TVDB identifiers, so every show is first looked up
/// through the `/find` endpoint to get its TMDB identifier. Requests are
/// authenticated with the `api_key` query parameter.
pub struct TmdbProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl TmdbProvider {
    /// Creates a new TMDB provider instance.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Creates a provider talking to a different API root.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        what: &str,
    ) -> Result<T, MetadataRetrievalError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "TMDB request");

        let mut query = vec![("api_key", self.api_key.as_str())];
        query.extend_from_slice(params);

        let response = self
            .client
            .get(&url)
            .query(&query)
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

impl MetadataProvider for TmdbProvider {
    fn name(&self) -> &str {
        "TMDb"
    }

    fn resolve_show_id(&self, external_id: &str) -> Result<String, MetadataRetrievalError> {
        let found: TmdbFindResult = self.get_json(
            &format!("/find/{}", external_id),
            &[("external_source", "tvdb_id")],
            &format!("TVDB ID {}", external_id),
        )?;

        found
            .tv_results
            .first()
            .map(|show| show.id.to_string())
            .ok_or_else(|| {
                MetadataRetrievalError::NotFound(format!(
                    "no TMDb show for TVDB ID {}",
                    external_id
                ))
            })
    }

    fn show_info(&self, id: &str) -> Result<ShowInfo, MetadataRetrievalError> {
        let show: TmdbShow = self.get_json(&format!("/tv/{}", id), &[], &format!("show {}", id))?;

        ShowInfo::from_provider(
            id,
            show.name.as_deref().unwrap_or_default(),
            show.first_air_date.as_deref().unwrap_or_default(),
        )
    }

    fn episode_titles(
        &self,
        id: &str,
        season_number: u32,
    ) -> Result<EpisodeTitleIndex, MetadataRetrievalError> {
        let season: TmdbSeason = self.get_json(
            &format!("/tv/{}/season/{}", id, season_number),
            &[],
            &format!("season {} of show {}", season_number, id),
        )?;

        let mut index = EpisodeTitleIndex::new();
        for episode in season.episodes {
            insert_episode_title(&mut index, episode.episode_number, episode.name.as_deref());
        }

        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn api_key() -> Matcher {
        Matcher::UrlEncoded("api_key".into(), "secret".into())
    }

    #[test]
    fn test_resolve_show_id() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/find/81189")
            .match_query(Matcher::AllOf(vec![
                api_key(),
                Matcher::UrlEncoded("external_source".into(), "tvdb_id".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"movie_results":[],"tv_results":[{"id":1396},{"id":7}]}"#)
            .create();
        let provider = TmdbProvider::with_base_url("secret", server.url());

        assert_eq!(provider.resolve_show_id("81189").unwrap(), "1396");
        mock.assert();
    }

    #[test]
    fn test_resolve_show_id_without_results() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", "/find/1")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"tv_results":[]}"#)
            .create();
        let provider = TmdbProvider::with_base_url("secret", server.url());

        let err = provider.resolve_show_id("1").unwrap_err();
        assert!(matches!(err, MetadataRetrievalError::NotFound(_)));
    }

    #[test]
    fn test_show_info() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", "/tv/1396")
            .match_query(api_key())
            .with_status(200)
            .with_body(r#"{"name":"Breaking Bad: Remastered","first_air_date":"2008-01-20"}"#)
            .create();
        let provider = TmdbProvider::with_base_url("secret", server.url());

        let info = provider.show_info("1396").unwrap();
        assert_eq!(info.title, "Breaking Bad - Remastered");
        assert_eq!(info.year, "2008");
    }

    #[test]
    fn test_show_info_not_found() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", "/tv/404")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"status_code":34}"#)
            .create();
        let provider = TmdbProvider::with_base_url("secret", server.url());

        let err = provider.show_info("404").unwrap_err();
        assert!(matches!(err, MetadataRetrievalError::NotFound(_)));
    }

    #[test]
    fn test_episode_titles() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", "/tv/1396/season/1")
            .match_query(api_key())
            .with_status(200)
            .with_body(
                r#"{"episodes":[
                    {"episode_number":1,"name":"Pilot"},
                    {"episode_number":2,"name":"Cat's in the Bag..."},
                    {"episode_number":3,"name":""}
                ]}"#,
            )
            .create();
        let provider = TmdbProvider::with_base_url("secret", server.url());

        let titles = provider.episode_titles("1396", 1).unwrap();
        assert_eq!(titles.len(), 2);
        assert_eq!(titles[&1], "Pilot");
        assert_eq!(titles[&2], "Cat's in the Bag...");
    }

    #[test]
    fn test_undecodable_body_is_parse_error() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", "/tv/5")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create();
        let provider = TmdbProvider::with_base_url("secret", server.url());

        let err = provider.show_info("5").unwrap_err();
        assert!(matches!(err, MetadataRetrievalError::ParseError(_)));
    }

    #[test]
    fn test_unreachable_server_is_request_error() {
        let provider = TmdbProvider::with_base_url("secret", "http://127.0.0.1:1");
        let err = provider.show_info("1").unwrap_err();
        assert!(matches!(err, MetadataRetrievalError::RequestError(_)));
    }
}
