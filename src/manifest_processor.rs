//! Manifest processing
//!
//! Walks a parsed manifest show by show, season by season and episode by
//! episode. Every network and file operation happens sequentially on the
//! calling thread.

use crate::image_fetcher::ImageFetcher;
use crate::manifest::{EpisodeEntry, Manifest, SeasonEntry, ShowEntry};
use crate::metadata_retrieval::{
    EpisodeTitleIndex, MetadataProvider, MetadataRetrievalError, ResolvedShow,
};
use crate::path_planner::{self, LayoutPolicy};
use crate::progress::ProgressCounter;
use crate::{LogEntry, ProgressEvent, RunError, RunSummary};
use humansize::{DECIMAL, format_size};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// State of a single run over one manifest
pub(crate) struct ManifestRun<'a, F>
where
    F: FnMut(ProgressEvent),
{
    pub dest_root: &'a Path,
    pub provider: &'a dyn MetadataProvider,
    pub fetcher: &'a dyn ImageFetcher,
    pub layout: &'a LayoutPolicy,
    pub progress: &'a ProgressCounter,
    pub on_event: F,
    pub summary: RunSummary,
}

impl<F> ManifestRun<'_, F>
where
    F: FnMut(ProgressEvent),
{
    pub fn log(&mut self, message: impl Into<String>) {
        (self.on_event)(ProgressEvent::Log(LogEntry::now(message)));
    }

    /// Counts one episode entry as processed
    fn advance(&mut self) {
        let (current, total) = self.progress.advance(1);
        (self.on_event)(ProgressEvent::Progress { current, total });
    }

    /// Parses the manifest and processes every show in it
    pub fn run(mut self, manifest_text: &str) -> Result<RunSummary, RunError> {
        let manifest = match Manifest::parse(manifest_text) {
            Ok(manifest) => manifest,
            Err(e) => {
                self.log(format!("Failed to parse YAML: {}", e));
                return Err(RunError::Parse(e));
            }
        };

        let total = manifest.total_episodes();
        self.progress.start(total);
        (self.on_event)(ProgressEvent::Progress { current: 0, total });

        for show in &manifest.shows {
            self.process_show(show)?;
        }

        self.log("All done.");
        Ok(self.summary)
    }

    fn process_show(&mut self, show: &ShowEntry) -> Result<(), RunError> {
        let Some(resolved) = self.resolve(show)? else {
            self.summary.shows_skipped += 1;
            for _ in 0..show.episode_count() {
                self.advance();
            }
            return Ok(());
        };

        let show_dir = path_planner::ensure_show_dir(
            self.dest_root,
            &resolved.display_title,
            &resolved.air_year,
            self.layout,
        )
        .map_err(|source| {
            let path = self.dest_root.join(path_planner::show_folder_name(
                &resolved.display_title,
                &resolved.air_year,
            ));
            self.directory_failed(path, source)
        })?;

        if let Some(url) = &show.url_poster {
            let dest = show_dir.join(path_planner::show_artwork_filename("poster", url));
            self.fetch_artwork(url, &dest, "show poster");
        }
        if let Some(url) = &show.url_background {
            let dest = show_dir.join(path_planner::show_artwork_filename("background", url));
            self.fetch_artwork(url, &dest, "background");
        }

        for season in &show.seasons {
            self.process_season(&resolved, &show_dir, season)?;
        }

        self.summary.shows_processed += 1;
        self.log(format!(
            "Finished processing {} ({})",
            resolved.display_title, resolved.air_year
        ));
        Ok(())
    }

    /// Looks the show up; `None` means it is skipped
    fn resolve(&mut self, show: &ShowEntry) -> Result<Option<ResolvedShow>, RunError> {
        let internal_id = match self.provider.resolve_show_id(&show.key) {
            Ok(id) => id,
            Err(e) if e.is_fatal() => return Err(self.authentication_failed(e)),
            Err(e) => {
                debug!(key = %show.key, error = %e, "show identifier lookup failed");
                self.log(format!(
                    "{} ID not found for TVDB ID {}",
                    self.provider.name(),
                    show.key
                ));
                return Ok(None);
            }
        };

        match self.provider.show_info(&internal_id) {
            Ok(info) => Ok(Some(ResolvedShow {
                internal_id,
                display_title: info.title,
                air_year: info.year,
            })),
            Err(e) if e.is_fatal() => Err(self.authentication_failed(e)),
            Err(e) => {
                self.log(format!("Could not get title/year for {} ({})", show.key, e));
                Ok(None)
            }
        }
    }

    fn process_season(
        &mut self,
        show: &ResolvedShow,
        show_dir: &Path,
        season: &SeasonEntry,
    ) -> Result<(), RunError> {
        let season_dir = path_planner::ensure_season_dir(show_dir, season.number, self.layout)
            .map_err(|source| {
                let path = show_dir.join(path_planner::season_folder_name(
                    season.number,
                    self.layout.season_padding,
                ));
                self.directory_failed(path, source)
            })?;

        if let Some(url) = &season.url_poster {
            let dest = season_dir.join(path_planner::season_poster_filename(season.number, url));
            self.fetch_artwork(url, &dest, "season poster");
        }

        let titles = match self.provider.episode_titles(&show.internal_id, season.number) {
            Ok(titles) => titles,
            Err(e) if e.is_fatal() => return Err(self.authentication_failed(e)),
            Err(e) => {
                self.log(format!(
                    "Could not get episode titles for {} ({}) {}: {}",
                    show.display_title,
                    show.air_year,
                    path_planner::season_folder_name(season.number, self.layout.season_padding),
                    e
                ));
                EpisodeTitleIndex::new()
            }
        };

        for episode in &season.episodes {
            self.process_episode(show, &season_dir, season.number, episode, &titles);
            self.advance();
        }

        Ok(())
    }

    fn process_episode(
        &mut self,
        show: &ResolvedShow,
        season_dir: &Path,
        season_number: u32,
        episode: &EpisodeEntry,
        titles: &EpisodeTitleIndex,
    ) {
        let (Some(url), Some(episode_title)) = (&episode.url_poster, titles.get(&episode.number))
        else {
            self.summary.skipped_missing_data += 1;
            return;
        };

        let filename = path_planner::episode_filename(
            &show.display_title,
            &show.air_year,
            season_number,
            episode.number,
            episode_title,
        );
        let dest = season_dir.join(&filename);

        if dest.exists() {
            self.summary.already_present += 1;
            return;
        }

        match self.fetcher.download(url, &dest) {
            Ok(bytes) if dest.is_file() => {
                self.summary.downloaded += 1;
                self.log(format!("Downloaded: {} ({})", filename, format_size(bytes, DECIMAL)));
            }
            Ok(_) => {
                self.summary.failed += 1;
                self.log(format!("Failed to download: {}", filename));
            }
            Err(e) => {
                warn!(url = %url, error = %e, "title card download failed");
                self.summary.failed += 1;
                self.log(format!("Failed to download: {}", filename));
            }
        }
    }

    /// Downloads show or season artwork unless it is already on disk
    fn fetch_artwork(&mut self, url: &str, dest: &Path, label: &str) {
        if dest.exists() {
            self.summary.already_present += 1;
            return;
        }

        match self.fetcher.download(url, dest) {
            Ok(_) if dest.is_file() => {
                self.summary.downloaded += 1;
                self.log(format!("Downloaded {}: {}", label, dest.display()));
            }
            Ok(_) => {
                self.summary.failed += 1;
                self.log(format!("Failed to download {}: {}", label, dest.display()));
            }
            Err(e) => {
                warn!(url = %url, error = %e, "{} download failed", label);
                self.summary.failed += 1;
                self.log(format!("Failed to download {}: {}", label, dest.display()));
            }
        }
    }

    fn authentication_failed(&mut self, error: MetadataRetrievalError) -> RunError {
        self.log(format!("{} {}", self.provider.name(), error));
        RunError::Authentication(error)
    }

    fn directory_failed(&mut self, path: PathBuf, source: io::Error) -> RunError {
        self.log(format!("Failed to create directory {}: {}", path.display(), source));
        RunError::Io { path, source }
    }
}
