//! Destination layout for downloaded artwork
//!
//! The layout follows the naming media servers expect:
//!
//! ```text
//! {root}/{Title} ({Year})/poster.jpg
//! {root}/{Title} ({Year})/background.jpg
//! {root}/{Title} ({Year})/Season 01/season01.jpg
//! {root}/{Title} ({Year})/Season 01/{Title} ({Year}) - S01E01 - {Episode}.jpg
//! {root}/{Title} ({Year})/Specials/specials.jpg
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Extension used when a URL does not carry one
const DEFAULT_EXTENSION: &str = ".jpg";

/// Formatting choices that differ between library conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutPolicy {
    /// Zero-padding width of the number in season folder names (`0` = none)
    pub season_padding: usize,
    /// Reuse an existing show folder whose name starts with `{Title} ({Year})`
    pub reuse_existing_show_dirs: bool,
}

impl Default for LayoutPolicy {
    fn default() -> Self {
        Self {
            season_padding: 2,
            reuse_existing_show_dirs: false,
        }
    }
}

/// Sanitizes provider text for use in a single path component
///
/// Colons become `" -"`, other characters that are invalid in filenames on
/// common platforms become `-`, and surrounding whitespace is trimmed.
pub fn sanitize_filename(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());

    for c in name.chars() {
        match c {
            ':' => sanitized.push_str(" -"),
            '/' | '\\' | '*' | '?' | '"' | '<' | '>' | '|' => sanitized.push('-'),
            c if c.is_control() => sanitized.push('-'),
            c => sanitized.push(c),
        }
    }

    sanitized.trim().to_string()
}

/// `"{title} ({year})"`, the name of a show folder and the prefix of its episode files
pub fn show_folder_name(title: &str, year: &str) -> String {
    format!("{} ({})", sanitize_filename(title), year)
}

/// `"Specials"` for season 0, `"Season {N}"` otherwise
pub fn season_folder_name(season: u32, padding: usize) -> String {
    if season == 0 {
        "Specials".to_string()
    } else {
        format!("Season {:0width$}", season, width = padding)
    }
}

/// `"specials{ext}"` for season 0, `"season{NN}{ext}"` otherwise
pub fn season_poster_filename(season: u32, url: &str) -> String {
    let extension = extension_from_url(url);
    if season == 0 {
        format!("specials{}", extension)
    } else {
        format!("season{:02}{}", season, extension)
    }
}

/// Show-level artwork such as `poster.png` or `background.jpg`
pub fn show_artwork_filename(kind: &str, url: &str) -> String {
    format!("{}{}", kind, extension_from_url(url))
}

/// `"{title} ({year}) - S{SS}E{EE} - {episode_title}.jpg"`
///
/// Title cards are always named `.jpg`, whatever the source format.
pub fn episode_filename(
    title: &str,
    year: &str,
    season: u32,
    episode: u32,
    episode_title: &str,
) -> String {
    format!(
        "{} - S{:02}E{:02} - {}.jpg",
        show_folder_name(title, year),
        season,
        episode,
        sanitize_filename(episode_title)
    )
}

/// Extension of the URL's path including the dot, `.jpg` if there is none
pub fn extension_from_url(url: &str) -> String {
    let Ok(parsed) = url::Url::parse(url) else {
        return DEFAULT_EXTENSION.to_string();
    };

    let last_segment = parsed
        .path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or_default();

    match Path::new(last_segment).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!(".{}", ext),
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

/// Returns the folder for a show below `root`, creating it if needed
///
/// With [`LayoutPolicy::reuse_existing_show_dirs`] an existing directory whose
/// name starts with `{title} ({year})` is used as-is, so that folders a user
/// renamed to e.g. `Title (2020) {tvdb-123}` keep receiving artwork. When
/// several match, the first in name order wins.
pub fn ensure_show_dir(
    root: &Path,
    title: &str,
    year: &str,
    policy: &LayoutPolicy,
) -> io::Result<PathBuf> {
    fs::create_dir_all(root)?;
    let folder_name = show_folder_name(title, year);

    if policy.reuse_existing_show_dirs {
        if let Some(existing) = find_prefixed_dir(root, &folder_name)? {
            return Ok(existing);
        }
    }

    let show_dir = root.join(&folder_name);
    fs::create_dir_all(&show_dir)?;
    Ok(show_dir)
}

/// Returns the folder for a season below its show folder, creating it if needed
pub fn ensure_season_dir(
    show_dir: &Path,
    season: u32,
    policy: &LayoutPolicy,
) -> io::Result<PathBuf> {
    let season_dir = show_dir.join(season_folder_name(season, policy.season_padding));
    fs::create_dir_all(&season_dir)?;
    Ok(season_dir)
}

fn find_prefixed_dir(root: &Path, prefix: &str) -> io::Result<Option<PathBuf>> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(prefix))
        })
        .map(|entry| entry.path())
        .collect();

    candidates.sort();
    Ok(candidates.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Normal Title"), "Normal Title");
        assert_eq!(sanitize_filename("Title: With Colon"), "Title - With Colon");
        assert_eq!(sanitize_filename("Path/With\\Slashes"), "Path-With-Slashes");
        assert_eq!(sanitize_filename("  Spaces  "), "Spaces");
        assert_eq!(sanitize_filename("Who?"), "Who-");
        assert_eq!(sanitize_filename("Cat's in the Bag..."), "Cat's in the Bag...");
    }

    #[test]
    fn test_season_folder_name() {
        assert_eq!(season_folder_name(0, 2), "Specials");
        assert_eq!(season_folder_name(0, 0), "Specials");
        assert_eq!(season_folder_name(1, 2), "Season 01");
        assert_eq!(season_folder_name(12, 2), "Season 12");
        assert_eq!(season_folder_name(3, 0), "Season 3");
    }

    #[test]
    fn test_season_poster_filename() {
        assert_eq!(season_poster_filename(0, "https://x/a.png"), "specials.png");
        assert_eq!(season_poster_filename(1, "https://x/a.jpg"), "season01.jpg");
        assert_eq!(season_poster_filename(10, "https://x/asset"), "season10.jpg");
    }

    #[test]
    fn test_episode_filename() {
        assert_eq!(
            episode_filename("Show Name", "2020", 1, 1, "Pilot"),
            "Show Name (2020) - S01E01 - Pilot.jpg"
        );
        assert_eq!(
            episode_filename("Show", "1999", 0, 12, "Part 1: Origins"),
            "Show (1999) - S00E12 - Part 1 - Origins.jpg"
        );
    }

    #[test]
    fn test_extension_from_url() {
        assert_eq!(extension_from_url("https://x/img.png"), ".png");
        assert_eq!(extension_from_url("https://x/img.webp?w=500#frag"), ".webp");
        assert_eq!(extension_from_url("https://x/assets/abc-123"), ".jpg");
        assert_eq!(extension_from_url("https://x/"), ".jpg");
        assert_eq!(extension_from_url("not a url"), ".jpg");
        assert_eq!(show_artwork_filename("background", "https://x/b.jpeg"), "background.jpeg");
    }

    #[test]
    fn test_ensure_show_dir_creates_folder() {
        let root = tempfile::tempdir().unwrap();
        let dir = ensure_show_dir(root.path(), "Show", "2020", &LayoutPolicy::default()).unwrap();

        assert_eq!(dir, root.path().join("Show (2020)"));
        assert!(dir.is_dir());

        // Idempotent
        let again = ensure_show_dir(root.path(), "Show", "2020", &LayoutPolicy::default()).unwrap();
        assert_eq!(again, dir);
    }

    #[test]
    fn test_ensure_show_dir_creates_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let library = root.path().join("library");
        let dir = ensure_show_dir(&library, "Show", "2020", &LayoutPolicy::default()).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_ensure_show_dir_reuses_prefixed_folder() {
        let root = tempfile::tempdir().unwrap();
        let existing = root.path().join("Show (2020) {tvdb-100}");
        fs::create_dir(&existing).unwrap();
        // A file with a matching name is not a candidate
        fs::write(root.path().join("Show (2020) notes"), b"").unwrap();

        let reuse = LayoutPolicy {
            season_padding: 0,
            reuse_existing_show_dirs: true,
        };
        assert_eq!(ensure_show_dir(root.path(), "Show", "2020", &reuse).unwrap(), existing);

        let exact = ensure_show_dir(root.path(), "Show", "2020", &LayoutPolicy::default()).unwrap();
        assert_eq!(exact, root.path().join("Show (2020)"));
    }

    #[test]
    fn test_ensure_season_dir() {
        let root = tempfile::tempdir().unwrap();
        let unpadded = LayoutPolicy {
            season_padding: 0,
            reuse_existing_show_dirs: false,
        };

        let specials = ensure_season_dir(root.path(), 0, &unpadded).unwrap();
        assert_eq!(specials, root.path().join("Specials"));

        let season = ensure_season_dir(root.path(), 4, &unpadded).unwrap();
        assert_eq!(season, root.path().join("Season 4"));
        assert!(season.is_dir());
    }
}
