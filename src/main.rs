use clap::{Parser, ValueEnum};
use dialoguer::Input;
use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;
use title_card_fetcher::{
    ConfigStore, HttpImageFetcher, ImageFetcher, LayoutPolicy, MetadataProvider, ProgressEvent,
    ProviderKind, RunSummary, TmdbProvider, TvdbProvider, UserConfig, spawn_run,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Downloads posters, backgrounds and episode title cards listed in a YAML manifest
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Manifest file; reads stdin when omitted or `-`
    manifest: Option<PathBuf>,

    /// Metadata provider used for show and episode names
    #[arg(long, value_enum, default_value_t = ProviderArg::Tmdb)]
    provider: ProviderArg,

    /// Library root; defaults to the folder used last time
    #[arg(long)]
    dest: Option<PathBuf>,

    /// Provider API key (also TITLECARD_TMDB_API_KEY / TITLECARD_TVDB_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// TVDB subscriber PIN
    #[arg(long, env = "TITLECARD_TVDB_PIN")]
    pin: Option<String>,

    /// Zero padding of season folder numbers
    #[arg(long)]
    season_padding: Option<usize>,

    /// Reuse existing show folders whose name starts with the show folder name
    #[arg(long)]
    reuse_show_dirs: Option<bool>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderArg {
    Tmdb,
    Tvdb,
}

impl From<ProviderArg> for ProviderKind {
    fn from(value: ProviderArg) -> Self {
        match value {
            ProviderArg::Tmdb => ProviderKind::Tmdb,
            ProviderArg::Tvdb => ProviderKind::Tvdb,
        }
    }
}

fn api_key_env_var(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Tmdb => "TITLECARD_TMDB_API_KEY",
        ProviderKind::Tvdb => "TITLECARD_TVDB_API_KEY",
    }
}

fn provider_label(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Tmdb => "TMDb",
        ProviderKind::Tvdb => "TVDB",
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Handles progress events and prints formatted output
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::Log(entry) => {
            println!("{}", entry);
        }
        ProgressEvent::Progress { current, total } => {
            eprint!("\rProgress: {}/{}", current, total);
            if current == total {
                eprintln!();
            }
            let _ = io::stderr().flush();
        }
    }
}

fn read_manifest(source: Option<&PathBuf>) -> io::Result<String> {
    match source {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path),
        _ => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn prompt(label: &str, allow_empty: bool) -> String {
    match Input::<String>::new()
        .with_prompt(label)
        .allow_empty(allow_empty)
        .interact_text()
    {
        Ok(value) => value.trim().to_string(),
        Err(e) => {
            eprintln!("Error: Failed to read {}: {}", label, e);
            process::exit(1);
        }
    }
}

/// Fills in credentials and destination, returning whether anything changed
fn resolve_settings(args: &Args, kind: ProviderKind, config: &mut UserConfig) -> bool {
    let mut changed = false;

    let api_key = non_blank(args.api_key.clone())
        .or_else(|| non_blank(env::var(api_key_env_var(kind)).ok()))
        .or_else(|| config.api_key(kind))
        .unwrap_or_else(|| prompt(&format!("{} API key", provider_label(kind)), false));
    changed |= config.set_api_key(kind, api_key);

    if kind == ProviderKind::Tvdb {
        let pin = match non_blank(args.pin.clone()) {
            Some(pin) => Some(pin),
            None if config.tvdb_pin.is_some() => non_blank(config.tvdb_pin.clone()),
            None => non_blank(Some(prompt("TVDB PIN (leave empty if not needed)", true))),
        };
        if pin != config.tvdb_pin {
            config.tvdb_pin = pin;
            changed = true;
        }
    }

    if let Some(dest) = &args.dest {
        if config.download_path.as_ref() != Some(dest) {
            config.download_path = Some(dest.clone());
            changed = true;
        }
    }

    changed
}

fn print_summary(summary: &RunSummary) {
    println!("\n=== Summary ===\n");
    println!("  Shows processed:  {}", summary.shows_processed);
    println!("  Shows skipped:    {}", summary.shows_skipped);
    println!("  Downloaded:       {}", summary.downloaded);
    println!("  Already present:  {}", summary.already_present);
    println!("  Failed:           {}", summary.failed);
    println!("  Missing data:     {}", summary.skipped_missing_data);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let kind = ProviderKind::from(args.provider);

    let manifest_text = match read_manifest(args.manifest.as_ref()) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: Failed to read manifest: {}", e);
            process::exit(1);
        }
    };

    let store = match ConfigStore::open() {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(error = %e, "configuration will not be persisted");
            None
        }
    };
    let mut config = store.as_ref().map(ConfigStore::load).unwrap_or_default();

    if resolve_settings(&args, kind, &mut config) {
        if let Some(store) = &store {
            if let Err(e) = store.save(&config) {
                warn!(path = %store.path().display(), error = %e, "failed to save configuration");
            }
        }
    }

    let dest_root = match config.download_path.clone() {
        Some(path) => path,
        None => match env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("Error: Cannot determine current directory: {}", e);
                process::exit(1);
            }
        },
    };

    let defaults = kind.default_layout();
    let layout = LayoutPolicy {
        season_padding: args.season_padding.unwrap_or(defaults.season_padding),
        reuse_existing_show_dirs: args
            .reuse_show_dirs
            .unwrap_or(defaults.reuse_existing_show_dirs),
    };

    let api_key = config.api_key(kind).unwrap_or_default();
    let provider: Box<dyn MetadataProvider + Send> = match kind {
        ProviderKind::Tmdb => Box::new(TmdbProvider::new(api_key)),
        ProviderKind::Tvdb => Box::new(TvdbProvider::new(api_key, config.tvdb_pin.clone())),
    };

    let fetcher: Box<dyn ImageFetcher + Send> = match HttpImageFetcher::new() {
        Ok(fetcher) => Box::new(fetcher),
        Err(e) => {
            eprintln!("Error: Failed to set up downloads: {}", e);
            process::exit(1);
        }
    };

    println!(
        "Saving artwork to {} using {}",
        dest_root.display(),
        provider_label(kind)
    );

    let handle = spawn_run(manifest_text, dest_root, provider, fetcher, layout);
    for event in handle.events() {
        handle_progress_event(event);
    }

    match handle.join() {
        Ok(summary) => print_summary(&summary),
        Err(e) => {
            eprintln!("\nError: {}", e);
            process::exit(1);
        }
    }
}
