use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use memorybook_core::{Catalog, Image, ImageId, ImageKind, Settings};
use memorybook_remote::{
    FileGallery, GallerySource, ImageFetcher, ScriptEndpoint, StaticGallery, Url,
};
use memorybook_storage::Storage;
use memorybook_ui::{SnapshotSink, Ui};
use tracing::info;
use tracing_subscriber::EnvFilter;

const API_URL_ENV: &str = "MEMORYBOOK_API_URL";
const LOG_ENV: &str = "MEMORYBOOK_LOG";

/// Memory Book - browse the studio gallery as a flip book in the terminal
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Gallery script endpoint (saved for later runs)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Browse the last stored snapshot instead of fetching
    #[arg(long, conflicts_with = "file")]
    offline: bool,

    /// Read the gallery listing from a JSON file
    #[arg(long)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the book (default)
    Browse,

    /// Add one image to the gallery
    Add {
        /// Image URL
        url: String,

        /// Target the background collection
        #[arg(long)]
        background: bool,
    },

    /// Add several images at once
    AddMany {
        /// Image URLs; blank entries are ignored
        #[arg(required = true)]
        urls: Vec<String>,

        /// Target the background collection
        #[arg(long)]
        background: bool,
    },

    /// Delete an image by id
    Delete {
        id: String,

        /// Target the background collection
        #[arg(long)]
        background: bool,
    },

    /// Print the gallery, latest first
    List {
        /// List the background collection instead
        #[arg(long)]
        background: bool,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let project_dirs =
        ProjectDirs::from("dev", "memorybook", "memorybook").context("resolve project dirs")?;

    let config_dir = project_dirs.config_dir();
    fs::create_dir_all(config_dir)
        .with_context(|| format!("create config dir {}", config_dir.display()))?;
    let data_dir = project_dirs.data_dir();
    fs::create_dir_all(data_dir)
        .with_context(|| format!("create data dir {}", data_dir.display()))?;

    let _log_guard = init_logging(data_dir)?;

    let db_path = config_dir.join("memorybook.db");
    let storage = Storage::open(&db_path)?;
    let mut settings = storage.load_settings()?;
    let env_url = std::env::var(API_URL_ENV).ok();
    if resolve_api_url(&mut settings, cli.api_url.as_deref(), env_url.as_deref()) {
        storage.save_settings(&settings)?;
    }

    match cli.command.unwrap_or(Command::Browse) {
        Command::Browse => browse(storage, settings, cli.offline, cli.file),
        Command::Add { url, background } => {
            let endpoint = endpoint(&settings)?;
            let kind = image_kind(background);
            let response = endpoint.add_image(kind, &url)?;
            println!("{}", response.message.as_deref().unwrap_or("image added"));
            Ok(())
        }
        Command::AddMany { urls, background } => {
            let endpoint = endpoint(&settings)?;
            let kind = image_kind(background);
            let added = endpoint.add_images(kind, &urls)?;
            println!("added {added} image(s)");
            Ok(())
        }
        Command::Delete { id, background } => {
            let endpoint = endpoint(&settings)?;
            let kind = image_kind(background);
            let id = ImageId(id);
            let response = endpoint.delete_image(kind, &id)?;
            println!("{}", response.message.as_deref().unwrap_or("image deleted"));
            Ok(())
        }
        Command::List { background } => {
            let endpoint = endpoint(&settings)?;
            let fetched = if background {
                endpoint.backgrounds()?
            } else {
                endpoint.gallery()?
            };
            let catalog = Catalog::from_fetched(fetched, settings.layout());
            for image in catalog.images() {
                println!("{}\t{}\t{}", image.id, image.display_title(), image.image_url);
            }
            info!(count = catalog.len(), "listed gallery");
            Ok(())
        }
    }
}

fn browse(
    storage: Storage,
    settings: Settings,
    offline: bool,
    file: Option<PathBuf>,
) -> anyhow::Result<()> {
    // Snapshots are only written for live sources.
    let source: Arc<dyn GallerySource>;
    let fetcher: ImageFetcher;
    let mut snapshot_label = None;
    if offline {
        let snapshot = storage
            .load_snapshot()?
            .context("no stored gallery snapshot; run once while online")?;
        info!(
            source = %snapshot.source,
            fetched_at = snapshot.fetched_at,
            count = snapshot.images.len(),
            "browsing stored snapshot"
        );
        fetcher = ImageFetcher::new(http_base(&snapshot.source), None)?;
        let label = format!("snapshot of {}", snapshot.source);
        source = Arc::new(StaticGallery::new(snapshot.images, label));
    } else if let Some(path) = file {
        let gallery = FileGallery::new(&path);
        snapshot_label = Some(gallery.describe());
        fetcher = ImageFetcher::new(None, path.parent().map(Path::to_path_buf))?;
        source = Arc::new(gallery);
    } else {
        let endpoint = endpoint(&settings)?;
        snapshot_label = Some(endpoint.describe());
        fetcher = ImageFetcher::new(Some(endpoint.base_url().clone()), None)?;
        source = Arc::new(endpoint);
    }

    let mut ui = Ui::new(settings, source, fetcher)?;
    if let Some(label) = snapshot_label {
        ui = ui.with_snapshot_sink(snapshot_sink(storage, label));
    }
    ui.run()
}

/// Stores each listing as soon as it loads, so a crash later in the session keeps it.
fn snapshot_sink(mut storage: Storage, label: String) -> SnapshotSink {
    Box::new(move |images: &[Image]| -> anyhow::Result<()> {
        storage.save_snapshot(images, &label)?;
        info!(count = images.len(), source = %label, "stored gallery snapshot");
        Ok(())
    })
}

/// Applies CLI > env > stored precedence. Returns whether the stored value changed.
fn resolve_api_url(settings: &mut Settings, cli: Option<&str>, env: Option<&str>) -> bool {
    let non_empty = |value: Option<&str>| {
        value
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };
    if let Some(url) = non_empty(cli) {
        let changed = settings.api_url.as_deref() != Some(url.as_str());
        settings.api_url = Some(url);
        return changed;
    }
    if let Some(url) = non_empty(env) {
        settings.api_url = Some(url);
    }
    false
}

fn endpoint(settings: &Settings) -> anyhow::Result<ScriptEndpoint> {
    let url = settings.api_url.as_deref().with_context(|| {
        format!("no gallery endpoint configured; pass --api-url or set {API_URL_ENV}")
    })?;
    ScriptEndpoint::new(url)
}

fn http_base(source: &str) -> Option<Url> {
    Url::parse(source)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

fn image_kind(background: bool) -> ImageKind {
    if background {
        ImageKind::Background
    } else {
        ImageKind::Gallery
    }
}

fn init_logging(data_dir: &Path) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = data_dir.join("logs");
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("create log dir {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&log_dir, "memorybook.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("install log subscriber: {err}"))?;
    Ok(guard)
}
