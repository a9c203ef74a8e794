//! Gallery listing sources: the studio's script endpoint, local JSON files, and snapshots.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use memorybook_core::Image;
use serde_json::Value;
use tracing::warn;

mod endpoint;
mod worker;

pub use endpoint::{ActionResponse, ScriptEndpoint};
pub use reqwest::Url;
pub use worker::{FetchOutcome, FetchWorker, spawn_fetch};

/// Anything that can deliver the gallery listing, oldest entry first.
pub trait GallerySource: Send + Sync {
    fn fetch_gallery(&self) -> anyhow::Result<Vec<Image>>;

    fn describe(&self) -> String;
}

impl GallerySource for ScriptEndpoint {
    fn fetch_gallery(&self) -> anyhow::Result<Vec<Image>> {
        self.gallery()
    }

    fn describe(&self) -> String {
        self.base_url().to_string()
    }
}

/// Reads a listing from a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileGallery {
    path: PathBuf,
}

impl FileGallery {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl GallerySource for FileGallery {
    fn fetch_gallery(&self) -> anyhow::Result<Vec<Image>> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read gallery listing {}", self.path.display()))?;
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("parse gallery listing {}", self.path.display()))?;
        parse_listing(value)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A fixed listing, e.g. the last stored snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticGallery {
    images: Vec<Image>,
    label: String,
}

impl StaticGallery {
    pub fn new(images: Vec<Image>, label: impl Into<String>) -> Self {
        Self {
            images,
            label: label.into(),
        }
    }
}

impl GallerySource for StaticGallery {
    fn fetch_gallery(&self) -> anyhow::Result<Vec<Image>> {
        Ok(self.images.clone())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Accepts either a bare array or an object wrapping it under `data` / `images`.
/// Entries that do not decode are skipped.
pub fn parse_listing(value: Value) -> anyhow::Result<Vec<Image>> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("data").or_else(|| map.remove("images")) {
            Some(Value::Array(entries)) => entries,
            _ => {
                if let Some(Value::String(err)) = map.get("error") {
                    anyhow::bail!("gallery listing error: {err}");
                }
                anyhow::bail!("gallery listing is not an array");
            }
        },
        other => anyhow::bail!("gallery listing is not an array: {other}"),
    };

    let mut images = Vec::with_capacity(entries.len());
    for (pos, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<Image>(entry) {
            Ok(image) if !image.image_url.trim().is_empty() => images.push(image),
            Ok(_) => warn!(pos, "skipping listing entry without imageUrl"),
            Err(err) => warn!(pos, %err, "skipping malformed listing entry"),
        }
    }
    Ok(images)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLocation {
    Remote(Url),
    Local(PathBuf),
}

/// Resolves an `imageUrl` that may be absolute, relative to the endpoint, or a local path.
pub fn resolve_image_url(
    base: Option<&Url>,
    root: Option<&Path>,
    raw: &str,
) -> anyhow::Result<ImageLocation> {
    let raw = raw.trim();
    if raw.is_empty() {
        anyhow::bail!("empty image url");
    }

    if let Ok(url) = Url::parse(raw) {
        return match url.scheme() {
            "http" | "https" => Ok(ImageLocation::Remote(url)),
            "file" => url
                .to_file_path()
                .map(ImageLocation::Local)
                .map_err(|_| anyhow::anyhow!("invalid file url: {raw}")),
            other => anyhow::bail!("unsupported image url scheme: {other}"),
        };
    }

    if let Some(base) = base {
        let url = base
            .join(raw)
            .with_context(|| format!("resolve {raw} against {base}"))?;
        return Ok(ImageLocation::Remote(url));
    }

    let path = PathBuf::from(raw);
    Ok(ImageLocation::Local(match root {
        Some(root) if path.is_relative() => root.join(path),
        _ => path,
    }))
}

/// Downloads (or reads) the bytes behind an `imageUrl` for the fullscreen preview.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: reqwest::blocking::Client,
    base: Option<Url>,
    root: Option<PathBuf>,
}

impl ImageFetcher {
    pub fn new(base: Option<Url>, root: Option<PathBuf>) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("build http client")?;
        Ok(Self { client, base, root })
    }

    pub fn fetch(&self, raw_url: &str) -> anyhow::Result<Vec<u8>> {
        match resolve_image_url(self.base.as_ref(), self.root.as_deref(), raw_url)? {
            ImageLocation::Remote(url) => {
                let response = self
                    .client
                    .get(url.clone())
                    .send()
                    .with_context(|| format!("download {url}"))?
                    .error_for_status()
                    .with_context(|| format!("download {url}"))?;
                let bytes = response.bytes().with_context(|| format!("read body of {url}"))?;
                Ok(bytes.to_vec())
            }
            ImageLocation::Local(path) => {
                std::fs::read(&path).with_context(|| format!("read image {}", path.display()))
            }
        }
    }
}
