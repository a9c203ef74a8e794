//! Core domain types for Memory Book.

use serde::{Deserialize, Deserializer, Serialize};

mod catalog;

pub use catalog::{
    BOOK_LIMIT, Catalog, IMAGES_PER_PAGE, PageLayout, Spread, partition, total_pages,
};

pub const DEFAULT_FLIP_DELAY_MS: u64 = 450;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ImageId(pub String);

impl ImageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// The listing endpoint emits ids as either strings or spreadsheet row numbers.
impl<'de> Deserialize<'de> for ImageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Int(i64),
            Float(f64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => ImageId(s.trim().to_string()),
            RawId::Int(n) => ImageId(n.to_string()),
            RawId::Float(n) if n.fract() == 0.0 => ImageId(format!("{}", n as i64)),
            RawId::Float(n) => ImageId(n.to_string()),
        })
    }
}

/// A catalog entry as delivered by the gallery listing. Never mutated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(default)]
    pub id: ImageId,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Image {
    pub fn display_title(&self) -> &str {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title,
            _ => "Gallery",
        }
    }

    pub fn caption(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
    }
}

/// Which collection an admin action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    #[serde(rename = "gallery")]
    Gallery,
    #[serde(rename = "bg")]
    Background,
}

impl ImageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKind::Gallery => "gallery",
            ImageKind::Background => "bg",
        }
    }
}

impl std::fmt::Display for ImageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ImageKind {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gallery" => Ok(ImageKind::Gallery),
            "bg" | "background" | "backgrounds" => Ok(ImageKind::Background),
            _ => Err("unknown image kind"),
        }
    }
}

/// Left or right half of a page spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Half {
    Left,
    Right,
}

/// Frame style applied to a book tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStyle {
    Polaroid,
    Vintage,
}

impl FrameStyle {
    const CYCLE: [FrameStyle; 4] = [
        FrameStyle::Polaroid,
        FrameStyle::Vintage,
        FrameStyle::Polaroid,
        FrameStyle::Vintage,
    ];

    pub fn for_tile(half: Half, slot: usize) -> Self {
        let offset = match half {
            Half::Left => 0,
            Half::Right => 2,
        };
        Self::CYCLE[(slot + offset) % Self::CYCLE.len()]
    }
}

/// Collage tiles at every seventh position are drawn large.
pub fn is_big_collage_tile(collage_index: usize) -> bool {
    collage_index % 7 == 0
}

/// 1-based number printed in a half-page header.
pub fn half_page_number(current_page: usize, half: Half) -> usize {
    match half {
        Half::Left => current_page * 2 + 1,
        Half::Right => current_page * 2 + 2,
    }
}

/// "Page 3 - 4 of 10" style indicator for the navigation bar.
pub fn page_indicator(current_page: usize, total_pages: usize) -> String {
    let last = total_pages * 2;
    format!(
        "Page {} - {} of {}",
        current_page * 2 + 1,
        (current_page * 2 + 2).min(last),
        last
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_url: Option<String>,
    pub book_limit: usize,
    pub images_per_page: usize,
    pub flip_delay_ms: u64,
    pub collage_columns: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: None,
            book_limit: BOOK_LIMIT,
            images_per_page: IMAGES_PER_PAGE,
            flip_delay_ms: DEFAULT_FLIP_DELAY_MS,
            collage_columns: 4,
        }
    }
}

impl Settings {
    pub fn normalize(&mut self) {
        self.book_limit = self.book_limit.clamp(1, 400);
        self.images_per_page = self.images_per_page.clamp(1, 16);
        self.flip_delay_ms = self.flip_delay_ms.min(5000);
        self.collage_columns = self.collage_columns.clamp(1, 8);
        self.api_url = self
            .api_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string);
    }

    pub fn layout(&self) -> PageLayout {
        PageLayout {
            book_limit: self.book_limit,
            images_per_page: self.images_per_page,
        }
    }

    pub fn flip_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.flip_delay_ms)
    }
}
