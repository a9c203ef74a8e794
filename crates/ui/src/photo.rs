//! Background download and decode of the photo shown in the fullscreen viewer.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use anyhow::Context as _;
use memorybook_remote::ImageFetcher;
use ratatui::layout::Rect;
use ratatui_image::Resize;
use ratatui_image::picker::Picker;
use ratatui_image::protocol::Protocol;
use tracing::{debug, warn};

const MAX_CACHED_PHOTOS: usize = 12;

#[derive(Debug, Clone)]
pub(crate) enum PhotoState {
    Loading,
    Ready(Arc<image::DynamicImage>),
    Failed(String),
}

struct Loaded {
    url: String,
    result: Result<image::DynamicImage, String>,
}

/// Decodes photos on a worker thread and keeps a small LRU of decoded images plus the
/// protocol last built for the viewer area.
pub(crate) struct PhotoCache {
    requests: Option<Sender<String>>,
    replies: Receiver<Loaded>,
    states: HashMap<String, PhotoState>,
    order: VecDeque<String>,
    rendered: Option<RenderedPhoto>,
}

struct RenderedPhoto {
    url: String,
    area: Rect,
    protocol: Protocol,
}

impl PhotoCache {
    pub(crate) fn spawn(fetcher: ImageFetcher) -> anyhow::Result<Self> {
        let (req_tx, req_rx) = mpsc::channel::<String>();
        let (reply_tx, reply_rx) = mpsc::channel::<Loaded>();
        thread::Builder::new()
            .name("photo-loader".to_string())
            .spawn(move || {
                // Ends when the cache (the only sender) is dropped.
                while let Ok(url) = req_rx.recv() {
                    let result = load_photo(&fetcher, &url).map_err(|err| format!("{err:#}"));
                    if reply_tx.send(Loaded { url, result }).is_err() {
                        break;
                    }
                }
            })
            .context("spawn photo loader thread")?;
        Ok(Self {
            requests: Some(req_tx),
            replies: reply_rx,
            states: HashMap::new(),
            order: VecDeque::new(),
            rendered: None,
        })
    }

    /// Drains finished downloads. Returns whether any arrived.
    pub(crate) fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(Loaded { url, result }) = self.replies.try_recv() {
            let state = match result {
                Ok(image) => {
                    debug!(%url, width = image.width(), height = image.height(), "photo decoded");
                    PhotoState::Ready(Arc::new(image))
                }
                Err(err) => {
                    warn!(%url, error = %err, "photo load failed");
                    PhotoState::Failed(err)
                }
            };
            self.insert(url, state);
            changed = true;
        }
        changed
    }

    pub(crate) fn state(&mut self, url: &str) -> PhotoState {
        if let Some(state) = self.states.get(url) {
            return state.clone();
        }
        match &self.requests {
            Some(tx) if tx.send(url.to_string()).is_ok() => {
                self.insert(url.to_string(), PhotoState::Loading);
                PhotoState::Loading
            }
            _ => {
                self.requests = None;
                PhotoState::Failed("photo loader stopped".to_string())
            }
        }
    }

    fn insert(&mut self, url: String, state: PhotoState) {
        self.order.retain(|u| u != &url);
        self.order.push_back(url.clone());
        self.states.insert(url, state);
        while self.order.len() > MAX_CACHED_PHOTOS {
            if let Some(old) = self.order.pop_front() {
                self.states.remove(&old);
            }
        }
    }

    /// Protocol for `url` fitted into `area`, rebuilt only when either changes.
    pub(crate) fn protocol(
        &mut self,
        picker: &Picker,
        url: &str,
        image: &Arc<image::DynamicImage>,
        area: Rect,
    ) -> Result<&Protocol, String> {
        let stale = self
            .rendered
            .as_ref()
            .is_none_or(|r| r.url != url || r.area != area);
        if stale {
            let size = Rect::new(0, 0, area.width, area.height);
            let protocol = picker
                .new_protocol((**image).clone(), size, Resize::Fit(None))
                .map_err(|err| format!("encode photo: {err}"))?;
            self.rendered = Some(RenderedPhoto {
                url: url.to_string(),
                area,
                protocol,
            });
        }
        self.rendered
            .as_ref()
            .map(|r| &r.protocol)
            .ok_or_else(|| "photo not rendered".to_string())
    }
}

fn load_photo(fetcher: &ImageFetcher, url: &str) -> anyhow::Result<image::DynamicImage> {
    let bytes = fetcher.fetch(url)?;
    image::load_from_memory(&bytes).with_context(|| format!("decode {url}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> PhotoCache {
        let fetcher = ImageFetcher::new(None, None).expect("fetcher");
        PhotoCache::spawn(fetcher).expect("cache")
    }

    #[test]
    fn first_request_reports_loading() {
        let mut cache = cache();
        assert!(matches!(cache.state("/nonexistent/a.jpg"), PhotoState::Loading));
        assert!(matches!(cache.state("/nonexistent/a.jpg"), PhotoState::Loading));
    }

    #[test]
    fn missing_file_becomes_failed() {
        let mut cache = cache();
        cache.state("/nonexistent/memorybook.jpg");
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !cache.poll() && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(matches!(
            cache.state("/nonexistent/memorybook.jpg"),
            PhotoState::Failed(_)
        ));
    }

    #[test]
    fn cache_evicts_oldest_entries() {
        let mut cache = cache();
        for i in 0..MAX_CACHED_PHOTOS + 3 {
            cache.insert(format!("{i}.jpg"), PhotoState::Failed("x".to_string()));
        }
        assert_eq!(cache.states.len(), MAX_CACHED_PHOTOS);
        assert!(!cache.states.contains_key("0.jpg"));
        assert!(cache.states.contains_key(&format!("{}.jpg", MAX_CACHED_PHOTOS + 2)));
    }
}
