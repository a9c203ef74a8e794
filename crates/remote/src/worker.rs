use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::Context as _;
use memorybook_core::Image;
use tracing::{info, warn};

use crate::GallerySource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Loaded(Vec<Image>),
    Failed(String),
}

/// Handle to one in-flight listing fetch running on a background thread.
#[derive(Debug)]
pub struct FetchWorker {
    rx: Receiver<FetchOutcome>,
}

impl FetchWorker {
    /// Non-blocking poll. A worker that died without replying reports a failure.
    pub fn try_take(&self) -> Option<FetchOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                Some(FetchOutcome::Failed("fetch worker exited".to_string()))
            }
        }
    }

    pub fn wait(self) -> FetchOutcome {
        self.rx
            .recv()
            .unwrap_or_else(|_| FetchOutcome::Failed("fetch worker exited".to_string()))
    }
}

pub fn spawn_fetch(source: Arc<dyn GallerySource>) -> anyhow::Result<FetchWorker> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("gallery-fetch".to_string())
        .spawn(move || {
            let outcome = match source.fetch_gallery() {
                Ok(images) => {
                    info!(source = %source.describe(), count = images.len(), "gallery loaded");
                    FetchOutcome::Loaded(images)
                }
                Err(err) => {
                    warn!(
                        source = %source.describe(),
                        error = %format!("{err:#}"),
                        "gallery fetch failed"
                    );
                    FetchOutcome::Failed(format!("{err:#}"))
                }
            };
            // The receiver may already be gone if the UI quit first.
            let _ = tx.send(outcome);
        })
        .context("spawn gallery fetch thread")?;
    Ok(FetchWorker { rx })
}
