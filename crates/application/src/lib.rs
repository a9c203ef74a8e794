//! Application orchestration layer for Memory Book: page flips and the fullscreen viewer.

use std::time::{Duration, Instant};

use memorybook_core::{Catalog, Half, Image, PageLayout, Settings};
use tracing::debug;

mod scroll_lock;
mod timer;

pub use scroll_lock::{ScrollGuard, ScrollLock};
pub use timer::{TimerHandle, Timers};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlipPhase {
    #[default]
    Idle,
    FlippingToNext,
    FlippingToPrev,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

impl Direction {
    pub fn delta(self) -> isize {
        match self {
            Direction::Backward => -1,
            Direction::Forward => 1,
        }
    }
}

/// Keys the gallery reacts to while it is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryKey {
    Escape,
    ArrowLeft,
    ArrowRight,
    PageUp,
    PageDown,
}

/// Position of a rendered book tile within the current spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TilePosition {
    pub half: Half,
    pub slot: usize,
}

impl TilePosition {
    pub fn left(slot: usize) -> Self {
        Self {
            half: Half::Left,
            slot,
        }
    }

    pub fn right(slot: usize) -> Self {
        Self {
            half: Half::Right,
            slot,
        }
    }
}

/// Maps a book tile on `current_page` to its index in the full latest-first sequence.
/// This is the inverse of [`Catalog::spread`].
pub fn global_index(current_page: usize, tile: TilePosition, images_per_page: usize) -> usize {
    let offset = match tile.half {
        Half::Left => 0,
        Half::Right => images_per_page,
    };
    current_page * images_per_page * 2 + offset + tile.slot
}

pub fn collage_global_index(collage_index: usize, book_limit: usize) -> usize {
    book_limit + collage_index
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlipStep {
    Turn(Direction),
    Settle,
}

#[derive(Debug, Clone, Copy)]
pub struct SelectedImage<'a> {
    pub index: usize,
    pub image: &'a Image,
    pub total: usize,
}

impl SelectedImage<'_> {
    pub fn counter(&self) -> String {
        format!("{} / {}", self.index + 1, self.total)
    }
}

/// Read-only snapshot handed to the renderer.
#[derive(Debug, Clone, Copy)]
pub struct GalleryView<'a> {
    pub left_page: &'a [Image],
    pub right_page: &'a [Image],
    pub collage: &'a [Image],
    pub current_page: usize,
    pub total_pages: usize,
    pub phase: FlipPhase,
    pub selected: Option<SelectedImage<'a>>,
    pub load_state: &'a LoadState,
    pub can_retreat: bool,
    pub can_advance: bool,
}

/// Owns the only mutable gallery state: current spread, flip phase and viewer selection.
#[derive(Debug)]
pub struct GalleryController {
    catalog: Catalog,
    load_state: LoadState,
    current_page: usize,
    phase: FlipPhase,
    selected: Option<usize>,
    flip_delay: Duration,
    timers: Timers<FlipStep>,
    /// Turn and settle steps of the flip in progress.
    flip_handles: Vec<TimerHandle>,
    scroll_lock: ScrollLock,
    scroll_guard: Option<ScrollGuard>,
}

impl GalleryController {
    pub fn new(settings: &Settings, scroll_lock: ScrollLock) -> Self {
        Self {
            catalog: Catalog::empty(settings.layout()),
            load_state: LoadState::Loading,
            current_page: 0,
            phase: FlipPhase::Idle,
            selected: None,
            flip_delay: settings.flip_delay(),
            timers: Timers::default(),
            flip_handles: Vec::new(),
            scroll_lock,
            scroll_guard: None,
        }
    }

    pub fn with_images(mut self, fetched: Vec<Image>) -> Self {
        self.install_images(fetched);
        self
    }

    pub fn layout(&self) -> PageLayout {
        self.catalog.layout()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.catalog.total_pages()
    }

    pub fn phase(&self) -> FlipPhase {
        self.phase
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn viewer_open(&self) -> bool {
        self.selected.is_some()
    }

    pub fn scroll_lock(&self) -> &ScrollLock {
        &self.scroll_lock
    }

    /// Installs a freshly fetched batch (oldest first, as delivered).
    pub fn install_images(&mut self, fetched: Vec<Image>) {
        let catalog = Catalog::from_fetched(fetched, self.catalog.layout());
        self.install_catalog(catalog);
    }

    /// Replaces the sequence. Pending flips are dropped, the viewer closes and the
    /// current page is clamped into the new range.
    pub fn install_catalog(&mut self, catalog: Catalog) {
        self.cancel_flip();
        self.close_viewer();
        self.catalog = catalog;
        let last_page = self.catalog.total_pages().saturating_sub(1);
        if self.current_page > last_page {
            debug!(from = self.current_page, to = last_page, "clamping page after refetch");
            self.current_page = last_page;
        }
        self.load_state = LoadState::Ready;
        debug!(
            images = self.catalog.len(),
            pages = self.catalog.total_pages(),
            collage = self.catalog.collage().len(),
            "catalog installed"
        );
    }

    /// Records a failed fetch. Whatever sequence is already installed stays visible.
    pub fn fetch_failed(&mut self, message: impl Into<String>) {
        self.load_state = LoadState::Failed(message.into());
    }

    pub fn begin_refetch(&mut self) {
        self.load_state = LoadState::Loading;
    }

    pub fn can_advance(&self) -> bool {
        self.phase == FlipPhase::Idle && self.current_page + 1 < self.catalog.total_pages()
    }

    pub fn can_retreat(&self) -> bool {
        self.phase == FlipPhase::Idle && self.current_page > 0
    }

    pub fn advance_page(&mut self, now: Instant) -> bool {
        if !self.can_advance() {
            return false;
        }
        self.start_flip(Direction::Forward, now);
        true
    }

    pub fn retreat_page(&mut self, now: Instant) -> bool {
        if !self.can_retreat() {
            return false;
        }
        self.start_flip(Direction::Backward, now);
        true
    }

    fn start_flip(&mut self, direction: Direction, now: Instant) {
        self.phase = match direction {
            Direction::Forward => FlipPhase::FlippingToNext,
            Direction::Backward => FlipPhase::FlippingToPrev,
        };
        let turn_at = now + self.flip_delay;
        let turn = self.timers.schedule(turn_at, FlipStep::Turn(direction));
        let settle = self.timers.schedule(turn_at + self.flip_delay, FlipStep::Settle);
        self.flip_handles = vec![turn, settle];
        debug!(?direction, page = self.current_page, "flip started");
    }

    fn cancel_flip(&mut self) {
        let mut cancelled = 0;
        for handle in self.flip_handles.drain(..) {
            if self.timers.cancel(handle) {
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            debug!(cancelled, "flip timers cancelled");
        }
        self.phase = FlipPhase::Idle;
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Fires every flip step due at `now`. Returns whether anything changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.timers.is_empty() {
            return false;
        }
        let mut changed = false;
        while let Some((handle, step)) = self.timers.pop_due(now) {
            self.flip_handles.retain(|pending| *pending != handle);
            match step {
                FlipStep::Turn(Direction::Forward) => {
                    let last_page = self.catalog.total_pages().saturating_sub(1);
                    self.current_page = (self.current_page + 1).min(last_page);
                }
                FlipStep::Turn(Direction::Backward) => {
                    self.current_page = self.current_page.saturating_sub(1);
                }
                FlipStep::Settle => {
                    self.phase = FlipPhase::Idle;
                }
            }
            debug!(?step, page = self.current_page, "flip step");
            changed = true;
        }
        changed
    }

    pub fn open_viewer(&mut self, global_index: usize) -> bool {
        if global_index >= self.catalog.len() {
            return false;
        }
        self.selected = Some(global_index);
        if self.scroll_guard.is_none() {
            self.scroll_guard = Some(self.scroll_lock.acquire());
        }
        debug!(index = global_index, "viewer opened");
        true
    }

    pub fn close_viewer(&mut self) -> bool {
        // Releases the scroll lock even if the selection was already gone.
        self.scroll_guard = None;
        self.selected.take().is_some()
    }

    pub fn navigate_viewer(&mut self, direction: Direction) -> bool {
        let Some(current) = self.selected else {
            return false;
        };
        let len = self.catalog.len();
        if len == 0 {
            return false;
        }
        let next = (current as isize + direction.delta()).rem_euclid(len as isize) as usize;
        self.selected = Some(next);
        true
    }

    /// Resolves a tile on the current spread to its global index. `None` if no image is
    /// rendered at that position.
    pub fn tile_index(&self, tile: TilePosition) -> Option<usize> {
        let spread = self.catalog.spread(self.current_page);
        let half = match tile.half {
            Half::Left => spread.left,
            Half::Right => spread.right,
        };
        if tile.slot >= half.len() {
            return None;
        }
        Some(global_index(
            self.current_page,
            tile,
            self.catalog.layout().images_per_page,
        ))
    }

    pub fn open_tile(&mut self, tile: TilePosition) -> bool {
        match self.tile_index(tile) {
            Some(index) => self.open_viewer(index),
            None => false,
        }
    }

    pub fn open_collage(&mut self, collage_index: usize) -> bool {
        if collage_index >= self.catalog.collage().len() {
            return false;
        }
        self.open_viewer(collage_global_index(
            collage_index,
            self.catalog.layout().book_limit,
        ))
    }

    pub fn handle_key(&mut self, key: GalleryKey, now: Instant) -> bool {
        match key {
            GalleryKey::Escape if self.viewer_open() => self.close_viewer(),
            GalleryKey::ArrowLeft if self.viewer_open() => {
                self.navigate_viewer(Direction::Backward)
            }
            GalleryKey::ArrowRight if self.viewer_open() => {
                self.navigate_viewer(Direction::Forward)
            }
            GalleryKey::PageUp if self.phase == FlipPhase::Idle => self.retreat_page(now),
            GalleryKey::PageDown if self.phase == FlipPhase::Idle => self.advance_page(now),
            _ => false,
        }
    }

    pub fn view(&self) -> GalleryView<'_> {
        let spread = self.catalog.spread(self.current_page);
        let selected = self.selected.and_then(|index| {
            self.catalog.get(index).map(|image| SelectedImage {
                index,
                image,
                total: self.catalog.len(),
            })
        });
        GalleryView {
            left_page: spread.left,
            right_page: spread.right,
            collage: self.catalog.collage(),
            current_page: self.current_page,
            total_pages: self.catalog.total_pages(),
            phase: self.phase,
            selected,
            load_state: &self.load_state,
            can_retreat: self.can_retreat(),
            can_advance: self.can_advance(),
        }
    }

    /// Cancels pending flip steps and releases the scroll lock.
    pub fn teardown(&mut self) {
        self.cancel_flip();
        self.close_viewer();
    }
}

impl Drop for GalleryController {
    fn drop(&mut self) {
        self.teardown();
    }
}
