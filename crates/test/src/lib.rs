//! Test helpers and fixtures.

use memorybook_core::{Image, ImageId, Settings};

/// `n` images in delivery order (oldest first); id and title carry the delivery position.
pub fn make_images(n: usize) -> Vec<Image> {
    (0..n)
        .map(|i| Image {
            id: ImageId(format!("img-{i}")),
            image_url: format!("https://cdn.example/gallery/{i}.jpg"),
            title: Some(format!("Moment {i}")),
            description: (i % 3 == 0).then(|| format!("Taken on day {i}")),
            created_at: Some(format!("2024-01-{:02}T12:00:00Z", i % 28 + 1)),
        })
        .collect()
}

pub fn make_settings(book_limit: usize, images_per_page: usize) -> Settings {
    Settings {
        api_url: Some("https://script.example/macros/exec".to_string()),
        book_limit,
        images_per_page,
        flip_delay_ms: 450,
        collage_columns: 4,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use memorybook_application::{
        FlipPhase, GalleryController, GalleryKey, LoadState, ScrollLock, TilePosition,
    };
    use memorybook_remote::{
        FetchOutcome, GallerySource, ImageLocation, StaticGallery, Url, resolve_image_url,
        spawn_fetch,
    };
    use memorybook_storage::Storage;

    use super::*;

    #[test]
    fn builds_settings() {
        let settings = make_settings(40, 4);
        assert_eq!(settings.layout().spread_size(), 8);
    }

    #[test]
    fn fetched_batch_browses_latest_first() -> anyhow::Result<()> {
        let source: Arc<dyn GallerySource> =
            Arc::new(StaticGallery::new(make_images(50), "fixture"));
        let images = match spawn_fetch(source)?.wait() {
            FetchOutcome::Loaded(images) => images,
            FetchOutcome::Failed(msg) => anyhow::bail!("fetch failed: {msg}"),
        };

        let settings = make_settings(40, 4);
        let lock = ScrollLock::new();
        let controller = GalleryController::new(&settings, lock).with_images(images);
        let view = controller.view();
        assert_eq!(view.total_pages, 5);
        assert_eq!(view.left_page[0].id.as_str(), "img-49");
        assert_eq!(view.right_page[0].id.as_str(), "img-45");
        assert_eq!(view.collage.len(), 10);
        assert_eq!(view.collage[0].id.as_str(), "img-9");
        assert_eq!(*view.load_state, LoadState::Ready);
        Ok(())
    }

    #[test]
    fn relative_gallery_urls_resolve_against_endpoint() -> anyhow::Result<()> {
        let base = Url::parse("https://script.example/macros/exec")?;
        let image = &make_images(1)[0];
        assert_eq!(
            resolve_image_url(Some(&base), None, &image.image_url)?,
            ImageLocation::Remote(Url::parse(&image.image_url)?)
        );
        assert_eq!(
            resolve_image_url(Some(&base), None, "thumbs/0.jpg")?,
            ImageLocation::Remote(Url::parse("https://script.example/macros/thumbs/0.jpg")?)
        );
        Ok(())
    }

    #[test]
    fn full_browse_session() {
        let settings = make_settings(40, 4);
        let lock = ScrollLock::new();
        let mut controller =
            GalleryController::new(&settings, lock.clone()).with_images(make_images(50));
        let delay = settings.flip_delay();
        let t0 = Instant::now();

        // Turn to the second spread.
        assert!(controller.handle_key(GalleryKey::PageDown, t0));
        assert!(!controller.handle_key(GalleryKey::PageDown, t0));
        controller.tick(t0 + delay);
        assert_eq!(controller.current_page(), 1);
        assert_eq!(controller.phase(), FlipPhase::FlippingToNext);
        controller.tick(t0 + delay * 2);
        assert_eq!(controller.phase(), FlipPhase::Idle);

        // Second spread, right half, third tile.
        assert!(controller.open_tile(TilePosition::right(2)));
        assert_eq!(controller.selected_index(), Some(14));
        assert!(lock.is_locked());
        let view = controller.view();
        let selected = view.selected.expect("selected");
        assert_eq!(selected.image.id.as_str(), "img-35");
        assert_eq!(selected.counter(), "15 / 50");

        // Wrap from the last collage image back to the first.
        controller.close_viewer();
        assert!(controller.open_collage(9));
        assert_eq!(controller.selected_index(), Some(49));
        controller.handle_key(GalleryKey::ArrowRight, t0);
        assert_eq!(controller.selected_index(), Some(0));

        controller.handle_key(GalleryKey::Escape, t0);
        assert!(!lock.is_locked());
    }

    #[test]
    fn refetch_shrinking_catalog_clamps_page() {
        let settings = make_settings(40, 4);
        let lock = ScrollLock::new();
        let mut controller =
            GalleryController::new(&settings, lock.clone()).with_images(make_images(40));
        let delay = settings.flip_delay();
        let mut now = Instant::now();
        for _ in 0..3 {
            controller.advance_page(now);
            now += delay * 2;
            controller.tick(now);
        }
        assert_eq!(controller.current_page(), 3);

        assert!(controller.advance_page(now));
        controller.open_viewer(3);
        controller.begin_refetch();
        controller.install_images(make_images(10));
        assert_eq!(controller.current_page(), 1);
        assert_eq!(controller.phase(), FlipPhase::Idle);
        assert!(controller.next_deadline().is_none());
        assert!(!controller.viewer_open());
        assert!(!lock.is_locked());

        // The cancelled turn must never fire.
        assert!(!controller.tick(now + Duration::from_secs(10)));
        assert_eq!(controller.current_page(), 1);
    }

    #[test]
    fn failed_fetch_shows_nothing_then_recovers() {
        let settings = make_settings(40, 4);
        let mut controller = GalleryController::new(&settings, ScrollLock::new());
        controller.fetch_failed("offline");
        assert_eq!(controller.total_pages(), 0);
        assert!(!controller.can_advance());
        assert!(!controller.open_tile(TilePosition::left(0)));

        controller.install_images(make_images(3));
        assert_eq!(controller.total_pages(), 1);
        assert!(controller.open_tile(TilePosition::left(2)));
    }

    #[test]
    fn snapshot_feeds_offline_session() -> anyhow::Result<()> {
        let mut storage = Storage::open_in_memory()?;
        storage.save_snapshot(&make_images(12), "https://script.example/macros/exec")?;
        let snapshot = storage.load_snapshot()?.expect("snapshot");

        let settings = make_settings(8, 2);
        let controller =
            GalleryController::new(&settings, ScrollLock::new()).with_images(snapshot.images);
        let view = controller.view();
        assert_eq!(view.total_pages, 2);
        assert_eq!(view.left_page[0].id.as_str(), "img-11");
        assert_eq!(view.collage.len(), 4);
        Ok(())
    }

    #[test]
    fn teardown_with_open_viewer_releases_lock() {
        let lock = ScrollLock::new();
        {
            let mut controller = GalleryController::new(&make_settings(40, 4), lock.clone())
                .with_images(make_images(20));
            controller.open_viewer(4);
            assert!(controller.advance_page(Instant::now()));
            assert!(lock.is_locked());
        }
        assert!(!lock.is_locked());
    }
}
