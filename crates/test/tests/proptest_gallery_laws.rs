//! Property-based laws for the catalog partition and the viewer controller.
//!
//! 1. Book and collage together are the whole sequence, in order.
//! 2. Page count covers the book exactly.
//! 3. Every rendered tile resolves back to the image drawn on it.
//! 4. Viewer navigation wraps around and is reversible.

use std::time::Instant;

use memorybook_application::{
    Direction, GalleryController, ScrollLock, TilePosition, global_index,
};
use memorybook_core::{Catalog, PageLayout, partition, total_pages};
use memorybook_test::{make_images, make_settings};
use proptest::prelude::*;

fn layout_strategy() -> impl Strategy<Value = PageLayout> {
    (1usize..=60, 1usize..=8).prop_map(|(book_limit, images_per_page)| PageLayout {
        book_limit,
        images_per_page,
    })
}

// ── 1. Partition ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn partition_splits_without_loss(len in 0usize..120, limit in 0usize..80) {
        let images = make_images(len);
        let (book, collage) = partition(&images, limit);
        prop_assert_eq!(book.len(), len.min(limit));
        prop_assert_eq!(book.len() + collage.len(), len);
        let rejoined: Vec<_> = book.iter().chain(collage).cloned().collect();
        prop_assert_eq!(rejoined, images);
    }
}

// ── 2. Page count ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn pages_cover_book_exactly(book_len in 0usize..500, per_page in 1usize..16) {
        let pages = total_pages(book_len, per_page);
        let spread = per_page * 2;
        prop_assert!(pages * spread >= book_len);
        if pages > 0 {
            prop_assert!((pages - 1) * spread < book_len);
        } else {
            prop_assert_eq!(book_len, 0);
        }
    }

    #[test]
    fn spreads_never_pad(len in 0usize..120, layout in layout_strategy()) {
        let catalog = Catalog::new(make_images(len), layout);
        let mut seen = 0;
        for page in 0..catalog.total_pages() {
            let spread = catalog.spread(page);
            prop_assert!(spread.left.len() <= layout.images_per_page);
            prop_assert!(spread.right.len() <= layout.images_per_page);
            prop_assert!(!spread.is_empty());
            seen += spread.left.len() + spread.right.len();
        }
        prop_assert_eq!(seen, catalog.book().len());
        prop_assert!(catalog.spread(catalog.total_pages()).is_empty());
    }
}

// ── 3. Tile round trip ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn tiles_resolve_to_rendered_image(len in 1usize..120, layout in layout_strategy()) {
        let catalog = Catalog::new(make_images(len), layout);
        for page in 0..catalog.total_pages() {
            let spread = catalog.spread(page);
            for (slot, image) in spread.left.iter().enumerate() {
                let index = global_index(page, TilePosition::left(slot), layout.images_per_page);
                prop_assert_eq!(catalog.get(index), Some(image));
            }
            for (slot, image) in spread.right.iter().enumerate() {
                let index = global_index(page, TilePosition::right(slot), layout.images_per_page);
                prop_assert_eq!(catalog.get(index), Some(image));
            }
        }
    }
}

// ── 4. Viewer wraparound ────────────────────────────────────────────────

proptest! {
    #[test]
    fn viewer_navigation_wraps(len in 1usize..60, start in 0usize..60, steps in 0usize..130) {
        let start = start % len;
        let settings = make_settings(40, 4);
        let mut controller =
            GalleryController::new(&settings, ScrollLock::new()).with_images(make_images(len));
        prop_assert!(controller.open_viewer(start));

        for _ in 0..steps {
            controller.navigate_viewer(Direction::Forward);
        }
        prop_assert_eq!(controller.selected_index(), Some((start + steps) % len));

        for _ in 0..steps {
            controller.navigate_viewer(Direction::Backward);
        }
        prop_assert_eq!(controller.selected_index(), Some(start));
    }

    #[test]
    fn flips_never_leave_page_range(len in 0usize..100, presses in proptest::collection::vec(any::<bool>(), 0..40)) {
        let settings = make_settings(40, 4);
        let mut controller =
            GalleryController::new(&settings, ScrollLock::new()).with_images(make_images(len));
        let delay = settings.flip_delay();
        let mut now = Instant::now();
        for forward in presses {
            if forward {
                controller.advance_page(now);
            } else {
                controller.retreat_page(now);
            }
            now += delay * 2;
            controller.tick(now);
            let pages = controller.total_pages();
            prop_assert!(pages == 0 || controller.current_page() < pages);
        }
    }
}
