//! Splits the latest-first sequence into the paginated book and the collage overflow.

use std::sync::Arc;

use crate::Image;

pub const BOOK_LIMIT: usize = 40;
pub const IMAGES_PER_PAGE: usize = 4;

/// Fixed geometry of the book: how many images it holds and how many fit on one half-page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    pub book_limit: usize,
    pub images_per_page: usize,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            book_limit: BOOK_LIMIT,
            images_per_page: IMAGES_PER_PAGE,
        }
    }
}

impl PageLayout {
    pub fn spread_size(&self) -> usize {
        self.images_per_page * 2
    }
}

/// Returns `(book, collage)`. The book is the first `book_limit` entries.
pub fn partition(images: &[Image], book_limit: usize) -> (&[Image], &[Image]) {
    images.split_at(book_limit.min(images.len()))
}

pub fn total_pages(book_len: usize, images_per_page: usize) -> usize {
    let spread = images_per_page * 2;
    if spread == 0 {
        return 0;
    }
    book_len.div_ceil(spread)
}

/// One visible page spread. Either half may hold fewer than `images_per_page` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spread<'a> {
    pub left: &'a [Image],
    pub right: &'a [Image],
}

impl Spread<'_> {
    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

/// An immutable, latest-first image sequence together with its derived partition.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    images: Arc<[Image]>,
    layout: PageLayout,
}

impl Catalog {
    pub fn new(images: Vec<Image>, layout: PageLayout) -> Self {
        Self {
            images: images.into(),
            layout,
        }
    }

    /// Builds a catalog from the listing's delivery order, which is oldest first.
    pub fn from_fetched(mut fetched: Vec<Image>, layout: PageLayout) -> Self {
        fetched.reverse();
        Self::new(fetched, layout)
    }

    pub fn empty(layout: PageLayout) -> Self {
        Self::new(Vec::new(), layout)
    }

    pub fn layout(&self) -> PageLayout {
        self.layout
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, global_index: usize) -> Option<&Image> {
        self.images.get(global_index)
    }

    pub fn book(&self) -> &[Image] {
        partition(&self.images, self.layout.book_limit).0
    }

    pub fn collage(&self) -> &[Image] {
        partition(&self.images, self.layout.book_limit).1
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.book().len(), self.layout.images_per_page)
    }

    pub fn spread(&self, page: usize) -> Spread<'_> {
        let book = self.book();
        let per_page = self.layout.images_per_page;
        let slice = |start: usize| {
            let start = start.min(book.len());
            let end = start.saturating_add(per_page).min(book.len());
            &book[start..end]
        };
        let start = page.saturating_mul(self.layout.spread_size());
        Spread {
            left: slice(start),
            right: slice(start.saturating_add(per_page)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ImageId;

    fn images(n: usize) -> Vec<Image> {
        (0..n)
            .map(|i| Image {
                id: ImageId(i.to_string()),
                image_url: format!("https://cdn.example/{i}.jpg"),
                title: None,
                description: None,
                created_at: None,
            })
            .collect()
    }

    #[test]
    fn empty_sequence_has_no_pages() {
        let catalog = Catalog::empty(PageLayout::default());
        assert_eq!(catalog.total_pages(), 0);
        assert!(catalog.book().is_empty());
        assert!(catalog.collage().is_empty());
        assert!(catalog.spread(0).is_empty());
    }

    #[test]
    fn overflow_moves_to_collage() {
        let catalog = Catalog::new(images(42), PageLayout::default());
        assert_eq!(catalog.book().len(), 40);
        assert_eq!(catalog.collage().len(), 2);
        assert_eq!(catalog.total_pages(), 5);
        assert_eq!(catalog.collage()[0].id.as_str(), "40");
    }

    #[test]
    fn short_final_spread_is_not_padded() {
        let catalog = Catalog::new(images(3), PageLayout::default());
        assert_eq!(catalog.total_pages(), 1);
        let spread = catalog.spread(0);
        assert_eq!(spread.left.len(), 3);
        assert!(spread.right.is_empty());

        let catalog = Catalog::new(images(14), PageLayout::default());
        let spread = catalog.spread(1);
        assert_eq!(spread.left.len(), 4);
        assert_eq!(spread.right.len(), 2);
        assert_eq!(spread.right[1].id.as_str(), "13");
    }

    #[test]
    fn out_of_range_spread_is_empty() {
        let catalog = Catalog::new(images(8), PageLayout::default());
        assert!(catalog.spread(1).is_empty());
        assert!(catalog.spread(usize::MAX).is_empty());
    }

    #[test]
    fn fetched_order_is_reversed() {
        let catalog = Catalog::from_fetched(images(3), PageLayout::default());
        let ids: Vec<&str> = catalog.images().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "0"]);
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 4), 0);
        assert_eq!(total_pages(1, 4), 1);
        assert_eq!(total_pages(8, 4), 1);
        assert_eq!(total_pages(9, 4), 2);
        assert_eq!(total_pages(9, 0), 0);
    }
}
