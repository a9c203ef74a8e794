//! Tile geometry and keyboard focus for the book spread and the collage.

use memorybook_application::TilePosition;
use memorybook_core::{Half, is_big_collage_tile};
use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Focus {
    Book(TilePosition),
    Collage(usize),
}

impl Default for Focus {
    fn default() -> Self {
        Focus::Book(TilePosition::left(0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Move {
    Left,
    Right,
    Up,
    Down,
}

/// What is on screen: tile counts for the current spread and the collage.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FocusBounds {
    pub left_len: usize,
    pub right_len: usize,
    pub collage_len: usize,
    pub images_per_page: usize,
    pub collage_columns: u16,
}

impl FocusBounds {
    fn half_len(&self, half: Half) -> usize {
        match half {
            Half::Left => self.left_len,
            Half::Right => self.right_len,
        }
    }

    fn cols_per_half(&self) -> usize {
        self.images_per_page.clamp(1, 2)
    }

    fn book_rows(&self) -> usize {
        self.images_per_page.div_ceil(self.cols_per_half())
    }

    fn exists(&self, focus: Focus) -> bool {
        match focus {
            Focus::Book(tile) => tile.slot < self.half_len(tile.half),
            Focus::Collage(index) => index < self.collage_len,
        }
    }

    fn first_book_tile(&self) -> Option<TilePosition> {
        if self.left_len > 0 {
            Some(TilePosition::left(0))
        } else if self.right_len > 0 {
            Some(TilePosition::right(0))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CollageCell {
    pub index: usize,
    pub span: u16,
}

/// Packs collage tiles into rows; big tiles take two columns when there is room.
pub(crate) fn collage_rows(count: usize, columns: u16) -> Vec<Vec<CollageCell>> {
    let columns = columns.max(1);
    let mut rows: Vec<Vec<CollageCell>> = Vec::new();
    let mut row = Vec::new();
    let mut used = 0u16;
    for index in 0..count {
        let span = if is_big_collage_tile(index) && columns >= 2 {
            2
        } else {
            1
        };
        if used + span > columns {
            rows.push(std::mem::take(&mut row));
            used = 0;
        }
        row.push(CollageCell { index, span });
        used += span;
    }
    if !row.is_empty() {
        rows.push(row);
    }
    rows
}

pub(crate) fn collage_row_height(row: &[CollageCell]) -> u16 {
    if row.iter().any(|cell| cell.span > 1) {
        6
    } else {
        4
    }
}

fn collage_coords(rows: &[Vec<CollageCell>], index: usize) -> Option<(usize, u16)> {
    for (r, row) in rows.iter().enumerate() {
        let mut col = 0u16;
        for cell in row {
            if cell.index == index {
                return Some((r, col));
            }
            col += cell.span;
        }
    }
    None
}

fn collage_cell_at(row: &[CollageCell], col: u16) -> Option<usize> {
    let mut start = 0u16;
    for cell in row {
        if col < start + cell.span {
            return Some(cell.index);
        }
        start += cell.span;
    }
    row.last().map(|cell| cell.index)
}

pub(crate) fn collage_row_of(index: usize, columns: u16, count: usize) -> Option<usize> {
    collage_coords(&collage_rows(count, columns), index).map(|(row, _)| row)
}

fn book_coords(tile: TilePosition, bounds: &FocusBounds) -> (usize, usize) {
    let cols = bounds.cols_per_half();
    let base = match tile.half {
        Half::Left => 0,
        Half::Right => cols,
    };
    (base + tile.slot % cols, tile.slot / cols)
}

fn book_tile_at(col: usize, row: usize, bounds: &FocusBounds) -> TilePosition {
    let cols = bounds.cols_per_half();
    let (half, col) = if col < cols {
        (Half::Left, col)
    } else {
        (Half::Right, col - cols)
    };
    TilePosition {
        half,
        slot: row * cols + col,
    }
}

/// Moves the focus one step. Moves onto positions with no tile are ignored.
pub(crate) fn move_focus(focus: Focus, mv: Move, bounds: &FocusBounds) -> Focus {
    let candidate = match focus {
        Focus::Book(tile) => {
            let (col, row) = book_coords(tile, bounds);
            let max_col = bounds.cols_per_half() * 2 - 1;
            match mv {
                Move::Left if col > 0 => Focus::Book(book_tile_at(col - 1, row, bounds)),
                Move::Right if col < max_col => Focus::Book(book_tile_at(col + 1, row, bounds)),
                Move::Up if row > 0 => Focus::Book(book_tile_at(col, row - 1, bounds)),
                Move::Down => {
                    let below = book_tile_at(col, row + 1, bounds);
                    if row + 1 < bounds.book_rows() && bounds.exists(Focus::Book(below)) {
                        Focus::Book(below)
                    } else {
                        Focus::Collage(0)
                    }
                }
                _ => focus,
            }
        }
        Focus::Collage(index) => {
            let rows = collage_rows(bounds.collage_len, bounds.collage_columns);
            let Some((row, col)) = collage_coords(&rows, index) else {
                return normalize_focus(focus, bounds);
            };
            match mv {
                Move::Left if index > 0 => Focus::Collage(index - 1),
                Move::Right => Focus::Collage(index + 1),
                Move::Up if row == 0 => match bounds.first_book_tile() {
                    Some(tile) => Focus::Book(tile),
                    None => focus,
                },
                Move::Up => collage_cell_at(&rows[row - 1], col)
                    .map(Focus::Collage)
                    .unwrap_or(focus),
                Move::Down if row + 1 < rows.len() => collage_cell_at(&rows[row + 1], col)
                    .map(Focus::Collage)
                    .unwrap_or(focus),
                _ => focus,
            }
        }
    };

    if bounds.exists(candidate) {
        candidate
    } else {
        focus
    }
}

/// Pulls a focus that no longer points at a tile (page turned, refetch) back onto one.
pub(crate) fn normalize_focus(focus: Focus, bounds: &FocusBounds) -> Focus {
    if bounds.exists(focus) {
        return focus;
    }
    match focus {
        Focus::Book(tile) => {
            let len = bounds.half_len(tile.half);
            if len > 0 {
                return Focus::Book(TilePosition {
                    half: tile.half,
                    slot: len - 1,
                });
            }
            if let Some(tile) = bounds.first_book_tile() {
                return Focus::Book(tile);
            }
            if bounds.collage_len > 0 {
                return Focus::Collage(0);
            }
            Focus::default()
        }
        Focus::Collage(_) if bounds.collage_len > 0 => Focus::Collage(bounds.collage_len - 1),
        Focus::Collage(_) => bounds
            .first_book_tile()
            .map(Focus::Book)
            .unwrap_or_default(),
    }
}

/// Splits a half-page into `count` tile rects on a grid sized for `images_per_page`.
pub(crate) fn half_page_tiles(area: Rect, count: usize, images_per_page: usize) -> Vec<Rect> {
    let cols = images_per_page.clamp(1, 2);
    let rows = images_per_page.max(1).div_ceil(cols);
    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
        .split(area);

    let mut out = Vec::with_capacity(count);
    for row_area in row_areas.iter() {
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, cols as u32); cols])
            .split(*row_area);
        for cell in cells.iter() {
            if out.len() == count {
                return out;
            }
            out.push(*cell);
        }
    }
    out
}
