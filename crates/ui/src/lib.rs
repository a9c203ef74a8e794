//! ratatui-based Memory Book UI.

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{event, terminal};
use memorybook_application::{
    FlipPhase, GalleryController, GalleryKey, GalleryView, LoadState, ScrollLock, SelectedImage,
    TilePosition,
};
use memorybook_core::{FrameStyle, Half, Image, Settings, half_page_number, page_indicator};
use memorybook_remote::{FetchOutcome, FetchWorker, GallerySource, ImageFetcher, spawn_fetch};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};
use ratatui_image::Image as ImageWidget;
use ratatui_image::picker::Picker;
use tracing::{debug, info, warn};
use unicode_width::UnicodeWidthStr;

mod image_protocol;
mod layout;
mod photo;

use image_protocol::TerminalHints;
use layout::{Focus, FocusBounds, Move};
use photo::{PhotoCache, PhotoState};

const ACCENT: Color = Color::Yellow;

/// Receives every listing that loads successfully, in delivery order.
pub type SnapshotSink = Box<dyn FnMut(&[Image]) -> anyhow::Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HitTarget {
    Tile(TilePosition),
    Collage(usize),
    PrevPage,
    NextPage,
    ViewerBackdrop,
    ViewerBody,
    ViewerPrev,
    ViewerNext,
    ViewerClose,
}

pub struct Ui {
    controller: GalleryController,
    settings: Settings,
    source: Arc<dyn GallerySource>,
    fetch: Option<FetchWorker>,
    snapshot_sink: Option<SnapshotSink>,
    focus: Focus,
    collage_scroll: usize,
    hits: Vec<(Rect, HitTarget)>,
    photos: PhotoCache,
    image_picker: Picker,
    notice: Option<String>,
}

impl Ui {
    pub fn new(
        mut settings: Settings,
        source: Arc<dyn GallerySource>,
        fetcher: ImageFetcher,
    ) -> anyhow::Result<Self> {
        settings.normalize();
        let controller = GalleryController::new(&settings, ScrollLock::new());
        let photos = PhotoCache::spawn(fetcher)?;
        Ok(Self {
            controller,
            settings,
            source,
            fetch: None,
            snapshot_sink: None,
            focus: Focus::default(),
            collage_scroll: 0,
            hits: Vec::new(),
            photos,
            image_picker: Picker::halfblocks(),
            notice: None,
        })
    }

    pub fn with_snapshot_sink(mut self, sink: SnapshotSink) -> Self {
        self.snapshot_sink = Some(sink);
        self
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        let hints = TerminalHints::from_env();
        let mut session = TerminalSession::enter()?;
        self.image_picker = image_protocol::build_picker(&hints);
        info!(
            protocol = image_protocol::protocol_label(&self.image_picker),
            "terminal session started"
        );
        session.terminal.clear().ok();
        self.start_fetch();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.event_loop(&mut session.terminal)
        }));
        self.controller.teardown();
        let restore_result = session.restore();

        match (result, restore_result) {
            (Ok(Ok(())), Ok(())) => Ok(()),
            (Ok(Ok(_)), Err(err)) => Err(err),
            (Ok(Err(err)), _) => Err(err),
            (Err(panic), Ok(())) => Err(anyhow::anyhow!(panic_to_string(panic))),
            (Err(panic), Err(err)) => Err(anyhow::anyhow!(
                "{}\n(additionally failed to restore terminal: {err})",
                panic_to_string(panic)
            )),
        }
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<()> {
        let tick_rate = Duration::from_millis(250);
        let mut needs_redraw = true;

        loop {
            needs_redraw |= self.controller.tick(Instant::now());
            needs_redraw |= self.poll_fetch();
            needs_redraw |= self.photos.poll();

            if needs_redraw {
                terminal.draw(|frame| self.draw(frame.area(), frame))?;
                needs_redraw = false;
            }

            let timeout = self
                .controller
                .next_deadline()
                .map(|due| due.saturating_duration_since(Instant::now()).min(tick_rate))
                .unwrap_or(tick_rate);
            if !event::poll(timeout)? {
                continue;
            }

            match event::read()? {
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }
                    needs_redraw = true;
                    if self.handle_key(key, Instant::now()) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => {
                    needs_redraw |= self.handle_mouse(mouse, Instant::now());
                }
                _ => {}
            }
        }
    }

    fn start_fetch(&mut self) {
        if self.fetch.is_some() {
            return;
        }
        self.controller.begin_refetch();
        match spawn_fetch(Arc::clone(&self.source)) {
            Ok(worker) => {
                info!(source = %self.source.describe(), "fetching gallery");
                self.fetch = Some(worker);
            }
            Err(err) => {
                let msg = format!("{err:#}");
                self.notice = Some(format!("could not load gallery: {msg}"));
                self.controller.fetch_failed(msg);
            }
        }
    }

    fn poll_fetch(&mut self) -> bool {
        let Some(outcome) = self.fetch.as_ref().and_then(FetchWorker::try_take) else {
            return false;
        };
        self.fetch = None;
        match outcome {
            FetchOutcome::Loaded(images) => {
                self.notice = None;
                if let Some(sink) = self.snapshot_sink.as_mut()
                    && let Err(err) = sink(&images)
                {
                    warn!(error = %format!("{err:#}"), "could not store gallery snapshot");
                    self.notice = Some(format!("snapshot not saved: {err:#}"));
                }
                self.controller.install_images(images);
            }
            FetchOutcome::Failed(msg) => {
                self.notice = Some(format!("could not load gallery: {msg}"));
                self.controller.fetch_failed(msg);
            }
        }
        self.collage_scroll = 0;
        self.normalize_focus();
        true
    }

    fn focus_bounds(&self) -> FocusBounds {
        let view = self.controller.view();
        FocusBounds {
            left_len: view.left_page.len(),
            right_len: view.right_page.len(),
            collage_len: view.collage.len(),
            images_per_page: self.controller.layout().images_per_page,
            collage_columns: self.settings.collage_columns,
        }
    }

    fn normalize_focus(&mut self) {
        let bounds = self.focus_bounds();
        self.focus = layout::normalize_focus(self.focus, &bounds);
    }

    fn move_focus(&mut self, mv: Move) {
        let bounds = self.focus_bounds();
        self.focus = layout::move_focus(self.focus, mv, &bounds);
    }

    fn open_focused(&mut self) -> bool {
        match self.focus {
            Focus::Book(tile) => self.controller.open_tile(tile),
            Focus::Collage(index) => self.controller.open_collage(index),
        }
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        if self.controller.viewer_open() {
            if key.code == KeyCode::Char('q') {
                return true;
            }
            if let Some(gallery_key) = viewer_key(key.code) {
                self.controller.handle_key(gallery_key, now);
            }
            return false;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return true,
            KeyCode::PageUp | KeyCode::Char('p') => {
                self.controller.handle_key(GalleryKey::PageUp, now);
            }
            KeyCode::PageDown | KeyCode::Char('n') => {
                self.controller.handle_key(GalleryKey::PageDown, now);
            }
            KeyCode::Left | KeyCode::Char('h') => self.move_focus(Move::Left),
            KeyCode::Right | KeyCode::Char('l') => self.move_focus(Move::Right),
            KeyCode::Up | KeyCode::Char('k') => self.move_focus(Move::Up),
            KeyCode::Down | KeyCode::Char('j') => self.move_focus(Move::Down),
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.open_focused();
            }
            KeyCode::Char('r') => self.start_fetch(),
            _ => {}
        }
        false
    }

    fn hit_at(&self, column: u16, row: u16) -> Option<HitTarget> {
        let pos = Position::new(column, row);
        self.hits
            .iter()
            .rev()
            .find(|(rect, _)| rect.contains(pos))
            .map(|(_, target)| *target)
    }

    fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) -> bool {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let Some(target) = self.hit_at(mouse.column, mouse.row) else {
                    return false;
                };
                debug!(?target, "click");
                match target {
                    HitTarget::Tile(tile) => {
                        self.focus = Focus::Book(tile);
                        self.controller.open_tile(tile)
                    }
                    HitTarget::Collage(index) => {
                        self.focus = Focus::Collage(index);
                        self.controller.open_collage(index)
                    }
                    HitTarget::PrevPage => self.controller.retreat_page(now),
                    HitTarget::NextPage => self.controller.advance_page(now),
                    HitTarget::ViewerBackdrop | HitTarget::ViewerClose => {
                        self.controller.close_viewer()
                    }
                    HitTarget::ViewerPrev => self
                        .controller
                        .navigate_viewer(memorybook_application::Direction::Backward),
                    HitTarget::ViewerNext => self
                        .controller
                        .navigate_viewer(memorybook_application::Direction::Forward),
                    HitTarget::ViewerBody => false,
                }
            }
            MouseEventKind::ScrollDown | MouseEventKind::ScrollUp => {
                if self.controller.scroll_lock().is_locked() {
                    return false;
                }
                let rows = layout::collage_rows(
                    self.controller.catalog().collage().len(),
                    self.settings.collage_columns,
                )
                .len();
                let before = self.collage_scroll;
                self.collage_scroll = if mouse.kind == MouseEventKind::ScrollDown {
                    (self.collage_scroll + 1).min(rows.saturating_sub(1))
                } else {
                    self.collage_scroll.saturating_sub(1)
                };
                if let Focus::Collage(_) = self.focus {
                    // Keep the cursor from dragging the view back.
                    self.focus = Focus::default();
                    self.normalize_focus();
                }
                before != self.collage_scroll
            }
            _ => false,
        }
    }

    fn draw(&mut self, area: Rect, frame: &mut ratatui::Frame) {
        frame.render_widget(Clear, area);
        self.hits.clear();
        self.normalize_focus();

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(2),
            ])
            .split(area);

        let per_page = self.controller.layout().images_per_page;
        let header = Paragraph::new(Text::from(vec![
            Line::from(Span::styled(
                "Memory Book",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!("{per_page} precious moments on each page"),
                Style::default().add_modifier(Modifier::ITALIC),
            )),
        ]))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(header, layout[0]);

        let view = self.controller.view();
        if self.controller.catalog().is_empty() {
            frame.render_widget(empty_book(view.load_state), layout[1]);
        } else {
            let body = if view.collage.is_empty() {
                Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Min(0),
                        Constraint::Length(1),
                        Constraint::Length(0),
                    ])
                    .split(layout[1])
            } else {
                Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Percentage(60),
                        Constraint::Length(1),
                        Constraint::Min(0),
                    ])
                    .split(layout[1])
            };

            draw_book(frame, body[0], &view, self.focus, per_page, &mut self.hits);
            draw_navigation(frame, body[1], &view, &mut self.hits);
            if !view.collage.is_empty() {
                draw_collage(
                    frame,
                    body[2],
                    &view,
                    self.focus,
                    self.settings.collage_columns,
                    &mut self.collage_scroll,
                    &mut self.hits,
                );
            }
        }

        let footer = Paragraph::new(Text::from(footer_lines(
            &view,
            self.notice.as_deref(),
            self.fetch.is_some(),
        )))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
        frame.render_widget(footer, layout[2]);

        if let Some(selected) = view.selected {
            draw_viewer(
                frame,
                area,
                selected,
                &mut self.photos,
                &self.image_picker,
                &mut self.hits,
            );
        }
    }
}

/// Raw mode, alternate screen and mouse capture, undone on drop.
struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl TerminalSession {
    fn enter() -> anyhow::Result<Self> {
        terminal::enable_raw_mode().context("enable raw mode")?;
        let mut stdout = io::stdout();
        if let Err(err) = crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
            let _ = terminal::disable_raw_mode();
            return Err(err).context("enter alt screen");
        }
        let backend = CrosstermBackend::new(stdout);
        let terminal = match Terminal::new(backend) {
            Ok(terminal) => terminal,
            Err(err) => {
                let _ = crossterm::execute!(
                    io::stdout(),
                    DisableMouseCapture,
                    LeaveAlternateScreen
                );
                let _ = terminal::disable_raw_mode();
                return Err(err).context("create terminal");
            }
        };
        Ok(Self {
            terminal,
            active: true,
        })
    }

    fn restore(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        terminal::disable_raw_mode().context("disable raw mode")?;
        crossterm::execute!(
            self.terminal.backend_mut(),
            DisableMouseCapture,
            LeaveAlternateScreen
        )
        .context("leave alt screen")?;
        self.terminal.show_cursor().ok();
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

fn viewer_key(code: KeyCode) -> Option<GalleryKey> {
    match code {
        KeyCode::Esc => Some(GalleryKey::Escape),
        KeyCode::Left | KeyCode::Char('h') => Some(GalleryKey::ArrowLeft),
        KeyCode::Right | KeyCode::Char('l') => Some(GalleryKey::ArrowRight),
        KeyCode::PageUp => Some(GalleryKey::PageUp),
        KeyCode::PageDown => Some(GalleryKey::PageDown),
        _ => None,
    }
}

fn empty_book(state: &LoadState) -> Paragraph<'static> {
    let lines = match state {
        LoadState::Loading => vec![Line::raw(""), Line::raw("Opening the book...")],
        LoadState::Failed(msg) => vec![
            Line::raw(""),
            Line::styled(
                "Could not open the book.",
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Line::raw(msg.clone()),
            Line::raw(""),
            Line::raw("Press r to try again."),
        ],
        LoadState::Ready => vec![Line::raw(""), Line::raw("The book is empty.")],
    };
    Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
}

fn draw_book(
    frame: &mut ratatui::Frame,
    area: Rect,
    view: &GalleryView<'_>,
    focus: Focus,
    per_page: usize,
    hits: &mut Vec<(Rect, HitTarget)>,
) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    for (half, half_area, images) in [
        (Half::Left, halves[0], view.left_page),
        (Half::Right, halves[1], view.right_page),
    ] {
        let flipping = matches!(
            (half, view.phase),
            (Half::Left, FlipPhase::FlippingToPrev) | (Half::Right, FlipPhase::FlippingToNext)
        );
        let mut title = format!(
            " Page {}  ✧ ✦ ✧ ",
            half_page_number(view.current_page, half)
        );
        if flipping {
            title.push_str("↻ ");
        }
        let border_style = if flipping {
            Style::default().fg(ACCENT).add_modifier(Modifier::DIM)
        } else {
            Style::default()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title);
        let inner = block.inner(half_area);
        frame.render_widget(block, half_area);

        let rects = layout::half_page_tiles(inner, images.len(), per_page);
        for (slot, (rect, image)) in rects.into_iter().zip(images).enumerate() {
            let tile = TilePosition { half, slot };
            let focused = focus == Focus::Book(tile);
            let style = FrameStyle::for_tile(half, slot);
            draw_tile(frame, rect, image, style, focused, flipping);
            hits.push((rect, HitTarget::Tile(tile)));
        }
    }
}

fn draw_tile(
    frame: &mut ratatui::Frame,
    area: Rect,
    image: &Image,
    style: FrameStyle,
    focused: bool,
    dimmed: bool,
) {
    let border_type = match style {
        FrameStyle::Polaroid => BorderType::Rounded,
        FrameStyle::Vintage => BorderType::Double,
    };
    let mut border_style = Style::default();
    if focused {
        border_style = border_style.fg(ACCENT).add_modifier(Modifier::BOLD);
    }
    if dimmed {
        border_style = border_style.add_modifier(Modifier::DIM);
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style);
    let width = block.inner(area).width as usize;

    let mut lines = Vec::new();
    match image.caption() {
        Some(caption) => lines.push(Line::styled(
            truncate_to_width(caption, width),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        None => lines.push(Line::styled(
            truncate_to_width(image.display_title(), width),
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    }
    lines.push(Line::styled(
        truncate_to_width(url_tail(&image.image_url), width),
        Style::default().fg(Color::DarkGray),
    ));

    let paragraph = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(paragraph, area);
}

fn draw_navigation(
    frame: &mut ratatui::Frame,
    area: Rect,
    view: &GalleryView<'_>,
    hits: &mut Vec<(Rect, HitTarget)>,
) {
    let parts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(0),
            Constraint::Length(5),
        ])
        .split(area);

    let button = |label: &'static str, enabled: bool| {
        let style = if enabled {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Paragraph::new(Line::styled(label, style)).alignment(Alignment::Center)
    };
    frame.render_widget(button("←", view.can_retreat), parts[0]);
    frame.render_widget(button("→", view.can_advance), parts[2]);
    hits.push((parts[0], HitTarget::PrevPage));
    hits.push((parts[2], HitTarget::NextPage));

    let mut indicator = page_indicator(view.current_page, view.total_pages);
    if view.phase != FlipPhase::Idle {
        indicator.push_str("  (turning)");
    }
    frame.render_widget(
        Paragraph::new(Line::raw(indicator)).alignment(Alignment::Center),
        parts[1],
    );
}

fn draw_collage(
    frame: &mut ratatui::Frame,
    area: Rect,
    view: &GalleryView<'_>,
    focus: Focus,
    columns: u16,
    scroll: &mut usize,
    hits: &mut Vec<(Rect, HitTarget)>,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" More Memories ({}) ", view.collage.len()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = layout::collage_rows(view.collage.len(), columns);
    if rows.is_empty() || inner.height == 0 {
        return;
    }
    *scroll = (*scroll).min(rows.len() - 1);

    if let Focus::Collage(index) = focus
        && let Some(focus_row) = layout::collage_row_of(index, columns, view.collage.len())
    {
        if focus_row < *scroll {
            *scroll = focus_row;
        }
        let fits = |from: usize| {
            rows[from..=focus_row]
                .iter()
                .map(|row| layout::collage_row_height(row))
                .sum::<u16>()
                <= inner.height
        };
        while *scroll < focus_row && !fits(*scroll) {
            *scroll += 1;
        }
    }

    let mut y = inner.y;
    for row in &rows[*scroll..] {
        let height = layout::collage_row_height(row);
        if y + height > inner.bottom() {
            break;
        }
        let used: u16 = row.iter().map(|cell| cell.span).sum();
        let mut constraints: Vec<Constraint> = row
            .iter()
            .map(|cell| Constraint::Ratio(u32::from(cell.span), u32::from(columns)))
            .collect();
        if used < columns {
            constraints.push(Constraint::Ratio(
                u32::from(columns - used),
                u32::from(columns),
            ));
        }
        let row_area = Rect::new(inner.x, y, inner.width, height);
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(row_area);
        for (cell, rect) in row.iter().zip(cells.iter()) {
            let Some(image) = view.collage.get(cell.index) else {
                continue;
            };
            let focused = focus == Focus::Collage(cell.index);
            let style = if cell.span > 1 {
                FrameStyle::Vintage
            } else {
                FrameStyle::Polaroid
            };
            draw_tile(frame, *rect, image, style, focused, false);
            hits.push((*rect, HitTarget::Collage(cell.index)));
        }
        y += height;
    }
}

fn draw_viewer(
    frame: &mut ratatui::Frame,
    area: Rect,
    selected: SelectedImage<'_>,
    photos: &mut PhotoCache,
    picker: &Picker,
    hits: &mut Vec<(Rect, HitTarget)>,
) {
    let popup = centered_rect(90, 90, area);
    hits.push((area, HitTarget::ViewerBackdrop));
    hits.push((popup, HitTarget::ViewerBody));
    frame.render_widget(Clear, popup);

    let image = selected.image;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .title(format!(" {} ", selected.counter()))
        .title(Line::from(" × ").alignment(Alignment::Right));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);
    if popup.width >= 4 {
        hits.push((
            Rect::new(popup.right().saturating_sub(4), popup.y, 3, 1),
            HitTarget::ViewerClose,
        ));
    }

    let mut caption = Vec::new();
    if let Some(title) = image.caption() {
        caption.push(Line::styled(
            title.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        if let Some(description) = image.description.as_deref().map(str::trim)
            && !description.is_empty()
        {
            for line in wrap_text(description, inner.width.saturating_sub(2) as usize) {
                caption.push(Line::raw(line));
            }
        }
    }
    let caption_height = (caption.len() as u16).min(inner.height / 3);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(caption_height),
            Constraint::Length(1),
        ])
        .split(inner);
    let photo_area = parts[0];

    let zone_width = photo_area.width / 3;
    hits.push((
        Rect::new(photo_area.x, photo_area.y, zone_width, photo_area.height),
        HitTarget::ViewerPrev,
    ));
    hits.push((
        Rect::new(
            photo_area.right().saturating_sub(zone_width),
            photo_area.y,
            zone_width,
            photo_area.height,
        ),
        HitTarget::ViewerNext,
    ));

    let placeholder = |text: String| {
        Paragraph::new(Text::from(format!("\n{text}")))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
    };
    match photos.state(&image.image_url) {
        PhotoState::Loading => {
            frame.render_widget(placeholder("loading photo...".to_string()), photo_area);
        }
        PhotoState::Failed(err) => {
            frame.render_widget(
                placeholder(format!("{}\n({err})", image.image_url)),
                photo_area,
            );
        }
        PhotoState::Ready(decoded) => {
            match photos.protocol(picker, &image.image_url, &decoded, photo_area) {
                Ok(protocol) => {
                    let proto_area = protocol.area();
                    let draw_width = proto_area.width.min(photo_area.width);
                    let draw_height = proto_area.height.min(photo_area.height);
                    let draw_area = Rect::new(
                        photo_area.x + photo_area.width.saturating_sub(draw_width) / 2,
                        photo_area.y + photo_area.height.saturating_sub(draw_height) / 2,
                        draw_width,
                        draw_height,
                    );
                    frame.render_widget(ImageWidget::new(protocol), draw_area);
                }
                Err(err) => frame.render_widget(placeholder(err), photo_area),
            }
        }
    }

    if caption_height > 0 {
        frame.render_widget(
            Paragraph::new(Text::from(caption)).alignment(Alignment::Center),
            parts[1],
        );
    }
    frame.render_widget(
        Paragraph::new(Line::styled(
            "‹ ←  ·  Esc close  ·  → ›",
            Style::default().fg(Color::DarkGray),
        ))
        .alignment(Alignment::Center),
        parts[2],
    );
}

fn footer_lines(
    view: &GalleryView<'_>,
    notice: Option<&str>,
    fetching: bool,
) -> Vec<Line<'static>> {
    let hints = if view.selected.is_some() {
        "←/→ browse · PgUp/PgDn turn page · Esc close · q quit"
    } else {
        "PgUp/PgDn turn page · arrows move · Enter open · r reload · q quit"
    };
    let mut spans = vec![Span::raw(hints)];
    if fetching {
        spans.push(Span::styled(
            "  · refreshing...",
            Style::default().fg(ACCENT),
        ));
    }
    if let Some(notice) = notice {
        spans.push(Span::styled(
            format!("  · {notice}"),
            Style::default().fg(Color::Red),
        ));
    }
    vec![Line::from(spans)]
}

fn panic_to_string(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: (unknown payload)".to_string()
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Last path segment of an image URL, for tile subtitles.
fn url_tail(url: &str) -> &str {
    let trimmed = url.trim().trim_end_matches('/');
    let without_query = trimmed.split(['?', '#']).next().unwrap_or(trimmed);
    without_query
        .rsplit('/')
        .next()
        .filter(|tail| !tail.is_empty())
        .unwrap_or(trimmed)
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut width = 0usize;
    for ch in text.chars() {
        let mut buf = [0u8; 4];
        let w = UnicodeWidthStr::width(&*ch.encode_utf8(&mut buf));
        if width + w + 1 > max_width {
            break;
        }
        out.push(ch);
        width += w;
    }
    out.push('…');
    out
}

fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;

    for word in text.split_whitespace() {
        let word_width = UnicodeWidthStr::width(word);
        let sep_width = if current.is_empty() { 0 } else { 1 };

        if current_width + sep_width + word_width <= max_width {
            if !current.is_empty() {
                current.push(' ');
                current_width += 1;
            }
            current.push_str(word);
            current_width += word_width;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        current = truncate_to_width(word, max_width);
        current_width = UnicodeWidthStr::width(current.as_str());
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
