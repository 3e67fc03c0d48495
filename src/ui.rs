use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Padding, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tracing::{debug, info};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use url::Url;

use crate::coordinator::{FeedCoordinator, LoadingState};
use crate::feed::{LaneKind, LaneState};
use crate::media::{MediaItem, MediaVariant, VariantKind};

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const PAGE_STEP: isize = 10;

/// What the picker hands back to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Selected(Selection),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub id: String,
    pub title: String,
    pub locator: Url,
    pub kind: VariantKind,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Browse,
    Search,
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= Duration::from_millis(120) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

pub struct Options {
    pub feed: FeedCoordinator,
    pub column_width: u32,
    pub prefetch_rows: usize,
    pub status_message: String,
}

pub struct Model {
    feed: FeedCoordinator,
    column_width: u32,
    prefetch_rows: usize,
    selected: usize,
    list_state: ListState,
    shown_lane: LaneKind,
    input_mode: InputMode,
    search_input: String,
    status_message: String,
    retrying: bool,
    spinner: Spinner,
    needs_redraw: bool,
    outcome: Option<Outcome>,
}

impl Model {
    pub fn new(options: Options) -> Self {
        let Options {
            mut feed,
            column_width,
            prefetch_rows,
            status_message,
        } = options;
        feed.set_target_width(column_width);
        feed.start();

        Self {
            shown_lane: feed.visible_lane(),
            feed,
            column_width,
            prefetch_rows,
            selected: 0,
            list_state: ListState::default(),
            input_mode: InputMode::Browse,
            search_input: String::new(),
            status_message,
            retrying: false,
            spinner: Spinner::new(),
            needs_redraw: true,
            outcome: None,
        }
    }

    pub fn run(&mut self) -> Result<Outcome> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        self.feed.shutdown();

        result?;
        Ok(self.outcome.take().unwrap_or(Outcome::Cancelled))
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.sync_feed() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let mut timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));
            if let Some(deadline) = self.feed.next_deadline() {
                timeout = timeout.min(deadline.saturating_duration_since(Instant::now()));
            }

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key.code) {
                            break;
                        }
                    }
                    Event::Resize(..) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.is_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn is_loading(&self) -> bool {
        self.feed.loading_state() == LoadingState::Loading
    }

    /// Fires due debounces, applies finished fetches and keeps the selection
    /// inside the visible list.
    fn sync_feed(&mut self) -> bool {
        let fired = self.feed.tick();
        let changed = self.feed.poll();

        let lane = self.feed.visible_lane();
        let switched = lane != self.shown_lane;
        if switched {
            self.shown_lane = lane;
            self.selected = 0;
        }
        let len = self.feed.visible_items().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }

        if changed {
            if self.retrying {
                self.retrying = false;
                self.status_message.clear();
            }
            // A short or fully filtered page gives the user nothing to
            // scroll, so keep paging until the list can fill the view.
            let failed = matches!(self.feed.lane(lane).state(), LaneState::Error(_));
            if len <= self.prefetch_rows && !failed {
                self.page_if_near_end();
            }
        }
        fired || changed || switched
    }

    fn handle_key(&mut self, code: KeyCode) -> bool {
        let quit = match self.input_mode {
            InputMode::Search => self.handle_search_key(code),
            InputMode::Browse => self.handle_browse_key(code),
        };
        self.mark_dirty();
        quit
    }

    fn handle_search_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Esc => self.close_search(),
            KeyCode::Enter => self.input_mode = InputMode::Browse,
            KeyCode::Backspace => {
                self.search_input.pop();
                self.feed.on_search_text_changed(&self.search_input);
            }
            KeyCode::Char(ch) => {
                self.search_input.push(ch);
                self.feed.on_search_text_changed(&self.search_input);
            }
            KeyCode::Down => self.move_selection(1),
            KeyCode::Up => self.move_selection(-1),
            _ => {}
        }
        false
    }

    fn handle_browse_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') => {
                self.outcome = Some(Outcome::Cancelled);
                return true;
            }
            KeyCode::Esc => {
                if self.feed.is_search_active() {
                    self.close_search();
                } else {
                    self.outcome = Some(Outcome::Cancelled);
                    return true;
                }
            }
            KeyCode::Char('/') => self.open_search(),
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::PageDown => self.move_selection(PAGE_STEP),
            KeyCode::PageUp => self.move_selection(-PAGE_STEP),
            KeyCode::Char('g') | KeyCode::Home => self.move_selection(isize::MIN / 2),
            KeyCode::Char('G') | KeyCode::End => self.move_selection(isize::MAX / 2),
            KeyCode::Char('r') => {
                if self.feed.retry() {
                    self.retrying = true;
                    self.status_message = "Retrying…".into();
                }
            }
            KeyCode::Enter => return self.choose(),
            _ => {}
        }
        false
    }

    fn open_search(&mut self) {
        self.input_mode = InputMode::Search;
        self.search_input.clear();
        self.status_message.clear();
        self.feed.on_search_activated();
    }

    fn close_search(&mut self) {
        self.input_mode = InputMode::Browse;
        self.search_input.clear();
        self.feed.on_search_deactivated();
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.feed.visible_items().len();
        if len == 0 {
            self.page_if_near_end();
            return;
        }
        let last = (len - 1) as isize;
        self.selected = (self.selected as isize).saturating_add(delta).clamp(0, last) as usize;
        self.page_if_near_end();
    }

    fn page_if_near_end(&mut self) {
        let len = self.feed.visible_items().len();
        let remaining = len.saturating_sub(self.selected + 1);
        if remaining <= self.prefetch_rows && self.feed.on_scrolled_near_end() {
            debug!(remaining, "requested next page");
        }
    }

    fn choose(&mut self) -> bool {
        let width = self.column_width;
        let Some(item) = self.feed.visible_items().get(self.selected) else {
            return false;
        };
        let selection = self.feed.select(item, width).map(|variant| Selection {
            id: item.id().to_string(),
            title: item.display_title().to_string(),
            locator: variant.locator.clone(),
            kind: variant.kind,
            width,
            height: variant.height_for_width(width),
        });

        match selection {
            Some(selection) => {
                info!(id = %selection.id, kind = selection.kind.label(), "gif selected");
                self.outcome = Some(Outcome::Selected(selection));
                true
            }
            None => {
                self.status_message = "No rendition of this GIF fits under the size limit".into();
                false
            }
        }
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let status_line = Paragraph::new(self.header_text()).style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, layout[0]);

        self.draw_search_bar(frame, layout[1]);
        if self.feed.visible_items().is_empty() {
            self.draw_placeholder(frame, layout[2]);
        } else {
            self.draw_items(frame, layout[2]);
        }

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center);
        frame.render_widget(footer, layout[3]);
    }

    fn draw_search_bar(&self, frame: &mut Frame<'_>, area: Rect) {
        let focused = self.input_mode == InputMode::Search;
        let border = if focused {
            COLOR_BORDER_FOCUSED
        } else {
            COLOR_BORDER_IDLE
        };
        let content = if focused || !self.search_input.is_empty() {
            let cursor = if focused { "▏" } else { "" };
            Span::styled(
                format!("{}{}", self.search_input, cursor),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            )
        } else {
            Span::styled(
                "Press / to search GIPHY",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )
        };
        let block = Block::default()
            .title(Span::styled("Search", Style::default().fg(COLOR_ACCENT)))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(COLOR_PANEL_BG))
            .padding(Padding::horizontal(1));
        frame.render_widget(Paragraph::new(Line::from(content)).block(block), area);
    }

    fn draw_items(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default()
            .title(Span::styled(
                lane_title(self.feed.visible_lane()),
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_BORDER_IDLE))
            .style(Style::default().bg(COLOR_PANEL_BG));
        let width = block.inner(area).width as usize;

        let items: Vec<ListItem> = self
            .feed
            .visible_items()
            .iter()
            .map(|item| {
                let variant = self.feed.select(item, self.column_width);
                ListItem::new(row_line(item, variant, self.column_width, width))
            })
            .collect();

        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(COLOR_PANEL_SELECTED_BG)
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        );
        self.list_state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn draw_placeholder(&self, frame: &mut Frame<'_>, area: Rect) {
        let (text, color) = match self.feed.loading_state() {
            LoadingState::Loading => (
                format!("{} Loading GIFs…", self.spinner.frame()),
                COLOR_TEXT_SECONDARY,
            ),
            LoadingState::Error(message) => (
                format!("Couldn't load GIFs: {message}\nPress r to retry."),
                COLOR_ERROR,
            ),
            LoadingState::NoMatches => (
                format!("No GIFs found for \"{}\".", self.feed.query().trim()),
                COLOR_TEXT_SECONDARY,
            ),
            LoadingState::Idle => ("Nothing to show yet.".to_string(), COLOR_TEXT_SECONDARY),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_BORDER_IDLE))
            .style(Style::default().bg(COLOR_PANEL_BG))
            .padding(Padding::uniform(1));
        let paragraph = Paragraph::new(text)
            .style(Style::default().fg(color))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(paragraph, area);
    }

    fn header_text(&self) -> String {
        let count = self.feed.visible_items().len();
        let mut text = match self.feed.visible_lane() {
            LaneKind::Trending => format!("Trending GIFs · {count} loaded"),
            LaneKind::Search => format!(
                "Results for \"{}\" · {count} loaded",
                self.feed.query().trim()
            ),
        };
        if count > 0 && self.is_loading() {
            text = format!("{} {text}", self.spinner.frame());
        }
        if !self.status_message.is_empty() {
            text.push_str(" · ");
            text.push_str(&self.status_message);
        }
        text
    }

    fn footer_text(&self) -> String {
        match self.input_mode {
            InputMode::Search => "Type to search · Enter browse results · Esc back to trending"
                .to_string(),
            InputMode::Browse => {
                let mut parts = vec!["j/k move", "Enter select", "/ search"];
                if matches!(self.feed.loading_state(), LoadingState::Error(_)) {
                    parts.push("r retry");
                }
                parts.push(if self.feed.is_search_active() {
                    "Esc trending"
                } else {
                    "q cancel"
                });
                parts.join(" · ")
            }
        }
    }
}

fn lane_title(lane: LaneKind) -> &'static str {
    match lane {
        LaneKind::Trending => "Trending",
        LaneKind::Search => "Search results",
    }
}

fn row_line(
    item: &MediaItem,
    variant: Option<&MediaVariant>,
    column_width: u32,
    width: usize,
) -> Line<'static> {
    let summary = variant_summary(variant, column_width);
    let summary_width = UnicodeWidthStr::width(summary.as_str());
    let title_width = width.saturating_sub(summary_width + 2).max(1);
    let title = truncate_to_width(item.display_title(), title_width);
    let gap = width
        .saturating_sub(UnicodeWidthStr::width(title.as_str()) + summary_width)
        .max(1);
    Line::from(vec![
        Span::styled(title, Style::default().fg(COLOR_TEXT_PRIMARY)),
        Span::raw(" ".repeat(gap)),
        Span::styled(summary, Style::default().fg(COLOR_TEXT_SECONDARY)),
    ])
}

fn variant_summary(variant: Option<&MediaVariant>, column_width: u32) -> String {
    match variant {
        Some(variant) => format!(
            "{} {}x{} · {}",
            variant.kind.label(),
            column_width,
            variant.height_for_width(column_width),
            format_bytes(variant.byte_size)
        ),
        None => "too large".to_string(),
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes == 0 {
        return "size ?".to_string();
    }
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn truncate_to_width(text: &str, max: usize) -> String {
    if UnicodeWidthStr::width(text) <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}
