use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::info;

use crate::gemini::{Completion, GeminiClient};
use crate::response::{fold, interpret, DataPoint, Rendered};
use crate::tui::AppEvent;
use crate::ui;

pub const SERIES_LABEL: &str = "Gemini Data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// One bubble in the chat pane. Never edited or removed once pushed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub text: String,
    pub is_from_user: bool,
}

/// The single line series shown in the chart pane.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub label: &'static str,
    pub points: Vec<DataPoint>,
}

impl ChartSeries {
    /// Points as (x, y) pairs for plotting.
    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        self.points.iter().map(|p| (p.year as f64, p.value)).collect()
    }

    /// ([min_x, max_x], [min_y, max_y]) with a little headroom so lines do
    /// not sit on the frame. Degenerate ranges are widened by one unit.
    pub fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        if self.points.is_empty() {
            return ([0.0, 1.0], [0.0, 1.0]);
        }

        let (mut min_x, mut max_x) = (f64::MAX, f64::MIN);
        let (mut min_y, mut max_y) = (f64::MAX, f64::MIN);
        for (x, y) in self.coordinates() {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }

        if min_x == max_x {
            min_x -= 1.0;
            max_x += 1.0;
        }
        let pad = if min_y == max_y { 1.0 } else { (max_y - min_y) * 0.1 };

        ([min_x, max_x], [min_y - pad, max_y + pad])
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Prompt input
    pub input: String,
    pub input_cursor: usize, // cursor position in chars

    // Chat history
    pub messages: Vec<ChatMessage>,
    pub in_flight: usize,
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of chat pane, set during render
    pub chat_width: u16,  // inner width of chat pane, set during render
    pub follow_tail: bool, // re-pin to the bottom once the next render knows the pane size

    // Chart
    pub chart: Option<ChartSeries>,
    pub show_chart: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    client: GeminiClient,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(client: GeminiClient, events: UnboundedSender<AppEvent>) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            input: String::new(),
            input_cursor: 0,

            messages: Vec::new(),
            in_flight: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_tail: false,

            chart: None,
            show_chart: false,

            animation_frame: 0,

            client,
            events,
        }
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    /// Send the typed prompt. The user's bubble is on screen before the
    /// request is even spawned; blank input does nothing.
    pub fn submit(&mut self) -> Option<JoinHandle<()>> {
        let prompt = self.input.trim().to_string();
        if prompt.is_empty() {
            return None;
        }

        self.add_message(prompt.clone(), true);
        self.input.clear();
        self.input_cursor = 0;
        self.in_flight += 1;
        self.pin_to_bottom();

        Some(self.client.send(prompt, self.events.clone()))
    }

    /// Render one finished request as either a message or a chart.
    pub fn on_completion(&mut self, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);

        let rendered = match completion {
            Ok(body) => interpret(&body),
            Err(err) => fold(err),
        };

        match rendered {
            Rendered::Message(text) => self.add_message(text, false),
            Rendered::Chart(points) => self.show_chart(points),
        }
    }

    pub fn add_message(&mut self, text: String, is_from_user: bool) {
        self.messages.push(ChatMessage { text, is_from_user });
        self.pin_to_bottom();
    }

    /// Replace whatever series was shown and reveal the chart pane.
    pub fn show_chart(&mut self, points: Vec<DataPoint>) {
        info!(points = points.len(), "showing chart");
        self.chart = Some(ChartSeries {
            label: SERIES_LABEL,
            points,
        });
        self.show_chart = true;
        // The chat pane just lost height to the chart
        self.pin_to_bottom();
    }

    pub fn toggle_chart(&mut self) {
        if self.chart.is_some() {
            self.show_chart = !self.show_chart;
            self.pin_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Input editing
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
        self.input.insert(byte_pos, c);
        self.input_cursor += 1;
    }

    pub fn delete_before_cursor(&mut self) {
        if self.input_cursor > 0 {
            self.input_cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete_at_cursor(&mut self) {
        if self.input_cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.input_cursor = (self.input_cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.input.chars().count();
    }

    // Chat scrolling
    pub fn scroll_down(&mut self) {
        if self.chat_scroll < self.max_scroll() {
            self.chat_scroll = self.chat_scroll.saturating_add(1);
        }
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_half_page_down(&mut self) {
        let half_page = self.visible_height() / 2;
        self.chat_scroll = self.chat_scroll.saturating_add(half_page).min(self.max_scroll());
    }

    pub fn scroll_half_page_up(&mut self) {
        let half_page = self.visible_height() / 2;
        self.chat_scroll = self.chat_scroll.saturating_sub(half_page);
    }

    /// Scroll so the newest entry (or the thinking indicator) is visible.
    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
    }

    /// Scroll to the bottom now and again after the next layout pass.
    pub fn pin_to_bottom(&mut self) {
        self.scroll_to_bottom();
        self.follow_tail = true;
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 { self.chat_height } else { 20 }
    }

    fn max_scroll(&self) -> u16 {
        self.total_chat_lines().saturating_sub(self.visible_height())
    }

    /// Rendered line count of the chat pane, wrapped the way the pane draws it.
    fn total_chat_lines(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 { self.chat_width } else { 50 };
        ui::chat_line_count(self, wrap_width).min(u16::MAX as usize) as u16
    }
}
