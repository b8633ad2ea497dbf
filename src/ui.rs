use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols,
    text::{Line, Span, Text},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Wrap},
};
use crate::app::{App, ChartSeries, InputMode};

/// Split a line on `**` markers, bolding every closed pair. An unmatched
/// trailing `**` is kept as literal text.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let segments: Vec<&str> = text.split("**").collect();
    let closed = if segments.len() % 2 == 1 { segments.len() } else { segments.len() - 1 };

    let mut spans: Vec<Span<'static>> = Vec::new();
    for (i, segment) in segments[..closed].iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        if i % 2 == 1 {
            spans.push(Span::styled(
                segment.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::raw(segment.to_string()));
        }
    }
    if closed < segments.len() {
        spans.push(Span::raw(format!("**{}", segments[closed])));
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, input, footer
    let [header_area, body_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let visible_chart = if app.show_chart { app.chart.clone() } else { None };
    match visible_chart {
        Some(series) => {
            let [chat_area, chart_area] = Layout::vertical([
                Constraint::Percentage(55),
                Constraint::Percentage(45),
            ])
            .areas(body_area);
            render_chat(app, frame, chat_area);
            render_chart(&series, frame, chart_area);
        }
        None => render_chat(app, frame, body_area),
    }

    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" gemchat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.model().to_string(), Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Chat history as drawn in the pane, before wrapping.
fn chat_text(app: &App) -> Text<'static> {
    if app.messages.is_empty() && !app.is_loading() {
        return Text::from(Span::styled(
            "Ask Gemini anything. Ask for a JSON array of {year, value} to get a chart.",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in &app.messages {
        if msg.is_from_user {
            lines.push(Line::from(Span::styled(
                "You:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            lines.extend(msg.text.lines().map(|l| Line::from(l.to_string())));
        } else {
            lines.push(Line::from(Span::styled(
                "Gemini:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            lines.extend(msg.text.lines().map(parse_markdown_line));
        }
        lines.push(Line::default());
    }

    if app.is_loading() {
        lines.push(Line::from(Span::styled(
            "Gemini:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        let pending = if app.in_flight > 1 {
            format!("Thinking{} ({} requests)", dots, app.in_flight)
        } else {
            format!("Thinking{}", dots)
        };
        lines.push(Line::from(Span::styled(
            pending,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    Text::from(lines)
}

fn chat_paragraph(app: &App) -> Paragraph<'static> {
    Paragraph::new(chat_text(app)).wrap(Wrap { trim: false })
}

/// Rows the chat history takes once word-wrapped to `width` columns.
pub fn chat_line_count(app: &App, width: u16) -> usize {
    chat_paragraph(app).line_count(width)
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Inner size minus borders, used for scroll calculations
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    if app.follow_tail {
        app.scroll_to_bottom();
        app.follow_tail = false;
    }

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.input_mode == InputMode::Normal {
            Color::Cyan
        } else {
            Color::DarkGray
        }))
        .title(" Chat ");

    let chat = chat_paragraph(app)
        .block(chat_block)
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn axis_labels(bounds: [f64; 2], decimals: usize) -> Vec<Span<'static>> {
    let mid = (bounds[0] + bounds[1]) / 2.0;
    [bounds[0], mid, bounds[1]]
        .iter()
        .map(|v| Span::raw(format!("{:.*}", decimals, v)))
        .collect()
}

fn render_chart(series: &ChartSeries, frame: &mut Frame, area: Rect) {
    let data = series.coordinates();
    let (x_bounds, y_bounds) = series.bounds();

    let datasets = vec![Dataset::default()
        .name(series.label)
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Magenta))
        .data(&data)];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Magenta))
                .title(" Year vs Value ")
                .title_alignment(Alignment::Center),
        )
        .x_axis(
            Axis::default()
                .title("Year")
                .style(Style::default().fg(Color::Gray))
                .bounds(x_bounds)
                .labels(axis_labels(x_bounds, 0)),
        )
        .y_axis(
            Axis::default()
                .title("Value")
                .style(Style::default().fg(Color::Gray))
                .bounds(y_bounds)
                .labels(axis_labels(y_bounds, 2)),
        );

    frame.render_widget(chart, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(" Ask ");

    // Horizontal scrolling keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app.input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" INSERT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        InputMode::Normal => {
            let mut hints = vec![
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
                Span::styled(" j/k ", key_style),
                Span::styled(" scroll ", label_style),
            ];
            if app.chart.is_some() {
                hints.extend(vec![
                    Span::styled(" c ", key_style),
                    Span::styled(if app.show_chart { " hide chart " } else { " show chart " }, label_style),
                ]);
            }
            hints.extend(vec![
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]);
            hints
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::{GeminiClient, GeminiConfig};
    use crate::response::DataPoint;
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;

    fn spans(line: &Line) -> Vec<(String, bool)> {
        line.spans
            .iter()
            .map(|s| (s.content.to_string(), s.style.add_modifier.contains(Modifier::BOLD)))
            .collect()
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    fn test_app() -> App {
        let client = GeminiClient::new(GeminiConfig {
            api_key: "k".into(),
            model: "gemini-1.5-flash".into(),
            endpoint: "http://127.0.0.1:9".into(),
        });
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(client, tx)
    }

    #[test]
    fn test_markdown_bold_pairs() {
        let line = parse_markdown_line("a **b** c");
        assert_eq!(
            spans(&line),
            vec![("a ".into(), false), ("b".into(), true), (" c".into(), false)]
        );
    }

    #[test]
    fn test_markdown_unclosed_is_literal() {
        let line = parse_markdown_line("x **y");
        assert_eq!(spans(&line), vec![("x ".into(), false), ("**y".into(), false)]);
    }

    #[test]
    fn test_markdown_plain_line() {
        let line = parse_markdown_line("just text");
        assert_eq!(spans(&line), vec![("just text".into(), false)]);
        assert!(parse_markdown_line("").spans.is_empty());
    }

    #[test]
    fn test_render_chat_messages() {
        let mut app = test_app();
        app.add_message("What is Rust?".into(), true);
        app.add_message("A **systems** language.".into(), false);

        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let screen = screen_text(&terminal);
        assert!(screen.contains("You:"));
        assert!(screen.contains("What is Rust?"));
        assert!(screen.contains("Gemini:"));
        assert!(screen.contains("systems"));
        assert!(!screen.contains("Year vs Value"));
    }

    #[test]
    fn test_render_chart_when_visible() {
        let mut app = test_app();
        app.show_chart(vec![
            DataPoint { year: 2020, value: 1.5 },
            DataPoint { year: 2021, value: 2.5 },
        ]);

        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();
        assert!(screen_text(&terminal).contains("Year vs Value"));

        app.toggle_chart();
        terminal.draw(|f| render(&mut app, f)).unwrap();
        assert!(!screen_text(&terminal).contains("Year vs Value"));
    }

    #[test]
    fn test_word_wrapped_reply_scrolls_fully_into_view() {
        let mut app = test_app();
        let mut terminal = Terminal::new(TestBackend::new(24, 14)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();

        // Alternating 9 and 13 column words never pack two to a 22 column row
        // when a long one is involved, so word wrap needs more rows than the
        // character count suggests.
        let words: Vec<String> = (0..12)
            .map(|i| if i % 2 == 0 { format!("short{i:04}") } else { format!("longerword{i:03}") })
            .chain(["finalword".to_string()])
            .collect();
        app.add_message(words.join(" "), false);
        terminal.draw(|f| render(&mut app, f)).unwrap();

        assert!(screen_text(&terminal).contains("finalword"));
        assert_eq!(app.chat_scroll as usize, chat_line_count(&app, app.chat_width) - app.chat_height as usize);
    }

    #[test]
    fn test_chart_arrival_keeps_latest_message_visible() {
        let mut app = test_app();
        for i in 1..=12 {
            app.add_message(format!("msg {i:02}"), i % 2 == 1);
        }
        let mut terminal = Terminal::new(TestBackend::new(40, 24)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();
        assert!(screen_text(&terminal).contains("msg 12"));

        app.show_chart(vec![
            DataPoint { year: 2020, value: 1.0 },
            DataPoint { year: 2021, value: 2.0 },
        ]);
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let screen = screen_text(&terminal);
        assert!(screen.contains("Year vs Value"));
        assert!(screen.contains("msg 12"));
    }
}
