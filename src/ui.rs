use ratatui::{
    layout::{Alignment, Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode};
use crate::chat::{Role, StepStatus, Steps};

/// Parse a line of answer text and convert **bold** markdown to styled
/// spans. Full markdown rendering is an external concern; this covers the
/// common case so streamed answers stay readable.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let segments: Vec<&str> = text.split("**").collect();
    if segments.len() == 1 {
        return Line::from(text.to_string());
    }

    // Segments alternate plain/bold; an odd segment count means every **
    // pair was closed.
    let closed = segments.len() % 2 == 1;
    let mut spans: Vec<Span<'static>> = Vec::new();
    for (i, segment) in segments.iter().enumerate() {
        let in_bold = i % 2 == 1;
        let last = i + 1 == segments.len();
        if in_bold && last && !closed {
            // Unclosed ** is literal text
            spans.push(Span::raw(format!("**{segment}")));
        } else if in_bold {
            if !segment.is_empty() {
                spans.push(Span::styled(
                    segment.to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            }
        } else if !segment.is_empty() {
            spans.push(Span::raw(segment.to_string()));
        }
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Display form of a source URL: scheme and leading www. stripped, path cut.
fn source_hostname(url: &str) -> String {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    rest.split('/').next().unwrap_or(rest).to_string()
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

    let chat_area = if app.show_sidebar {
        let [sidebar_area, chat_area] =
            Layout::horizontal([Constraint::Length(32), Constraint::Min(0)]).areas(body_area);
        render_sidebar(app, frame, sidebar_area);
        chat_area
    } else {
        body_area
    };

    app.chat_width = chat_area.width;
    app.chat_height = chat_area.height;

    if app.session.messages.is_empty() {
        render_landing(frame, chat_area);
    } else {
        render_chat(app, frame, chat_area);
    }

    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let account = if app.signed_in() {
        " signed in "
    } else {
        " signed out — chats won't be saved "
    };

    let title = Line::from(vec![
        Span::styled(" QIRO.AI ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(account, Style::default().fg(Color::Gray)),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_landing(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::default(),
        Line::from(Span::styled(
            "Ask Qiro AI",
            Style::default().fg(Color::Cyan).bold(),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Write anything · Help me learn · Boost my productivity",
            Style::default().fg(Color::Gray),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Type a question below and press Enter",
            Style::default().fg(Color::Gray),
        )),
    ];

    let landing = Paragraph::new(Text::from(lines)).alignment(Alignment::Center);
    frame.render_widget(landing, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let lines = chat_lines(app);

    app.total_chat_lines = wrapped_line_count(&lines, area.width);
    let max_scroll = app.total_chat_lines.saturating_sub(area.height);
    if app.chat_scroll > max_scroll {
        app.chat_scroll = max_scroll;
    }

    let chat = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn chat_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in &app.session.messages {
        match msg.role {
            Role::User => lines.push(Line::from(Span::styled(
                "You",
                Style::default().fg(Color::Cyan).bold(),
            ))),
            Role::Assistant => lines.push(Line::from(Span::styled(
                "Qiro",
                Style::default().fg(Color::Magenta).bold(),
            ))),
        }

        if msg.role == Role::Assistant {
            if let Some(steps) = msg.steps.as_ref().filter(|s| s.has_activity()) {
                lines.extend(timeline_lines(steps));
            }
        }

        for content_line in msg.content.lines() {
            lines.push(parse_markdown_line(content_line));
        }

        lines.push(Line::default());
    }

    // Helper when waiting but no timeline events have arrived yet
    let waiting = app.session.loading
        && app
            .session
            .messages
            .last()
            .and_then(|m| m.steps.as_ref())
            .is_some_and(|s| !s.has_activity());
    if waiting {
        let dots = ".".repeat(app.animation_frame as usize + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{dots}"),
            Style::default().fg(Color::Gray).italic(),
        )));
    }

    lines
}

/// The thinking-process timeline: web search, source reading, answer
/// writing, each shown once it has left idle.
fn timeline_lines(steps: &Steps) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if !steps.searching.status.is_idle() {
        lines.push(step_title_line(steps.searching.status, "Searching the web"));
        lines.push(Line::from(Span::styled(
            format!("    🔍 {}", steps.searching.query),
            Style::default().fg(Color::Yellow),
        )));
    }

    if !steps.reading.status.is_idle() {
        lines.push(step_title_line(steps.reading.status, "Reading sources"));
        for url in &steps.reading.urls {
            lines.push(Line::from(Span::styled(
                format!("    • {}", source_hostname(url)),
                Style::default().fg(Color::Blue),
            )));
        }
    }

    if !steps.writing.status.is_idle() {
        lines.push(step_title_line(steps.writing.status, "Writing answer"));
    }

    lines
}

fn step_title_line(status: StepStatus, title: &str) -> Line<'static> {
    let (indicator, style) = match status {
        StepStatus::Active => ("●", Style::default().fg(Color::Yellow)),
        StepStatus::Completed => ("✓", Style::default().fg(Color::Green)),
        StepStatus::Idle => (" ", Style::default().fg(Color::Gray)),
    };
    Line::from(vec![
        Span::styled(format!("  {indicator} "), style),
        Span::styled(title.to_string(), style.add_modifier(Modifier::DIM)),
    ])
}

fn render_sidebar(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Recent Chats ")
        .border_style(Style::default().fg(Color::Cyan));

    if !app.signed_in() {
        let hint = Paragraph::new("Sign in to save your chat history")
            .style(Style::default().fg(Color::Gray))
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(hint, area);
        return;
    }

    if app.chats_loading && app.chats.is_empty() {
        let loading = Paragraph::new("Loading...")
            .style(Style::default().fg(Color::Gray))
            .block(block);
        frame.render_widget(loading, area);
        return;
    }

    let items: Vec<ListItem> = app
        .chats
        .iter()
        .map(|chat| {
            let mut text = Text::from(Line::from(chat.display_title().to_string()));
            if let Some(date) = chat.created_at.as_deref() {
                // ISO timestamp; the date part is enough for the list
                let date: String = date.chars().take(10).collect();
                text.push_line(Line::from(Span::styled(
                    date,
                    Style::default().fg(Color::Gray),
                )));
            }
            ListItem::new(text)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).bold())
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut app.chat_list_state);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let (border_style, title) = match app.input_mode {
        InputMode::Editing if app.session.loading => {
            (Style::default().fg(Color::Yellow), " Ask Qiro AI (answering…) ")
        }
        InputMode::Editing => (Style::default().fg(Color::Yellow), " Ask Qiro AI "),
        InputMode::Normal => (Style::default().fg(Color::Gray), " Ask Qiro AI "),
    };

    let input = Paragraph::new(app.input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title),
    );
    frame.render_widget(input, area);

    if app.input_mode == InputMode::Editing {
        let max_offset = area.width.saturating_sub(2) as usize;
        let cursor_x = area.x + 1 + app.input_cursor.min(max_offset) as u16;
        frame.set_cursor_position(Position::new(cursor_x, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = if app.show_sidebar {
        vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" nav ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" open ", label_style),
            Span::styled(" d ", key_style),
            Span::styled(" delete ", label_style),
            Span::styled(" n ", key_style),
            Span::styled(" new ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" close ", label_style),
        ]
    } else {
        match app.input_mode {
            InputMode::Editing => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" send ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" browse ", label_style),
            ],
            InputMode::Normal => vec![
                Span::styled(" i ", key_style),
                Span::styled(" compose ", label_style),
                Span::styled(" j/k ", key_style),
                Span::styled(" scroll ", label_style),
                Span::styled(" s ", key_style),
                Span::styled(" chats ", label_style),
                Span::styled(" n ", key_style),
                Span::styled(" new ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ],
        }
    };

    let footer = Paragraph::new(Line::from(hints));
    frame.render_widget(footer, area);
}

/// Approximate post-wrap line count, matching the heuristic the scroll
/// logic in app.rs uses.
fn wrapped_line_count(lines: &[Line], width: u16) -> u16 {
    let wrap_width = width.max(1) as usize;
    lines
        .iter()
        .map(|line| {
            let w = line.width();
            if w == 0 {
                1
            } else {
                w / wrap_width + 1
            }
        })
        .sum::<usize>() as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_hostname_strips_scheme_and_path() {
        assert_eq!(source_hostname("https://www.example.com/a/b"), "example.com");
        assert_eq!(source_hostname("http://docs.rs/ratatui"), "docs.rs");
        assert_eq!(source_hostname("example.com"), "example.com");
    }

    #[test]
    fn test_parse_markdown_bold() {
        let line = parse_markdown_line("say **hello** world");
        assert_eq!(line.spans.len(), 3);
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(line.spans[1].content, "hello");
    }

    #[test]
    fn test_parse_markdown_unclosed_bold_is_literal() {
        let line = parse_markdown_line("oops **dangling");
        let rendered: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(rendered, "oops **dangling");
    }

    #[test]
    fn test_parse_markdown_plain_passthrough() {
        let line = parse_markdown_line("no markup here");
        assert_eq!(line.spans.len(), 1);
    }

    #[test]
    fn test_wrapped_line_count() {
        let lines = vec![Line::from("x".repeat(25)), Line::default()];
        // 25 chars at width 10 wraps to 3 lines, plus the empty line
        assert_eq!(wrapped_line_count(&lines, 10), 4);
    }
}
