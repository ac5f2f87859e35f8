use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};
use cryptoguide_core::{ChatMessage, ChatRole, Citation, Metadata};

use crate::app::{App, BackendStatus, InputMode};

const DISCLAIMER: &str = " Answers are AI-generated from protocol documents. Verify before acting. ";

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    // Headings and bullets are common in model output
    let trimmed = text.trim_start();
    if let Some(heading) = trimmed
        .strip_prefix("### ")
        .or_else(|| trimmed.strip_prefix("## "))
        .or_else(|| trimmed.strip_prefix("# "))
    {
        return Line::from(Span::styled(
            heading.to_string(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    }

    let (prefix, body) = match trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
    {
        Some(rest) => {
            let indent = text.len() - trimmed.len();
            (Some(format!("{}• ", " ".repeat(indent))), rest)
        }
        None => (None, text),
    };

    let mut spans: Vec<Span<'static>> = Vec::new();
    if let Some(prefix) = prefix {
        spans.push(Span::styled(prefix, Style::default().fg(Color::DarkGray)));
    }

    let mut chars = body.char_indices().peekable();
    let mut current_text = String::new();

    while let Some((_, c)) = chars.next() {
        if c == '*' && chars.peek().map(|(_, c)| *c) == Some('*') {
            // Consume the second *
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some((_, c)) = chars.next() {
                if c == '*' && chars.peek().map(|(_, c)| *c) == Some('*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(4),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let selection = &app.selection;
    let mode = if selection.compare_mode() {
        format!(
            " {} {} vs {} {} ",
            selection.selected().icon(),
            selection.selected().display_name(),
            selection.compare_protocol().icon(),
            selection.compare_protocol().display_name()
        )
    } else {
        format!(
            " {} {} ",
            selection.selected().icon(),
            selection.selected().display_name()
        )
    };

    let (status_text, status_color) = match app.backend_status {
        BackendStatus::Unknown => ("connecting", Color::Gray),
        BackendStatus::Online => ("online", Color::Green),
        BackendStatus::Degraded => ("degraded", Color::Yellow),
        BackendStatus::Offline => ("offline", Color::Red),
    };

    let title = Line::from(vec![
        Span::styled(" CryptoGuide ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(mode, Style::default().fg(Color::White)),
        Span::styled(
            format!("[{} {}]", app.backend_url, status_text),
            Style::default().fg(status_color),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Black),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = match app.input_mode {
        InputMode::Normal => {
            let mut hints = vec![
                Span::styled(" i ", key_style),
                Span::styled(" ask ", label_style),
                Span::styled(" p ", key_style),
                Span::styled(" protocol ", label_style),
                Span::styled(" c ", key_style),
                Span::styled(
                    if app.selection.compare_mode() { " single " } else { " compare " },
                    label_style,
                ),
            ];
            if app.selection.compare_mode() {
                hints.extend(vec![
                    Span::styled(" v ", key_style),
                    Span::styled(" versus ", label_style),
                ]);
            }
            if app.dispatcher.store().is_empty() {
                hints.extend(vec![
                    Span::styled(" 1-3 ", key_style),
                    Span::styled(" suggestion ", label_style),
                ]);
            } else {
                hints.extend(vec![
                    Span::styled(" j/k ", key_style),
                    Span::styled(" scroll ", label_style),
                    Span::styled(" x ", key_style),
                    Span::styled(
                        if app.show_excerpts { " hide excerpts " } else { " excerpts " },
                        label_style,
                    ),
                ]);
            }
            hints.extend(vec![
                Span::styled(" S ", key_style),
                Span::styled(" save default ", label_style),
                Span::styled(" ^R ", key_style),
                Span::styled(" reload ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]);
            hints
        }
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(if app.is_loading() { " waiting " } else { " send " }, label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
    };

    if let Some(message) = &app.status_message {
        hints.push(Span::styled(
            format!(" {} ", message),
            Style::default().bg(Color::Black).fg(Color::Green),
        ));
    }

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

fn welcome_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            format!("Welcome to CryptoGuide: {}", app.selection.title()),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Ask about DeFi protocol mechanics and get answers cited from official documents.",
            Style::default().fg(Color::DarkGray),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Try one of these (press the number to use it):",
            Style::default().fg(Color::Gray),
        )),
    ];

    for (i, suggestion) in app.suggestions().iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!(" {} ", i + 1), Style::default().fg(Color::Yellow).bold()),
            Span::styled(
                format!("[{}] ", suggestion.category),
                Style::default().fg(Color::Magenta),
            ),
            Span::raw(suggestion.text),
        ]));
    }
    lines
}

fn assistant_label(message: &ChatMessage) -> Line<'static> {
    let mut spans = vec![Span::styled(
        "AI:",
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    )];
    if message.is_comparison {
        let badge = match message.protocols {
            Some([a, b]) => format!(" Comparison: {} vs {} ", a.display_name(), b.display_name()),
            None => " Comparison ".to_string(),
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            badge,
            Style::default().bg(Color::Magenta).fg(Color::White),
        ));
    }
    Line::from(spans)
}

fn source_lines(sources: &[Citation], show_excerpts: bool) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        format!("Sources ({}):", sources.len()),
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    ))];

    for (position, source) in sources.iter().enumerate() {
        let mut spans = vec![Span::styled(
            format!(" [{}] ", source.display_id(position)),
            Style::default().fg(Color::Green),
        )];
        if let Some(protocol) = &source.protocol {
            spans.push(Span::styled(
                format!("{} ", protocol),
                Style::default().fg(Color::Magenta),
            ));
        }
        spans.push(Span::raw(source.document_title().to_string()));
        if let Some(page) = &source.page {
            spans.push(Span::styled(
                format!(" p. {}", page),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(spans));

        if show_excerpts && !source.excerpt.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("     \"{}\"", source.excerpt),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
    }
    lines
}

/// Only shown when the model is known.
fn metadata_line(metadata: &Metadata) -> Option<Line<'static>> {
    let mut parts = vec![format!("Model: {}", metadata.model()?)];
    if let Some(cost) = metadata.formatted_cost() {
        parts.push(format!("Cost: {}", cost));
    }
    Some(Line::from(Span::styled(
        parts.join("  "),
        Style::default().fg(Color::DarkGray),
    )))
}

fn message_lines(message: &ChatMessage, show_excerpts: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match message.role {
        ChatRole::User => {
            lines.push(Line::from(Span::styled(
                "You:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            for line in message.content.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        ChatRole::Assistant if message.is_error => {
            lines.push(assistant_label(message));
            lines.push(Line::from(Span::styled(
                message.content.clone(),
                Style::default().fg(Color::Red),
            )));
            lines.push(Line::from(Span::styled(
                "Press Ctrl+R to reload once the backend is up.",
                Style::default().fg(Color::DarkGray),
            )));
        }
        ChatRole::Assistant => {
            lines.push(assistant_label(message));
            for line in message.content.lines() {
                lines.push(parse_markdown_line(line));
            }
            if !message.sources.is_empty() {
                lines.push(Line::default());
                lines.extend(source_lines(&message.sources, show_excerpts));
            }
            if let Some(line) = metadata_line(&message.metadata) {
                lines.push(line);
            }
        }
    }
    lines.push(Line::default());
    lines
}

/// Rows `paragraph` occupies once word-wrapped to `width` columns.
fn wrapped_height(paragraph: &Paragraph, width: u16) -> u16 {
    paragraph.line_count(width.max(1)).min(u16::MAX as usize) as u16
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} ", app.selection.title()));

    let inner = block.inner(area);
    app.chat_height = inner.height;

    let lines = {
        let conversation = app.dispatcher.store().read();
        if conversation.is_empty() && !conversation.is_loading() {
            welcome_lines(app)
        } else {
            let mut lines: Vec<Line<'static>> = conversation
                .messages()
                .iter()
                .flat_map(|message| message_lines(message, app.show_excerpts))
                .collect();

            if conversation.is_loading() {
                lines.push(Line::from(Span::styled(
                    "AI:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                // Animated ellipsis: cycles through ".", "..", "..."
                let dots = ".".repeat((app.animation_frame as usize) + 1);
                lines.push(Line::from(Span::styled(
                    format!("Thinking{}", dots),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            }
            lines
        }
    };

    let chat = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });

    app.chat_total_lines = wrapped_height(&chat, inner.width);
    if app.follow_bottom {
        app.scroll_chat_to_bottom();
    } else {
        app.chat_scroll = app
            .chat_scroll
            .min(app.chat_total_lines.saturating_sub(app.chat_height));
    }

    let chat = chat.block(block).scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);

    if app.chat_total_lines > app.chat_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("^"))
            .end_symbol(Some("v"));

        let mut scrollbar_state = ScrollbarState::new(
            app.chat_total_lines.saturating_sub(app.chat_height) as usize,
        )
        .position(app.chat_scroll as usize);

        frame.render_stateful_widget(
            scrollbar,
            area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let border_color = if app.input_mode == InputMode::Editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(app.input_title())
        .title_bottom(Line::from(Span::styled(
            DISCLAIMER,
            Style::default().fg(Color::DarkGray),
        )));

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input.cursor();

    // Scroll horizontally to keep the cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if app.input.text().is_empty() {
        let placeholder = if app.is_loading() {
            "Waiting for the answer..."
        } else {
            "Type a question and press Enter"
        };
        Paragraph::new(Span::styled(placeholder, Style::default().fg(Color::DarkGray)))
    } else {
        let visible_text: String = app
            .input
            .text()
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };

    frame.render_widget(input.block(input_block), area);

    // Show cursor when editing
    if app.input_mode == InputMode::Editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{buffer::Buffer, widgets::Widget};

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn bold_markers_become_bold_spans() {
        let line = parse_markdown_line("The **health factor** matters");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "health factor");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn unclosed_bold_is_literal() {
        let line = parse_markdown_line("a **b");
        assert_eq!(plain(&line), "a **b");
    }

    #[test]
    fn headings_and_bullets() {
        assert_eq!(plain(&parse_markdown_line("## Risks")), "Risks");
        assert_eq!(plain(&parse_markdown_line("- oracle risk")), "• oracle risk");
        assert_eq!(plain(&parse_markdown_line("  * nested")), "  • nested");
    }

    fn chat_paragraph(lines: Vec<Line<'static>>) -> Paragraph<'static> {
        Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false })
    }

    /// Index of the last row with any visible text, plus one.
    fn rendered_rows(paragraph: Paragraph, width: u16) -> u16 {
        let area = Rect::new(0, 0, width, 20);
        let mut buffer = Buffer::empty(area);
        paragraph.render(area, &mut buffer);
        buffer
            .content
            .chunks(width as usize)
            .rposition(|row| row.iter().any(|cell| cell.symbol().trim() != ""))
            .map_or(0, |last| last as u16 + 1)
    }

    #[test]
    fn wrapped_height_counts_wrapped_rows() {
        let lines = vec![Line::from("x".repeat(25)), Line::default(), Line::from("short")];
        assert_eq!(wrapped_height(&chat_paragraph(lines), 10), 5);
    }

    #[test]
    fn wrapped_height_matches_word_wrapped_render() {
        let lines = vec![Line::from("aaaa bbbb cccc dddd"), Line::from("LAST")];
        let estimated = wrapped_height(&chat_paragraph(lines.clone()), 8);
        assert_eq!(estimated, rendered_rows(chat_paragraph(lines), 8));
        assert_eq!(estimated, 5);
    }

    #[test]
    fn metadata_row_needs_a_model() {
        let cost_only: Metadata = serde_json::from_str(r#"{"cost_usd": 0.01}"#).unwrap();
        assert!(metadata_line(&cost_only).is_none());

        let free: Metadata =
            serde_json::from_str(r#"{"model_used": "claude-3-haiku", "cost_usd": 0}"#).unwrap();
        assert_eq!(
            plain(&metadata_line(&free).unwrap()),
            "Model: claude-3-haiku"
        );

        let paid: Metadata =
            serde_json::from_str(r#"{"model": "claude-3-haiku", "cost_usd": 0.0021}"#).unwrap();
        assert_eq!(
            plain(&metadata_line(&paid).unwrap()),
            "Model: claude-3-haiku  Cost: $0.0021"
        );
    }

    #[test]
    fn sources_show_page_and_optional_excerpt() {
        let sources: Vec<Citation> = serde_json::from_value(serde_json::json!([
            {"document": "Compound III Docs", "page": 4, "text": "Collateral factor..."},
            {"page": "N/A", "excerpt": ""}
        ]))
        .unwrap();

        let collapsed = source_lines(&sources, false);
        assert_eq!(collapsed.len(), 3);
        assert_eq!(plain(&collapsed[1]), " [1] Compound III Docs p. 4");
        assert_eq!(plain(&collapsed[2]), " [2] Unknown document");

        let expanded = source_lines(&sources, true);
        assert_eq!(expanded.len(), 4);
        assert!(plain(&expanded[2]).contains("Collateral factor..."));
    }

    #[test]
    fn error_message_is_flagged() {
        let lines = message_lines(&ChatMessage::error(), false);
        assert_eq!(lines[1].spans[0].style.fg, Some(Color::Red));
        assert!(plain(&lines[2]).contains("Ctrl+R"));
    }
}
