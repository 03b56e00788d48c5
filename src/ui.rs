use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use crate::app::{App, FocusPane, InputMode, RequestKind, ResponseView, Severity, TextInput};
use crate::image::ACCEPTED_EXTENSIONS;

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_inline_markdown(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
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

    Line::from(spans)
}

/// Render one line of model output: headings, rules and bold text.
fn markdown_line(text: &str) -> Line<'static> {
    let trimmed = text.trim_start();

    if trimmed.starts_with('#') {
        let heading = trimmed.trim_start_matches('#').trim().replace("**", "");
        let color = if trimmed.starts_with("####") { Color::Cyan } else { Color::Yellow };
        return Line::from(Span::styled(
            heading,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    }

    if trimmed == "---" {
        return Line::from(Span::styled("─".repeat(24), Style::default().fg(Color::DarkGray)));
    }

    parse_inline_markdown(text)
}

fn thinking_line(app: &App) -> Line<'static> {
    // Animated ellipsis: cycles through ".", "..", "..."
    let dots = ".".repeat((app.animation_frame as usize) + 1);
    Line::from(Span::styled(
        format!("Thinking{}", dots),
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    ))
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, upload_area, body_area, status_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_upload(app, frame, upload_area);

    let [response_area, chat_area] = Layout::horizontal([
        Constraint::Percentage(50),
        Constraint::Percentage(50),
    ])
    .areas(body_area);

    render_response(app, frame, response_area);
    render_chat(app, frame, chat_area);
    render_status(app, frame, status_area);
    render_footer(app, frame, footer_area);

    if app.show_model_picker {
        render_model_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" AutoSage ", Style::default().fg(Color::Cyan).bold()),
        Span::styled("Vehicle Intelligence ", Style::default().fg(Color::White)),
        Span::styled(format!("[{}] ", app.selected_model), Style::default().fg(Color::Gray)),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Draw a single-line input, scrolled horizontally to keep the cursor visible.
fn render_input(
    frame: &mut Frame,
    area: Rect,
    input: &TextInput,
    block: Block,
    placeholder: &str,
    editing: bool,
) {
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = input.cursor;

    // Scroll offset keeps the cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let paragraph = if input.value.is_empty() && !editing {
        Paragraph::new(Span::styled(placeholder.to_string(), Style::default().fg(Color::DarkGray)))
    } else {
        let visible: String = input.value.chars().skip(scroll_offset).take(inner_width).collect();
        Paragraph::new(visible).style(Style::default().fg(Color::Cyan))
    };

    frame.render_widget(paragraph.block(block), area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_upload(app: &App, frame: &mut Frame, area: Rect) {
    let [input_area, info_area] = Layout::horizontal([
        Constraint::Percentage(65),
        Constraint::Percentage(35),
    ])
    .areas(area);

    let editing = app.input_mode == InputMode::EditingPath;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Upload an image of the vehicle ({}) ", ACCEPTED_EXTENSIONS.join(", ")));

    render_input(
        frame,
        input_area,
        &app.path_input,
        block,
        "Press 'u' and type a file path",
        editing,
    );

    let info = match &app.uploaded {
        Some(image) => Line::from(vec![
            Span::styled(image.file_name.clone(), Style::default().fg(Color::Green).bold()),
            Span::styled(
                format!("  {} · {}", image.mime_type, image.display_size()),
                Style::default().fg(Color::Gray),
            ),
        ]),
        None => Line::from(Span::styled("No image", Style::default().fg(Color::DarkGray))),
    };
    let info_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Uploaded Vehicle Image ");
    frame.render_widget(Paragraph::new(info).block(info_block), info_area);
}

fn render_response(app: &mut App, frame: &mut Frame, area: Rect) {
    app.response_area = Some(area);

    let focused = app.focus == FocusPane::Response;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let title = match app.view {
        ResponseView::Raw => " Raw AI Response ",
        ResponseView::Summary => " Summarized Vehicle Overview ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let describing = matches!(app.pending.as_ref().map(|p| &p.kind), Some(RequestKind::Describe));

    let text = if describing {
        Text::from(thinking_line(app))
    } else if let Some(response) = app.response_text() {
        let lines: Vec<Line> = response.lines().map(markdown_line).collect();
        Text::from(lines)
    } else {
        let hint = if app.uploaded.is_some() {
            "Press 't' to tell me about this vehicle."
        } else {
            "Please upload an image to begin."
        };
        Text::from(Span::styled(hint, Style::default().fg(Color::DarkGray)))
    };

    let paragraph = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.response_scroll, 0));

    frame.render_widget(paragraph, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [history_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    app.chat_area = Some(history_area);
    app.chat_height = history_area.height.saturating_sub(2);
    app.chat_width = history_area.width.saturating_sub(2);

    let focused = app.focus == FocusPane::Chat;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Ask More About the Vehicle ");

    let pending_question = match app.pending.as_ref().map(|p| &p.kind) {
        Some(RequestKind::FollowUp { question }) => Some(question.clone()),
        _ => None,
    };

    let user_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let assistant_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);

    let text = if app.session.history().is_empty() && pending_question.is_none() {
        let hint = if app.session.raw_response().is_some() {
            "Press 'a' to ask anything about this vehicle..."
        } else {
            "Chat opens once the vehicle has been described."
        };
        Text::from(Span::styled(hint, Style::default().fg(Color::DarkGray)))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in app.session.history() {
            let style = match msg.role {
                crate::session::ChatRole::User => user_style,
                crate::session::ChatRole::Assistant => assistant_style,
            };
            lines.push(Line::from(Span::styled(format!("{}:", msg.role.label()), style)));
            for line in msg.content.lines() {
                lines.push(markdown_line(line));
            }
            lines.push(Line::default());
        }

        if let Some(question) = pending_question {
            lines.push(Line::from(Span::styled("You:", user_style)));
            lines.push(Line::from(question));
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                format!("{}:", crate::prompt::ASSISTANT_NAME),
                assistant_style,
            )));
            lines.push(thinking_line(app));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, history_area);

    let editing = app.input_mode == InputMode::EditingQuestion;
    let input_color = if editing { Color::Yellow } else { Color::DarkGray };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_color))
        .title(" Ask ");
    render_input(
        frame,
        input_area,
        &app.question_input,
        input_block,
        "Ask anything about this vehicle...",
        editing,
    );
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    let Some(status) = &app.status else { return };

    let (prefix, color) = match status.severity {
        Severity::Info => (" i ", Color::Blue),
        Severity::Warning => (" ! ", Color::Yellow),
        Severity::Error => (" x ", Color::Red),
    };

    let line = Line::from(vec![
        Span::styled(prefix, Style::default().bg(color).fg(Color::Black).bold()),
        Span::styled(format!(" {}", status.text), Style::default().fg(color)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::EditingPath => (" UPLOAD ", Style::default().bg(Color::Yellow).fg(Color::Black)),
        InputMode::EditingQuestion => (" ASK ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hint = |k: &'static str, label: &'static str| {
        [Span::styled(k, key_style), Span::styled(label, label_style)]
    };

    let pairs: Vec<[Span; 2]> = match app.input_mode {
        InputMode::Normal => {
            let mut pairs = vec![hint(" u ", " upload "), hint(" t ", " tell me ")];
            if app.session.raw_response().is_some() {
                pairs.push(match app.view {
                    ResponseView::Raw => hint(" s ", " summarize "),
                    ResponseView::Summary => hint(" r ", " raw "),
                });
                pairs.push(hint(" a ", " ask "));
            }
            pairs.extend([
                hint(" Tab ", " focus "),
                hint(" j/k ", " scroll "),
                hint(" M ", " model "),
                hint(" ^N ", " new "),
                hint(" q ", " quit "),
            ]);
            pairs
        }
        InputMode::EditingPath => vec![hint(" Enter ", " load "), hint(" Esc ", " cancel ")],
        InputMode::EditingQuestion => vec![hint(" Enter ", " send "), hint(" Esc ", " cancel ")],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for [k, label] in pairs {
        spans.push(k);
        spans.push(label);
        spans.push(Span::raw(" "));
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    // Centered popup
    let popup_width = 44.min(area.width.saturating_sub(4));
    let popup_height = (app.available_models.len() as u16 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Model (Enter to select, Esc to cancel) ");

    let items: Vec<ListItem> = app
        .available_models
        .iter()
        .map(|model| {
            let style = if model == &app.selected_model {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", model)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.model_picker_state);
}
