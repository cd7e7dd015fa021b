//! Rendering.
//!
//! Every frame takes fresh snapshots from the controllers, so state written
//! by background tasks shows up on the next tick without any plumbing. The
//! transcript sticks to the newest message unless the user has scrolled up.

use banter_core::{CodingStatus, Message, Sender, TabKind, AVAILABLE_CHAT_MODELS};
use chrono::Local;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::app::{App, InputMode, InputPurpose};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, tabs_area, body_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_tab_bar(app, frame, tabs_area);

    match app.active_tab {
        TabKind::Chat => render_chat_tab(app, frame, body_area),
        TabKind::Image => render_image_tab(app, frame, body_area),
        TabKind::Coding => render_coding_tab(app, frame, body_area),
    }

    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.show_config {
        render_config_popup(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let configured = app.workbench.is_configured();
    let (dot, dot_style) = if configured {
        ("●", Style::default().fg(Color::Green))
    } else {
        ("○", Style::default().fg(Color::Red))
    };

    let mut spans = vec![
        Span::styled(" Banter ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(dot, dot_style),
        Span::styled(
            if configured {
                " configured "
            } else {
                " not configured "
            },
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!(
                " {} · {} ",
                app.workbench.chat_model(),
                app.workbench.image_model()
            ),
            Style::default().fg(Color::Gray),
        ),
    ];

    if let Some(error) = app.workbench.session().last_error() {
        let short: String = error.chars().take(48).collect();
        spans.push(Span::styled(
            format!(" [session: {short}] "),
            Style::default().fg(Color::Red),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_tab_bar(app: &App, frame: &mut Frame, area: Rect) {
    let titles: Vec<Line> = TabKind::ALL
        .iter()
        .map(|tab| Line::from(format!(" {} ", tab.title())))
        .collect();
    let index = TabKind::ALL
        .iter()
        .position(|tab| *tab == app.active_tab)
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(index)
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn render_chat_tab(app: &mut App, frame: &mut Frame, area: Rect) {
    let messages = app.workbench.chat().messages();
    let is_typing = app.workbench.chat().is_typing();
    let is_uploading = app.workbench.chat().is_uploading();
    let title = format!(" Chat · {} ", app.workbench.chat_model());

    let mut lines = transcript_lines(&messages);
    if is_typing {
        push_busy_line(&mut lines, "Assistant is typing", app.animation_frame);
    } else if is_uploading {
        push_busy_line(&mut lines, "Uploading file", app.animation_frame);
    }

    render_transcript(app, frame, area, title, lines);
}

fn render_image_tab(app: &mut App, frame: &mut Frame, area: Rect) {
    let [transcript_area, panel_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(28)]).areas(area);

    let messages = app.workbench.image().messages();
    let is_generating = app.workbench.image().is_generating();
    let is_uploading = app.workbench.image().is_uploading();
    let options = app.workbench.image().options();
    let image_model = app.workbench.image_model();

    let mut lines = transcript_lines(&messages);
    if is_generating {
        push_busy_line(&mut lines, "Generating image", app.animation_frame);
    } else if is_uploading {
        push_busy_line(&mut lines, "Uploading image", app.animation_frame);
    }

    render_transcript(app, frame, transcript_area, " Images ".to_string(), lines);

    let label = Style::default().fg(Color::Gray);
    let hint = Style::default().fg(Color::DarkGray);
    let panel_lines = vec![
        Line::from(vec![
            Span::styled("Model    ", label),
            Span::raw(image_model),
        ]),
        Line::from(vec![
            Span::styled("Size     ", label),
            Span::raw(options.size.as_str()),
            Span::styled("  (s)", hint),
        ]),
        Line::from(vec![
            Span::styled("Quality  ", label),
            Span::raw(options.quality.as_str()),
            Span::styled("  (h)", hint),
        ]),
        Line::from(vec![
            Span::styled("Style    ", label),
            Span::raw(options.style.as_str()),
            Span::styled("  (v)", hint),
        ]),
    ];

    let panel = Paragraph::new(Text::from(panel_lines)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Options "),
    );
    frame.render_widget(panel, panel_area);
}

fn render_coding_tab(app: &mut App, frame: &mut Frame, area: Rect) {
    let [panel_area, transcript_area] =
        Layout::horizontal([Constraint::Length(34), Constraint::Min(0)]).areas(area);

    let coding = app.workbench.coding();
    let status = coding.status();
    let messages = coding.messages();
    let is_loading = coding.is_loading();

    let mut lines = transcript_lines(&messages);
    let busy_label = match status {
        CodingStatus::Authenticating => Some("Authenticating"),
        CodingStatus::FetchingRepositories => Some("Fetching repositories"),
        CodingStatus::Connecting => Some("Connecting to repository"),
        _ if is_loading => Some("Coding buddy is thinking"),
        _ => None,
    };
    if let Some(label) = busy_label {
        push_busy_line(&mut lines, label, app.animation_frame);
    }

    render_transcript(
        app,
        frame,
        transcript_area,
        " Coding Buddy ".to_string(),
        lines,
    );

    match status {
        CodingStatus::Connected => render_file_panel(app, frame, panel_area),
        CodingStatus::RepositoryListReady | CodingStatus::Connecting | CodingStatus::Error => {
            render_repository_panel(app, frame, panel_area, status)
        }
        _ => render_auth_panel(app, frame, panel_area, status),
    }
}

fn render_auth_panel(app: &App, frame: &mut Frame, area: Rect, status: CodingStatus) {
    let auth_error = app.workbench.coding().auth_error();

    let mut lines = vec![
        Line::from("GitHub Personal Access Token"),
        Line::from(Span::styled(
            "Press Enter to type it in.",
            Style::default().fg(Color::Gray),
        )),
    ];
    if status == CodingStatus::Authenticated {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Repository list unavailable.",
            Style::default().fg(Color::Yellow),
        )));
        lines.push(Line::from(Span::styled(
            "Press r to fetch it.",
            Style::default().fg(Color::Gray),
        )));
    }
    if let Some(error) = auth_error {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            error,
            Style::default().fg(Color::Red),
        )));
    }

    let panel = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" GitHub "),
        );
    frame.render_widget(panel, area);
}

fn render_repository_panel(app: &mut App, frame: &mut Frame, area: Rect, status: CodingStatus) {
    let repositories = app.workbench.coding().repositories();

    if !repositories.is_empty() && app.repository_state.selected().is_none() {
        app.repository_state.select(Some(0));
    }

    let title = match status {
        CodingStatus::Error => format!(" Repositories ({}) · retry ", repositories.len()),
        _ => format!(" Repositories ({}) ", repositories.len()),
    };

    let items: Vec<ListItem> = repositories
        .iter()
        .map(|repo| {
            ListItem::new(Line::from(vec![
                Span::raw(repo.full_name.clone()),
                Span::styled(
                    format!(" · {}", repo.language),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(title),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.repository_state);
}

fn render_file_panel(app: &mut App, frame: &mut Frame, area: Rect) {
    let coding = app.workbench.coding();
    let user = coding.user();
    let repository = coding.selected_repository();
    let files = coding.available_files();
    let selected = coding.selected_files();

    if !files.is_empty() && app.file_state.selected().is_none() {
        app.file_state.select(Some(0));
    }

    let [info_area, files_area] =
        Layout::vertical([Constraint::Length(4), Constraint::Min(0)]).areas(area);

    let user_line = match user {
        Some(user) => format!("{} (@{})", user.display_name, user.username),
        None => String::new(),
    };
    let repo_line = repository.map(|r| r.full_name).unwrap_or_default();
    let info = Paragraph::new(Text::from(vec![
        Line::from(user_line),
        Line::from(Span::styled(repo_line, Style::default().fg(Color::Cyan))),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Connected "),
    );
    frame.render_widget(info, info_area);

    let items: Vec<ListItem> = files
        .iter()
        .map(|file| {
            let mark = if selected.contains(file) { "[x] " } else { "[ ] " };
            ListItem::new(format!("{mark}{file}"))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(format!(" Files ({}/{}) ", selected.len(), files.len())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, files_area, &mut app.file_state);
}

fn render_transcript(
    app: &mut App,
    frame: &mut Frame,
    area: Rect,
    title: String,
    lines: Vec<Line<'static>>,
) {
    let inner_height = area.height.saturating_sub(2);
    let inner_width = area.width.saturating_sub(2);
    app.transcript_height = inner_height;
    app.transcript_width = inner_width;

    let total = wrapped_line_count(&lines, inner_width);
    let overflow = total.saturating_sub(inner_height);
    // Clamp so scrolling past the oldest message parks at the top
    let offset = app.scroll_offset.min(overflow);
    app.scroll_offset = offset;
    let scroll = overflow - offset;

    let transcript = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(title),
        )
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(transcript, area);
}

fn transcript_lines(messages: &[Message]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for msg in messages {
        let (label, style) = match msg.sender {
            Sender::User => (
                "You:",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Sender::Assistant => (
                "AI:",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        };
        let stamp = msg.timestamp.with_timezone(&Local).format("%H:%M");
        lines.push(Line::from(vec![
            Span::styled(label, style),
            Span::styled(format!("  {stamp}"), Style::default().fg(Color::DarkGray)),
        ]));

        for line in msg.content.lines() {
            lines.push(Line::from(line.to_string()));
        }
        if let Some(url) = &msg.image_url {
            lines.push(Line::from(Span::styled(
                format!("[image] {url}"),
                Style::default().fg(Color::Magenta),
            )));
        }
        lines.push(Line::default());
    }

    lines
}

fn push_busy_line(lines: &mut Vec<Line<'static>>, label: &str, animation_frame: u8) {
    // Animated ellipsis: cycles through ".", "..", "..."
    let dots = ".".repeat((animation_frame as usize) + 1);
    lines.push(Line::from(Span::styled(
        format!("{label}{dots}"),
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )));
}

fn wrapped_line_count(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    let mut total: u16 = 0;
    for line in lines {
        let chars: usize = line.spans.iter().map(|s| s.content.chars().count()).sum();
        let rows = if chars == 0 { 1 } else { (chars - 1) / width + 1 };
        total = total.saturating_add(rows as u16);
    }
    total
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let title = match (app.active_tab, app.input_purpose) {
        (_, InputPurpose::UploadPath) => " File path (Enter to upload) ",
        (TabKind::Coding, InputPurpose::Token) => " Personal Access Token ",
        (TabKind::Coding, _) => " Ask about the codebase ",
        (TabKind::Image, _) => " Prompt (Enter to generate) ",
        (TabKind::Chat, _) => " Message (Enter to send) ",
    };

    // Mask credentials like a password field
    let masked: String;
    let text: &str = if app.input_purpose == InputPurpose::Token {
        masked = "*".repeat(app.input.chars().count());
        &masked
    } else {
        &app.input
    };

    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };
    let visible_text: String = text.chars().skip(scroll_offset).take(inner_width).collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(title),
        );
    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " EDIT ",
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];

    if let Some(status) = &app.status {
        spans.push(Span::styled(
            status.clone(),
            Style::default().fg(Color::Yellow),
        ));
    } else {
        spans.extend(footer_hints(app));
    }

    let footer = Paragraph::new(Line::from(spans));
    frame.render_widget(footer, area);
}

fn footer_hints(app: &App) -> Vec<Span<'static>> {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().fg(Color::Gray);

    if app.input_mode == InputMode::Editing {
        return vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" submit ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" cancel ", label_style),
        ];
    }

    let mut hints = vec![
        Span::styled(" Tab ", key_style),
        Span::styled(" switch ", label_style),
    ];

    match app.active_tab {
        TabKind::Chat => hints.extend(vec![
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" u ", key_style),
            Span::styled(" upload ", label_style),
            Span::styled(" m ", key_style),
            Span::styled(" model ", label_style),
        ]),
        TabKind::Image => hints.extend(vec![
            Span::styled(" i ", key_style),
            Span::styled(" prompt ", label_style),
            Span::styled(" u ", key_style),
            Span::styled(" upload ", label_style),
            Span::styled(" s/h/v ", key_style),
            Span::styled(" options ", label_style),
            Span::styled(" M ", key_style),
            Span::styled(" model ", label_style),
        ]),
        TabKind::Coding => {
            let status = app.workbench.coding().status();
            match status {
                CodingStatus::Unauthenticated => hints.extend(vec![
                    Span::styled(" Enter ", key_style),
                    Span::styled(" token ", label_style),
                ]),
                CodingStatus::RepositoryListReady | CodingStatus::Error => hints.extend(vec![
                    Span::styled(" j/k ", key_style),
                    Span::styled(" nav ", label_style),
                    Span::styled(" Enter ", key_style),
                    Span::styled(" connect ", label_style),
                    Span::styled(" L ", key_style),
                    Span::styled(" logout ", label_style),
                ]),
                CodingStatus::Connected => hints.extend(vec![
                    Span::styled(" j/k ", key_style),
                    Span::styled(" nav ", label_style),
                    Span::styled(" Space ", key_style),
                    Span::styled(" select ", label_style),
                    Span::styled(" a ", key_style),
                    Span::styled(" analyze ", label_style),
                    Span::styled(" i ", key_style),
                    Span::styled(" ask ", label_style),
                    Span::styled(" x ", key_style),
                    Span::styled(" disconnect ", label_style),
                ]),
                CodingStatus::Authenticated => hints.extend(vec![
                    Span::styled(" r ", key_style),
                    Span::styled(" fetch repos ", label_style),
                ]),
                _ => {}
            }
        }
    }

    hints.extend(vec![
        Span::styled(" c ", key_style),
        Span::styled(" config ", label_style),
        Span::styled(" q ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    hints
}

fn render_config_popup(app: &App, frame: &mut Frame, area: Rect) {
    let popup_width = 56.min(area.width.saturating_sub(4));
    let popup_height = 8.min(area.height.saturating_sub(4));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let saving = app.config_task.is_some();
    let label = Style::default().fg(Color::Gray);

    let key_len = app.api_key_input.chars().count();
    let masked: String = "*".repeat(key_len);
    let key_display = if key_len == 0 {
        Span::styled("sk-...", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(masked, Style::default().fg(Color::Cyan))
    };

    let model = AVAILABLE_CHAT_MODELS[app.config_model_idx.min(AVAILABLE_CHAT_MODELS.len() - 1)];
    let mut lines = vec![
        Line::from(Span::styled("OpenAI API Key", label)),
        Line::from(key_display),
        Line::default(),
        Line::from(vec![
            Span::styled("Chat model   ", label),
            Span::styled("◄ ", Style::default().fg(Color::DarkGray)),
            Span::styled(model, Style::default().fg(Color::Green).bold()),
            Span::styled(" ►", Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(vec![
            Span::styled("Image model  ", label),
            Span::raw(app.workbench.image_model()),
        ]),
    ];
    if saving {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Saving...",
            Style::default().fg(Color::DarkGray).italic(),
        )));
    }

    let popup = Paragraph::new(Text::from(lines)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Configure AI Service (Enter to save, Esc to close) "),
    );
    frame.render_widget(popup, popup_area);

    // Cursor at the end of the key field
    if !saving {
        let inner_width = popup_width.saturating_sub(2) as usize;
        let cursor_x = key_len.min(inner_width.saturating_sub(1)) as u16;
        frame.set_cursor_position((popup_area.x + cursor_x + 1, popup_area.y + 2));
    }
}
