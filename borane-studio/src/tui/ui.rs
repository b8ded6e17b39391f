use borane_transcript::{ImageSource, Part, Role};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use super::app::{AppMode, StudioApp, Tab};

pub fn render(frame: &mut Frame, app: &StudioApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(1),    // Messages
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_messages(frame, app, chunks[1]);
    render_input(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    match app.mode {
        AppMode::KeyEntry => render_key_popup(frame, app),
        AppMode::AttachPath => render_attach_popup(frame, app),
        AppMode::Compose => {}
    }
}

fn render_header(frame: &mut Frame, app: &StudioApp, area: Rect) {
    let active = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let inactive = Style::default().fg(Color::DarkGray);
    let (image_style, video_style) = match app.tab {
        Tab::Image => (active, inactive),
        Tab::Video => (inactive, active),
    };

    let mut spans = vec![
        Span::styled("bor studio  ", active),
        Span::styled("[Image]", image_style),
        Span::raw(" "),
        Span::styled("[Video]", video_style),
    ];

    if app.tab == Tab::Video {
        let settings = app.studio.video().settings();
        spans.push(Span::raw(format!(
            "  {} {} {}s",
            settings.resolution, settings.aspect_ratio, settings.duration_seconds
        )));
    }

    let key = match app.masked_key() {
        Some(masked) => format!("  key: {}", masked),
        None => "  no API key".to_string(),
    };
    spans.push(Span::styled(key, inactive));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn part_lines(part: &Part) -> Vec<Line<'static>> {
    let dim = Style::default().fg(Color::DarkGray);
    match part {
        Part::Text(text) => text.lines().map(|l| Line::from(format!("  {}", l))).collect(),
        Part::Image(image) => {
            let label = match (&image.source, &image.alt_text) {
                (_, Some(alt)) => format!("  [Image {}: {}]", image.mime_type, alt),
                (ImageSource::Reference { uri }, None) => {
                    format!("  [Image {}: {}]", image.mime_type, uri)
                }
                (ImageSource::Inline { data }, None) => {
                    format!("  [Image {}, {} bytes base64]", image.mime_type, data.len())
                }
            };
            vec![Line::from(Span::styled(label, dim))]
        }
        Part::Video(video) => {
            let meta = &video.metadata;
            let duration = meta
                .duration_seconds
                .map(|d| format!(" {}s", d))
                .unwrap_or_default();
            vec![
                Line::from(Span::styled(
                    format!("  [Video {}: {}]", video.mime_type, video.handle.path().display()),
                    Style::default().fg(Color::Magenta),
                )),
                Line::from(Span::styled(
                    format!("  {} {}{}", meta.resolution, meta.aspect_ratio, duration),
                    dim,
                )),
            ]
        }
    }
}

fn render_messages(frame: &mut Frame, app: &StudioApp, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    for msg in app.transcript().messages() {
        let style = match msg.role {
            Role::User => Style::default().fg(Color::Green),
            Role::Model => Style::default().fg(Color::Blue),
        };
        let label = match msg.role {
            Role::User => "You",
            Role::Model => "Gemini",
        };
        lines.push(Line::from(Span::styled(
            format!("{}:", label),
            style.add_modifier(Modifier::BOLD),
        )));
        for part in &msg.parts {
            lines.extend(part_lines(part));
        }
        lines.push(Line::from(""));
    }

    let waiting = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::ITALIC);
    match app.tab {
        Tab::Image if app.studio.image().is_loading() => {
            lines.push(Line::from(Span::styled("Generating image...", waiting)));
        }
        Tab::Video => {
            if let Some(status) = app.studio.video().status() {
                lines.push(Line::from(Span::styled(status.to_string(), waiting)));
            }
        }
        _ => {}
    }

    if let Some(error) = app.error() {
        lines.push(Line::from(Span::styled(
            format!("Error: {}", error),
            Style::default().fg(Color::Red),
        )));
    }

    if let Some(ref notice) = app.notice {
        lines.push(Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let title = match app.tab {
        Tab::Image => "Image conversation",
        Tab::Video => "Video conversation",
    };
    let messages_block = Block::default().borders(Borders::ALL).title(title);

    let visible_height = area.height.saturating_sub(2) as usize;
    let total_lines = lines.len();
    let scroll = if total_lines > visible_height {
        (total_lines - visible_height).saturating_sub(app.messages_scroll as usize)
    } else {
        0
    };

    let paragraph = Paragraph::new(Text::from(lines))
        .block(messages_block)
        .wrap(Wrap { trim: false })
        .scroll((scroll as u16, 0));

    frame.render_widget(paragraph, area);
}

fn render_input(frame: &mut Frame, app: &StudioApp, area: Rect) {
    let attached = app.attached_names();
    let title = if attached.is_empty() {
        "Prompt".to_string()
    } else {
        format!("Prompt (attached: {})", attached.join(", "))
    };
    let input_block = Block::default().borders(Borders::ALL).title(title);

    let (display_text, style) = if app.input.is_empty() {
        let hint = match app.tab {
            Tab::Image => "Describe an image...",
            Tab::Video => "Describe a video...",
        };
        (hint.to_string(), Style::default().fg(Color::DarkGray))
    } else {
        (app.input.clone(), Style::default())
    };

    frame.render_widget(Paragraph::new(display_text).style(style).block(input_block), area);

    if app.mode == AppMode::Compose {
        let offset = app.input[..app.cursor_pos].chars().count() as u16;
        frame.set_cursor_position((area.x + 1 + offset, area.y + 1));
    }
}

fn render_status_bar(frame: &mut Frame, app: &StudioApp, area: Rect) {
    let status = match (app.mode, app.tab) {
        (AppMode::Compose, Tab::Image) => {
            "Enter: Send  Tab: Video  F2: API key  F4: Clear  F5: Attach  Ctrl+↑/↓: Scroll  Esc: Quit"
        }
        (AppMode::Compose, Tab::Video) => {
            "Enter: Send  Tab: Image  F2: API key  F4: Clear  F5: Attach  F6/F7/F8: Resolution/Aspect/Duration  Esc: Quit"
        }
        (AppMode::KeyEntry, _) => "Enter: Save (empty clears)  Esc: Cancel",
        (AppMode::AttachPath, _) => "Enter: Attach  Esc: Cancel",
    };

    let status = if app.is_busy() && app.mode == AppMode::Compose {
        format!("Working...  {}", status)
    } else {
        status.to_string()
    };

    frame.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn render_popup(frame: &mut Frame, title: &str, body: String) {
    let offset = body.chars().count() as u16;
    let area = centered_rect(60, 20, frame.area());

    frame.render_widget(Clear, area);

    let paragraph = Paragraph::new(body)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
    frame.set_cursor_position((area.x + 1 + offset, area.y + 1));
}

fn render_key_popup(frame: &mut Frame, app: &StudioApp) {
    let masked = "*".repeat(app.popup_input.chars().count());
    render_popup(frame, "Gemini API key (empty to clear)", masked);
}

fn render_attach_popup(frame: &mut Frame, app: &StudioApp) {
    render_popup(
        frame,
        "Reference image paths (comma separated)",
        app.popup_input.clone(),
    );
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
