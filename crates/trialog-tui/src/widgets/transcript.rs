//! Transcript pane.
//!
//! Items are grouped under a role heading whenever the role changes. Tool
//! calls and results are shown as pretty-printed JSON. Lines are wrapped
//! here rather than by the `Paragraph`, so the scroll manager knows the real
//! line count.

use crate::input::Focus;
use crate::scroll::ScrollManager;
use crate::state::TranscriptFeed;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use trialog_core::DisplayItem;
use trialog_proto::Role;

fn role_style(role: Role) -> Style {
    let color = match role {
        Role::User => Color::Cyan,
        Role::Assistant => Color::Magenta,
        Role::Tool => Color::Yellow,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Splits `text` into lines no wider than `width` characters.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    for raw in text.split('\n') {
        let chars: Vec<char> = raw.chars().collect();
        if chars.is_empty() {
            out.push(String::new());
            continue;
        }
        for chunk in chars.chunks(width) {
            out.push(chunk.iter().collect());
        }
    }
    out
}

fn push_wrapped(out: &mut Vec<Line<'static>>, text: &str, width: usize, style: Style) {
    for line in wrap(text, width) {
        out.push(Line::from(Span::styled(line, style)));
    }
}

fn item_heading(item: &DisplayItem) -> Option<String> {
    match item {
        DisplayItem::Message { .. } => None,
        DisplayItem::ToolExchange { seq, name, .. } | DisplayItem::ToolCall { seq, name, .. } => {
            Some(format!("Tool call #{seq}: {name}"))
        }
        DisplayItem::ToolResult { seq, name, .. } => Some(match (seq, name) {
            (Some(seq), Some(name)) => format!("Tool result #{seq}: {name}"),
            (Some(seq), None) => format!("Tool result #{seq}"),
            (None, Some(name)) => format!("Tool result: {name}"),
            (None, None) => "Tool result".to_string(),
        }),
        DisplayItem::Unreadable { index, .. } => Some(format!("Unreadable record #{index}")),
    }
}

/// Builds the full line list for `items` at the given width.
pub fn lines(items: &[DisplayItem], width: usize) -> Vec<Line<'static>> {
    let mut out = Vec::new();
    let mut current_role = None;
    let divider = "─".repeat(width.min(40));

    for item in items {
        let role = item.role();
        if current_role != Some(role) {
            if current_role.is_some() {
                out.push(Line::default());
            }
            out.push(Line::from(Span::styled(
                format!("{}:", role.as_str()),
                role_style(role),
            )));
            current_role = Some(role);
        } else if item.structured().is_some() {
            out.push(Line::from(Span::styled(
                divider.clone(),
                Style::default().fg(Color::DarkGray),
            )));
        }

        if let Some(heading) = item_heading(item) {
            out.push(Line::from(Span::styled(
                heading,
                Style::default().add_modifier(Modifier::BOLD),
            )));
        }

        match item {
            DisplayItem::Message { text, .. } => {
                push_wrapped(&mut out, text, width, Style::default());
            }
            DisplayItem::Unreadable { error, .. } => {
                push_wrapped(&mut out, error, width, Style::default().fg(Color::Red));
            }
            _ => {
                if let Some(value) = item.structured() {
                    let pretty =
                        serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                    push_wrapped(&mut out, &pretty, width, Style::default().fg(Color::Gray));
                }
            }
        }
    }
    out
}

/// Renders the transcript of `feed`, or a placeholder when nothing is
/// selected.
pub fn render(
    frame: &mut Frame,
    area: Rect,
    feed: Option<&TranscriptFeed>,
    scroll: &mut ScrollManager,
    focus: Focus,
) {
    let border = if focus == Focus::Transcript {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let block = Block::default()
        .title(" Transcript ")
        .borders(Borders::ALL)
        .border_style(border);

    let Some(feed) = feed else {
        let placeholder = Paragraph::new("Select a conversation from the sidebar to view messages.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    };

    let inner = block.inner(area);
    let mut body = lines(feed.items(), inner.width as usize);
    if body.is_empty() {
        body.push(Line::from(Span::styled(
            "No messages yet.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    scroll.update_dimensions(body.len(), inner.height as usize);
    let first = scroll.first_visible().min(u16::MAX as usize) as u16;
    let paragraph = Paragraph::new(body).block(block).scroll((first, 0));
    frame.render_widget(paragraph, area);
}
