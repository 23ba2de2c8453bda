//! Conversation list.

use crate::input::Focus;
use crate::state::ViewerState;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

pub fn render(frame: &mut Frame, area: Rect, state: &ViewerState) {
    let border = if state.focus == Focus::Sidebar {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let block = Block::default()
        .title(format!(" Conversations ({}) ", state.conversations.len()))
        .borders(Borders::ALL)
        .border_style(border);

    if state.conversations.is_empty() {
        let empty = Paragraph::new("No active conversations found.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let selected = state.selection.conversation();
    let items: Vec<ListItem> = state
        .conversations
        .entries()
        .iter()
        .map(|entry| {
            let marker = if Some(&entry.conversation) == selected {
                "▶ "
            } else {
                "  "
            };
            let style = if entry.is_complete() {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::raw(marker),
                Span::styled(entry.label(), style),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut list_state = ListState::default().with_selected(Some(state.conversations.cursor()));
    frame.render_stateful_widget(list, area, &mut list_state);
}
