use crate::input::Focus;
use crate::scroll::ScrollManager;
use crate::state::{PollStatus, ViewerState};
use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

pub fn render(state: &ViewerState, scroll: &ScrollManager) -> Paragraph<'static> {
    let mut spans = vec![];

    match &state.status {
        PollStatus::Waiting => spans.push(Span::raw("connecting…")),
        PollStatus::Ok { at } => spans.push(Span::styled(
            format!("updated {}", at.format("%H:%M:%S")),
            Style::default().fg(Color::Green),
        )),
        PollStatus::Failed { at, error } => spans.push(Span::styled(
            format!("read failed at {}: {error}", at.format("%H:%M:%S")),
            Style::default().fg(Color::Red),
        )),
    }

    if let Some(feed) = &state.feed
        && feed.malformed() > 0
    {
        spans.push(Span::styled(
            format!(" | {} unreadable", feed.malformed()),
            Style::default().fg(Color::Yellow),
        ));
    }

    if !scroll.is_following() {
        spans.push(Span::styled(
            format!(" [SCROLL -{}]", scroll.offset()),
            Style::default().fg(Color::Cyan),
        ));
    }

    let focus = match state.focus {
        Focus::Sidebar => "list",
        Focus::Transcript => "transcript",
    };
    spans.push(Span::raw(format!(" | focus: {focus} | ? help  q quit")));

    Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn render_to_string(state: &ViewerState, scroll: &ScrollManager) -> String {
        let backend = TestBackend::new(120, 3);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| f.render_widget(render(state, scroll), f.area()))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn footer_shows_read_failure() {
        let mut state = ViewerState::new();
        state.status = PollStatus::Failed {
            at: Local::now(),
            error: "store unreachable: refused".to_string(),
        };
        let text = render_to_string(&state, &ScrollManager::new());
        assert!(text.contains("read failed"), "got: {}", text);
        assert!(text.contains("refused"), "got: {}", text);
    }

    #[test]
    fn footer_shows_scroll_indicator() {
        let state = ViewerState::new();
        let mut scroll = ScrollManager::new();
        scroll.update_dimensions(100, 10);
        scroll.scroll_up(4);
        let text = render_to_string(&state, &scroll);
        assert!(text.contains("[SCROLL -4]"), "got: {}", text);
    }
}
