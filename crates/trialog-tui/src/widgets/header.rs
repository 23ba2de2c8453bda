use crate::state::{Selection, TranscriptFeed, ViewerState};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

/// Title for the selected conversation: `Task <session>` or
/// `Task <session>, Reward: <r>` once the trial has completed.
pub fn title(feed: &TranscriptFeed) -> String {
    let session = &feed.conversation().session;
    match feed.summary {
        Some(summary) => format!("Task {session}, Reward: {}", summary.reward),
        None => format!("Task {session}"),
    }
}

pub fn render(state: &ViewerState) -> Paragraph<'static> {
    let mut spans = vec![];

    match (&state.selection, &state.feed) {
        (Selection::Selected(conv), Some(feed)) => {
            spans.push(Span::styled(
                title(feed),
                Style::default().add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::raw(format!(" | task {}", conv.task)));
            spans.push(Span::raw(format!(" | {} records", feed.records_seen())));
            if feed.records_skipped() > 0 {
                spans.push(Span::styled(
                    format!(" ({} older not loaded)", feed.records_skipped()),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            spans.push(Span::raw(" | "));
            spans.push(if feed.is_complete() {
                Span::styled("■ complete", Style::default().fg(Color::Green))
            } else {
                Span::styled("● live", Style::default().fg(Color::Yellow))
            });
        }
        _ => spans.push(Span::raw("tau-bench transcripts")),
    }

    Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use trialog_proto::{ConversationId, RunSessionId, SummaryRecord};

    fn render_to_string(state: &ViewerState) -> String {
        let backend = TestBackend::new(100, 3);
        let mut terminal = Terminal::new(backend).unwrap();

        terminal
            .draw(|f| {
                let widget = render(state);
                f.render_widget(widget, f.area());
            })
            .unwrap();

        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>()
    }

    fn selected_state() -> ViewerState {
        let mut state = ViewerState::new();
        state.select(ConversationId::new(RunSessionId::parse("run42").unwrap(), 7));
        state
    }

    #[test]
    fn header_without_selection() {
        let text = render_to_string(&ViewerState::new());
        assert!(text.contains("tau-bench transcripts"), "got: {}", text);
    }

    #[test]
    fn header_shows_live_task() {
        let text = render_to_string(&selected_state());
        assert!(text.contains("Task run42"), "got: {}", text);
        assert!(!text.contains("Reward"), "got: {}", text);
        assert!(text.contains("task 7"), "got: {}", text);
        assert!(text.contains("live"), "got: {}", text);
    }

    #[test]
    fn header_shows_reward_when_complete() {
        let mut state = selected_state();
        state.feed.as_mut().unwrap().summary = Some(SummaryRecord::new(1.0));
        let text = render_to_string(&state);
        assert!(text.contains("Task run42, Reward: 1"), "got: {}", text);
        assert!(text.contains("complete"), "got: {}", text);
    }
}
