use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
};

const BINDINGS: &[(&str, &str)] = &[
    ("j / ↓", "next conversation / scroll down"),
    ("k / ↑", "previous conversation / scroll up"),
    ("Enter", "view highlighted conversation"),
    ("Tab", "switch between list and transcript"),
    ("PgUp / PgDn", "page transcript"),
    ("g / G", "top / live tail"),
    ("r", "refresh now"),
    ("?", "toggle this help"),
    ("q / Ctrl+C", "quit"),
];

/// Renders the help overlay centered in `area`.
pub fn render(frame: &mut Frame, area: Rect) {
    let lines: Vec<Line> = BINDINGS
        .iter()
        .map(|(key, what)| Line::from(format!(" {key:<12} {what}")))
        .collect();

    let height = lines.len() as u16 + 2;
    let [popup] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = Layout::horizontal([Constraint::Length(54)])
        .flex(Flex::Center)
        .areas(popup);

    let help = Paragraph::new(lines).block(
        Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(Clear, popup);
    frame.render_widget(help, popup);
}
