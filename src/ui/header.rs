use crate::ui::app::ScreenId;
use crate::ui::theme::{ACCENT, GLOBAL_BORDER, HEADER_SEPARATOR, HEADER_TEXT};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

/// Screen tabs. The active one is highlighted.
pub struct Header {
    active: ScreenId,
}

impl Header {
    pub fn new(active: ScreenId) -> Self {
        Self { active }
    }

    pub fn widget(&self) -> Paragraph<'static> {
        let text_style = Style::default().fg(HEADER_TEXT);
        let separator_style = Style::default().fg(HEADER_SEPARATOR);
        let active_style = Style::default().fg(ACCENT).add_modifier(Modifier::BOLD);

        let mut spans = vec![Span::styled("  statecraft", text_style)];
        for (index, screen) in ScreenId::ALL.iter().enumerate() {
            spans.push(Span::styled("  │  ", separator_style));
            let style = if *screen == self.active {
                active_style
            } else {
                text_style
            };
            spans.push(Span::styled(format!("{} {}", index + 1, screen.title()), style));
        }

        Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::TOP | Borders::BOTTOM)
                .border_style(Style::default().fg(GLOBAL_BORDER)),
        )
    }
}
