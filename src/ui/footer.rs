use crate::ui::app::StatusLine;
use crate::ui::theme::{GLOBAL_BORDER, HEADER_TEXT, STATUS_ERROR, STATUS_OK};
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const HINTS: &str = " Tab: Next screen │ 1-3: Jump │ Ctrl+R: Reload config │ q: Quit";

pub struct Footer<'a> {
    status: Option<&'a StatusLine>,
}

impl<'a> Footer<'a> {
    pub fn new(status: Option<&'a StatusLine>) -> Self {
        Self { status }
    }

    pub fn widget(&self, area: Rect) -> Paragraph<'static> {
        let dim = Style::default().fg(HEADER_TEXT).add_modifier(Modifier::DIM);
        let (left, left_style) = match self.status {
            Some(status) => {
                let color = if status.is_error { STATUS_ERROR } else { STATUS_OK };
                (format!(" {}", status.text), Style::default().fg(color))
            }
            None => (HINTS.to_string(), dim),
        };
        let version = format!("v{} ", VERSION);

        // Padding by char count, not byte count.
        let content_width = area.width.saturating_sub(2) as usize;
        let padding = content_width
            .saturating_sub(left.chars().count())
            .saturating_sub(version.chars().count());

        let line = Line::from(vec![
            Span::styled(left, left_style),
            Span::styled(" ".repeat(padding), dim),
            Span::styled(version, dim),
        ]);

        Paragraph::new(line).alignment(Alignment::Left).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(GLOBAL_BORDER)),
        )
    }
}
