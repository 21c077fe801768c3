use crate::ui::app::{App, ScreenId};
use crate::ui::footer::Footer;
use crate::ui::header::Header;
use crate::ui::layout::{centered_rect, content_and_hints, layout_regions};
use crate::ui::theme::{
    ACCENT, ACTIVE_HIGHLIGHT, GLOBAL_BORDER, HEADER_SEPARATOR, HEADER_TEXT, STATUS_ERROR,
    STATUS_OK, STATUS_PENDING,
};
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph};
use ratatui::Frame;
use statecraft::sample::resettable::MAX_ACCEPTED_LEVEL;
use statecraft::Async;

pub fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();
    let (header, body, footer) = layout_regions(area);

    frame.render_widget(Header::new(app.active()).widget(), header);
    frame.render_widget(Clear, body);

    let (content, hints) = content_and_hints(body);
    match app.active() {
        ScreenId::Counter => draw_counter(frame, app, content),
        ScreenId::Entities => draw_entities(frame, app, content),
        ScreenId::Resettable => draw_resettable(frame, app, content),
    }
    frame.render_widget(hint_line(app.active()), hints);

    let view = app.view();
    frame.render_widget(Footer::new(view.status.as_ref()).widget(footer), footer);
}

fn hint_line(screen: ScreenId) -> Paragraph<'static> {
    let text = match screen {
        ScreenId::Counter => " +/↑: Increment │ -/↓: Decrement │ 0: Reset",
        ScreenId::Entities => {
            " ↑↓: Move cursor │ Shift+↑↓: Reorder │ Space: Select │ d: Remove │ c: Clear │ r: Reload"
        }
        ScreenId::Resettable => " Space: Toggle │ ←→: Level (host rejects values above 80)",
    };
    Paragraph::new(text).style(Style::default().fg(HEADER_SEPARATOR))
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(GLOBAL_BORDER))
}

fn draw_counter(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let count = app.view().count;
    let rect = centered_rect(40, 40, area);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            count.to_string(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
    ];
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(panel("Count")),
        rect,
    );
}

fn draw_entities(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let view = app.view();
    let state = &view.entities;

    let (status, color) = match &state.entities {
        Async::Uninitialized => ("idle".to_string(), HEADER_SEPARATOR),
        Async::Loading { .. } => ("loading…".to_string(), STATUS_PENDING),
        Async::Success { .. } => (format!("{} loaded", state.items.len()), STATUS_OK),
        Async::Fail { error, .. } => (format!("failed: {error}"), STATUS_ERROR),
    };
    let title = format!(
        "Entities ({} selected) · {}",
        state.selected_count(),
        status
    );

    let visible = area.height.saturating_sub(2) as usize;
    let first = state.cursor.saturating_sub(visible.saturating_sub(1));
    let lines: Vec<Line> = state
        .items
        .iter()
        .enumerate()
        .skip(first)
        .take(visible)
        .map(|(index, item)| {
            let marker = if item.selected { "[x]" } else { "[ ]" };
            let mut style = Style::default().fg(HEADER_TEXT);
            if index == state.cursor {
                style = style.bg(ACTIVE_HIGHLIGHT).add_modifier(Modifier::BOLD);
            }
            Line::from(Span::styled(format!(" {marker} {}", item.title), style))
        })
        .collect();

    let block = panel(&title).title_style(Style::default().fg(color));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_resettable(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let shown = app.controls();
    let confirmed = app.confirmed_controls();
    let pending = shown.enabled != confirmed.enabled || shown.level != confirmed.level;

    let rect = centered_rect(60, 60, area);
    frame.render_widget(panel("Host settings"), rect);
    let inner = Rect {
        x: rect.x + 2,
        y: rect.y + 1,
        width: rect.width.saturating_sub(4),
        height: rect.height.saturating_sub(2),
    };
    if inner.height < 5 {
        return;
    }

    let toggle = if shown.enabled { "● enabled" } else { "○ disabled" };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Toggle  ", Style::default().fg(HEADER_SEPARATOR)),
            Span::styled(toggle, Style::default().fg(HEADER_TEXT)),
        ])),
        Rect { height: 1, ..inner },
    );

    let gauge_color = if shown.level > MAX_ACCEPTED_LEVEL {
        STATUS_ERROR
    } else {
        ACCENT
    };
    frame.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(gauge_color).bg(ACTIVE_HIGHLIGHT))
            .percent(u16::from(shown.level))
            .label(format!("Level {}", shown.level)),
        Rect {
            y: inner.y + 2,
            height: 1,
            ..inner
        },
    );

    let (sync_text, sync_color) = if pending {
        ("waiting for host…", STATUS_PENDING)
    } else {
        ("in sync with host", STATUS_OK)
    };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(sync_text, Style::default().fg(sync_color)),
            Span::styled(
                format!(
                    "   confirmed: {} / {}",
                    if confirmed.enabled { "on" } else { "off" },
                    confirmed.level
                ),
                Style::default().fg(HEADER_SEPARATOR),
            ),
        ])),
        Rect {
            y: inner.y + 4,
            height: 1,
            ..inner
        },
    );
}
