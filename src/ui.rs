pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, HintPopup};
use crate::util::{centered_rect, format_time};

const HORIZONTAL_MARGIN: u16 = 3;
const VERTICAL_MARGIN: u16 = 1;
/// The countdown turns red at or below this many seconds.
const LOW_TIME_SECS: u32 = 30;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn timer_style(secs: u32) -> Style {
    if secs <= LOW_TIME_SECS {
        bold().fg(Color::Red)
    } else {
        bold().fg(Color::Cyan)
    }
}

/// Title on the left, `right` flush against the right edge.
fn header_line<'a>(title: &'a str, right: Vec<Span<'a>>, width: u16) -> Line<'a> {
    let right_width: usize = right.iter().map(|s| s.content.width()).sum();
    let gap = (width as usize).saturating_sub(title.width() + right_width);
    let mut spans = vec![
        Span::styled(title, bold().fg(Color::Magenta)),
        Span::raw(" ".repeat(gap)),
    ];
    spans.extend(right);
    Line::from(spans)
}

fn countdown<'a>(secs: u32) -> Span<'a> {
    Span::styled(format!("⏱ {}", format_time(secs)), timer_style(secs))
}

fn help_line(keys: &[(&'static str, &'static str)]) -> Line<'static> {
    let mut spans = Vec::new();
    for (i, (key, action)) in keys.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("  ·  ", dim()));
        }
        spans.push(Span::styled(*key, bold()));
        spans.push(Span::styled(format!(" {action}"), dim()));
    }
    Line::from(spans).alignment(Alignment::Center)
}

fn render_hint(hint: &HintPopup, area: Rect, buf: &mut Buffer) {
    let popup = centered_rect(area.width.saturating_sub(10).min(60), 5, area);
    Clear.render(popup, buf);
    Paragraph::new(hint.text.as_str())
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center)
        .block(
            Block::bordered()
                .title(format!(" 💡 Hint for rule {} ", hint.rule_id))
                .title_bottom(Line::from(" Esc to close ").alignment(Alignment::Right))
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .render(popup, buf);
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        screen::current_screen(self).render(self, area, buf);

        if let Some(hint) = &self.hint {
            render_hint(hint, area, buf);
        }
    }
}
