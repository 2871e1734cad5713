//! Streaming activity indicator shown while a reply is in flight.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// One-line "thinking" indicator rendered between history and composer.
#[derive(Debug, Default)]
pub struct StreamingIndicator {
    active: bool,
}

impl StreamingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    #[allow(dead_code)]
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Widget for &StreamingIndicator {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if !self.active || area.height == 0 {
            return;
        }

        let dots = match (std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis()
            / 300)
            % 4
        {
            0 => ".",
            1 => "..",
            2 => "...",
            _ => "   ",
        };

        let indicator = Line::from(vec![
            Span::styled("🤖 ", Style::default().fg(Color::Green)),
            Span::styled("thinking", Style::default().fg(Color::Green)),
            Span::styled(dots, Style::default().fg(Color::Yellow)),
        ]);
        buf.set_line(area.x, area.y, &indicator, area.width);
    }
}
