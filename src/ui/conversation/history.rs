//! Conversation history display component

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use std::collections::VecDeque;

/// Who a rendered entry belongs to. `Notice` is display-only (help output,
/// hints) and never enters the conversation payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
    Notice,
}

/// A single rendered entry
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub speaker: Speaker,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Scrollback of finished messages plus the in-flight streaming reply.
///
/// This is presentation state only; the canonical message sequence lives in
/// [`crate::chat::Conversation`].
pub struct ConversationHistory {
    entries: VecDeque<HistoryEntry>,
    max_entries: usize,
    streaming_message: Option<String>,
    suggested_prompts: Vec<String>,
}

impl ConversationHistory {
    pub fn new(max_entries: usize, suggested_prompts: Vec<String>) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
            streaming_message: None,
            suggested_prompts,
        }
    }

    fn push(&mut self, speaker: Speaker, content: String) {
        self.entries.push_back(HistoryEntry {
            speaker,
            content,
            timestamp: chrono::Utc::now(),
        });
        // cap the scrollback, display only
        if self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub fn add_user_message(&mut self, content: String) {
        self.push(Speaker::User, content);
    }

    pub fn add_assistant_message(&mut self, content: String) {
        self.push(Speaker::Assistant, content);
    }

    /// Display-only note (help output and the like)
    pub fn add_notice(&mut self, content: String) {
        self.push(Speaker::Notice, content);
    }

    /// Replace the in-flight reply text shown below the scrollback
    pub fn set_streaming_message(&mut self, message: String) {
        self.streaming_message = Some(message);
    }

    pub fn clear_streaming_message(&mut self) {
        self.streaming_message = None;
    }

    #[allow(dead_code)]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

impl Widget for &ConversationHistory {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title("💬 ChatFlow");
        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.entries.is_empty() && self.streaming_message.is_none() {
            self.render_welcome(inner_area, buf);
            return;
        }

        let mut all_lines: Vec<Line> = Vec::new();
        for entry in self.entries.iter() {
            all_lines.append(&mut render_entry(entry, inner_area.width));
            // spacing between messages
            all_lines.push(Line::from(vec![Span::raw("")]));
        }

        if let Some(ref streaming_text) = self.streaming_message {
            all_lines.append(&mut render_streaming(streaming_text, inner_area.width));
        }

        // show the tail that fits
        let height = inner_area.height as usize;
        let start = all_lines.len().saturating_sub(height);
        for (i, line) in all_lines[start..].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

impl ConversationHistory {
    fn render_welcome(&self, area: Rect, buf: &mut Buffer) {
        let mut lines = vec![
            Line::from(vec![Span::styled(
                "Ready to chat 🤖",
                Style::default().fg(Color::Green),
            )]),
            Line::from(vec![Span::raw("")]),
            Line::from(vec![Span::styled(
                "Type a message below. Enter sends, Shift+Enter adds a new line.",
                Style::default().fg(Color::Gray),
            )]),
            Line::from(vec![Span::raw("")]),
        ];

        if !self.suggested_prompts.is_empty() {
            lines.push(Line::from(vec![Span::styled(
                "Try one of these:",
                Style::default().fg(Color::DarkGray),
            )]));
            for prompt in &self.suggested_prompts {
                lines.push(Line::from(vec![
                    Span::styled("  • ", Style::default().fg(Color::DarkGray)),
                    Span::styled(prompt.as_str(), Style::default().fg(Color::Gray)),
                ]));
            }
        }

        for (i, line) in lines.iter().enumerate() {
            if i < area.height as usize {
                buf.set_line(area.x, area.y + i as u16, line, area.width);
            }
        }
    }
}

/// Render a finished entry into header + wrapped content lines
fn render_entry(entry: &HistoryEntry, width: u16) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let icon = match entry.speaker {
        Speaker::User => "👤",
        Speaker::Assistant => "🤖",
        Speaker::Notice => "ℹ️",
    };
    let timestamp = entry.timestamp.format("%H:%M:%S").to_string();
    let header = format!("{} {} {}", icon, timestamp, "─".repeat(20));
    lines.push(Line::from(vec![Span::styled(
        header,
        Style::default().fg(Color::DarkGray),
    )]));

    let style = match entry.speaker {
        Speaker::User => Style::default().fg(Color::Blue),
        Speaker::Assistant => Style::default().fg(Color::Green),
        Speaker::Notice => Style::default().fg(Color::Yellow),
    };
    for content_line in wrap_text(&entry.content, width.saturating_sub(2) as usize) {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(content_line, style),
        ]));
    }

    lines
}

/// Render the in-flight reply with a cursor on the last line
fn render_streaming(text: &str, width: u16) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let timestamp = chrono::Utc::now().format("%H:%M:%S").to_string();
    let header = format!("🤖 {} {}", timestamp, "─".repeat(20));
    lines.push(Line::from(vec![Span::styled(
        header,
        Style::default().fg(Color::DarkGray),
    )]));

    let content_lines = wrap_text(text, width.saturating_sub(2) as usize);
    let last = content_lines.len().saturating_sub(1);
    for (i, content_line) in content_lines.into_iter().enumerate() {
        let cursor = if i == last { "▋" } else { "" };
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(content_line, Style::default().fg(Color::Green)),
            Span::styled(cursor, Style::default().fg(Color::Yellow)),
        ]));
    }

    lines
}

/// Word-wrap text to fit within the given width
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_width = 0;

        for word in paragraph.split_whitespace() {
            let word_width = word.chars().count();
            if current_width + word_width + 1 <= width || current_line.is_empty() {
                if !current_line.is_empty() {
                    current_line.push(' ');
                    current_width += 1;
                }
                current_line.push_str(word);
                current_width += word_width;
            } else {
                lines.push(current_line);
                current_line = word.to_string();
                current_width = word_width;
            }
        }
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_splits_long_text_and_keeps_short_text() {
        assert_eq!(wrap_text("hello world", 20), vec!["hello world"]);
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap_text("", 10), vec![""]);
    }

    #[test]
    fn wrap_respects_explicit_newlines() {
        assert_eq!(wrap_text("a\nb", 10), vec!["a", "b"]);
    }

    #[test]
    fn streaming_message_lifecycle() {
        let mut history = ConversationHistory::new(100, Vec::new());
        history.set_streaming_message("Hi".to_string());
        history.set_streaming_message("Hi there".to_string());
        assert_eq!(history.streaming_message.as_deref(), Some("Hi there"));

        history.add_assistant_message("Hi there".to_string());
        history.clear_streaming_message();
        assert!(history.streaming_message.is_none());
        assert_eq!(history.entry_count(), 1);
    }

    #[test]
    fn scrollback_is_capped() {
        let mut history = ConversationHistory::new(2, Vec::new());
        history.add_user_message("one".to_string());
        history.add_assistant_message("two".to_string());
        history.add_user_message("three".to_string());

        assert_eq!(history.entry_count(), 2);
        assert_eq!(history.entries[0].content, "two");
    }
}
