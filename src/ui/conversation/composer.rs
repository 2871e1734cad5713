use crate::ui::conversation::commands::{
    CommandEntry, SlashCommand, command_entries, parse_slash_command,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    Command(SlashCommand),
    None,
}

/// Draft input box at the bottom of the conversation.
///
/// Enter submits, Shift+Enter inserts a newline. While a reply is streaming
/// the submit action is disabled (the draft is kept); slash commands still go
/// through.
pub struct ConversationComposer {
    content: String,
    cursor: usize,
    placeholder: String,
    has_focus: bool,
    send_enabled: bool,
    command_entries: Vec<CommandEntry>,
    filtered_commands: Vec<CommandEntry>,
    show_command_palette: bool,
    selected_command: Option<usize>,
}

impl ConversationComposer {
    pub fn new(placeholder: String) -> Self {
        Self {
            content: String::new(),
            cursor: 0,
            placeholder,
            has_focus: true,
            send_enabled: true,
            command_entries: command_entries(),
            filtered_commands: Vec::new(),
            show_command_palette: false,
            selected_command: None,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.insert_char('\n');
                } else if self.show_command_palette {
                    self.apply_selected_command();
                } else if !self.content.trim().is_empty() {
                    if let Some(command) = parse_slash_command(self.content.trim()) {
                        self.clear();
                        return ComposerResult::Command(command);
                    }
                    if self.send_enabled {
                        let content = std::mem::take(&mut self.content);
                        self.cursor = 0;
                        return ComposerResult::Submitted(content);
                    }
                    // submit disabled: keep the draft untouched
                }
            }
            KeyCode::Up => {
                if self.show_command_palette {
                    self.move_command_selection(-1);
                }
            }
            KeyCode::Down => {
                if self.show_command_palette {
                    self.move_command_selection(1);
                }
            }
            KeyCode::Esc => {
                if self.show_command_palette {
                    self.close_command_palette();
                }
            }
            KeyCode::Tab => {
                if self.show_command_palette {
                    self.apply_selected_command();
                }
            }
            KeyCode::Char(c) => {
                self.insert_char(c);

                if self.show_command_palette {
                    if self.content.starts_with('/') && !c.is_whitespace() {
                        self.refresh_command_palette();
                    } else {
                        self.close_command_palette();
                    }
                } else if self.content == "/" {
                    self.open_command_palette();
                }
            }
            KeyCode::Backspace => {
                if self.backspace() && self.show_command_palette {
                    if self.content.starts_with('/') {
                        self.refresh_command_palette();
                    } else {
                        self.close_command_palette();
                    }
                }
            }
            KeyCode::Delete => {
                if self.delete() && self.show_command_palette {
                    if self.content.starts_with('/') {
                        self.refresh_command_palette();
                    } else {
                        self.close_command_palette();
                    }
                }
            }
            KeyCode::Left => {
                self.cursor = prev_boundary(&self.content, self.cursor);
            }
            KeyCode::Right => {
                self.cursor = next_boundary(&self.content, self.cursor);
            }
            KeyCode::Home => {
                self.cursor = 0;
            }
            KeyCode::End => {
                self.cursor = self.content.len();
            }
            _ => {}
        }

        ComposerResult::None
    }

    fn insert_char(&mut self, c: char) {
        self.content.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let start = prev_boundary(&self.content, self.cursor);
        self.content.replace_range(start..self.cursor, "");
        self.cursor = start;
        true
    }

    fn delete(&mut self) -> bool {
        if self.cursor >= self.content.len() {
            return false;
        }
        let end = next_boundary(&self.content, self.cursor);
        self.content.replace_range(self.cursor..end, "");
        true
    }

    fn open_command_palette(&mut self) {
        self.show_command_palette = true;
        self.refresh_command_palette();
        self.selected_command = Some(0);
    }

    fn close_command_palette(&mut self) {
        self.show_command_palette = false;
        self.filtered_commands.clear();
        self.selected_command = None;
    }

    fn refresh_command_palette(&mut self) {
        let query = self.content.trim_start_matches('/').to_lowercase();
        self.filtered_commands.clear();
        for entry in &self.command_entries {
            if query.is_empty() || entry.keyword.starts_with(&query) {
                self.filtered_commands.push(*entry);
            }
        }

        if self.filtered_commands.is_empty() {
            self.selected_command = None;
        } else {
            let index = self.selected_command.unwrap_or(0);
            self.selected_command = Some(index.min(self.filtered_commands.len() - 1));
        }
    }

    fn move_command_selection(&mut self, delta: isize) {
        if self.filtered_commands.is_empty() {
            self.selected_command = None;
            return;
        }

        let len = self.filtered_commands.len() as isize;
        let mut next = self.selected_command.unwrap_or(0) as isize + delta;
        if next < 0 {
            next = len - 1;
        } else if next >= len {
            next = 0;
        }
        self.selected_command = Some(next as usize);
    }

    fn apply_selected_command(&mut self) {
        let Some(index) = self.selected_command else {
            return;
        };
        let Some(entry) = self.filtered_commands.get(index).copied() else {
            return;
        };

        self.content = format!("/{}", entry.keyword);
        self.cursor = self.content.len();
        self.close_command_palette();
    }

    /// Set focus state
    #[allow(dead_code)]
    pub fn set_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
    }

    /// Enable or disable the submit action (draft editing stays available)
    pub fn set_send_enabled(&mut self, enabled: bool) {
        self.send_enabled = enabled;
    }

    /// Get current content
    #[allow(dead_code)]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Clear content
    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
        self.close_command_palette();
    }
}

fn prev_boundary(s: &str, pos: usize) -> usize {
    if pos == 0 {
        return 0;
    }
    let mut p = pos - 1;
    while p > 0 && !s.is_char_boundary(p) {
        p -= 1;
    }
    p
}

fn next_boundary(s: &str, pos: usize) -> usize {
    if pos >= s.len() {
        return s.len();
    }
    let mut p = pos + 1;
    while p < s.len() && !s.is_char_boundary(p) {
        p += 1;
    }
    p
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.send_enabled {
            "Message"
        } else {
            "Message (waiting for reply)"
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(if self.has_focus && self.send_enabled {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Gray)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
        } else {
            // render content with a cursor indicator
            let mut content = self.content.clone();
            if self.has_focus {
                content.insert(self.cursor.min(content.len()), '▌');
            }

            for (i, line_text) in content.split('\n').enumerate() {
                if i < inner_area.height as usize {
                    let line = Line::from(vec![Span::raw(line_text)]);
                    buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
                }
            }
        }

        if self.show_command_palette {
            let palette_height = (self.filtered_commands.len().min(5) + 2) as u16;
            let palette_area = Rect {
                x: inner_area.x,
                y: inner_area.y.saturating_sub(palette_height),
                width: inner_area.width,
                height: palette_height,
            };

            let block = Block::default()
                .borders(Borders::ALL)
                .title("Commands")
                .style(Style::default().fg(Color::Blue));
            let inner = block.inner(palette_area);
            block.render(palette_area, buf);

            for (index, entry) in self.filtered_commands.iter().enumerate() {
                if index >= inner.height as usize {
                    break;
                }

                let style = if self.selected_command == Some(index) {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };

                let line = Line::from(vec![
                    Span::styled(format!("/{}", entry.keyword), style),
                    Span::styled(" — ", Style::default().fg(Color::DarkGray)),
                    Span::styled(entry.description, Style::default().fg(Color::Gray)),
                ]);
                buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(composer: &mut ConversationComposer, text: &str) {
        for c in text.chars() {
            composer.handle_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn enter_submits_and_clears_the_draft() {
        let mut composer = ConversationComposer::new("Type...".to_string());
        type_text(&mut composer, "Hello");

        let result = composer.handle_key(press(KeyCode::Enter));
        assert_eq!(result, ComposerResult::Submitted("Hello".to_string()));
        assert_eq!(composer.content(), "");
    }

    #[test]
    fn whitespace_only_draft_does_not_submit() {
        let mut composer = ConversationComposer::new(String::new());
        type_text(&mut composer, "   ");

        assert_eq!(composer.handle_key(press(KeyCode::Enter)), ComposerResult::None);
        assert_eq!(composer.content(), "   ");
    }

    #[test]
    fn submit_disabled_keeps_the_draft() {
        let mut composer = ConversationComposer::new(String::new());
        composer.set_send_enabled(false);
        type_text(&mut composer, "queued thought");

        assert_eq!(composer.handle_key(press(KeyCode::Enter)), ComposerResult::None);
        assert_eq!(composer.content(), "queued thought");

        composer.set_send_enabled(true);
        assert_eq!(
            composer.handle_key(press(KeyCode::Enter)),
            ComposerResult::Submitted("queued thought".to_string())
        );
    }

    #[test]
    fn slash_command_goes_through_even_while_disabled() {
        let mut composer = ConversationComposer::new(String::new());
        composer.set_send_enabled(false);
        type_text(&mut composer, "/quit");
        // close the palette so Enter parses the typed command directly
        composer.close_command_palette();

        assert_eq!(
            composer.handle_key(press(KeyCode::Enter)),
            ComposerResult::Command(SlashCommand::Quit)
        );
        assert_eq!(composer.content(), "");
    }

    #[test]
    fn cursor_moves_over_multibyte_characters() {
        let mut composer = ConversationComposer::new(String::new());
        type_text(&mut composer, "café");

        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Backspace));
        assert_eq!(composer.content(), "caé");

        composer.handle_key(press(KeyCode::End));
        composer.handle_key(press(KeyCode::Backspace));
        assert_eq!(composer.content(), "ca");
    }

    #[test]
    fn shift_enter_inserts_newline() {
        let mut composer = ConversationComposer::new(String::new());
        type_text(&mut composer, "line one");
        composer.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        type_text(&mut composer, "line two");

        assert_eq!(composer.content(), "line one\nline two");
    }
}
