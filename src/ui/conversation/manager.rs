use crate::chat::{ChatEvent, Conversation, ERROR_REPLY};
use crate::client::{ChatClient, StreamEvent};
use crate::ui::conversation::commands::{SlashCommand, get_help_text};
use crate::ui::conversation::composer::{ComposerResult, ConversationComposer};
use crate::ui::conversation::history::ConversationHistory;
use crate::ui::conversation::streaming::StreamingIndicator;
use crossterm::event::KeyEvent;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Ties the conversation state to the streaming client and the UI widgets.
///
/// One turn at a time: while `is_loading` the submit action is disabled and
/// further sends are ignored. Each turn runs Idle → Sending → Streaming →
/// Idle; both terminal events and a dropped channel clear the loading flag.
pub struct ConversationManager {
    conversation: Conversation,
    history: ConversationHistory,
    composer: ConversationComposer,
    indicator: StreamingIndicator,
    client: ChatClient,
    is_loading: bool,
    placeholder_open: bool,
    stream_rx: Option<mpsc::Receiver<StreamEvent>>,
}

impl ConversationManager {
    pub fn new(client: ChatClient, suggested_prompts: Vec<String>) -> Self {
        Self {
            conversation: Conversation::new(),
            history: ConversationHistory::new(100, suggested_prompts),
            composer: ConversationComposer::new("Type your message...".to_string()),
            indicator: StreamingIndicator::new(),
            client,
            is_loading: false,
            placeholder_open: false,
            stream_rx: None,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        match self.composer.handle_key(key) {
            ComposerResult::Submitted(input) => {
                self.handle_input(input);
                ConversationAction::None
            }
            ComposerResult::Command(SlashCommand::Help) => {
                self.history.add_notice(get_help_text());
                ConversationAction::None
            }
            ComposerResult::Command(SlashCommand::Quit) => ConversationAction::Exit,
            ComposerResult::None => ConversationAction::None,
        }
    }

    /// Start a turn: append the user message and issue the request.
    pub fn handle_input(&mut self, input: String) {
        if self.is_loading {
            tracing::debug!("ignoring send while a turn is in flight");
            return;
        }
        if input.trim().is_empty() {
            return;
        }

        self.conversation.apply(ChatEvent::AppendUser(input.clone()));
        self.history.add_user_message(input);

        self.is_loading = true;
        self.indicator.set_active(true);
        self.composer.set_send_enabled(false);

        // payload carries the full history including the new user message
        let rx = self.client.stream_reply(self.conversation.messages().to_vec());
        self.stream_rx = Some(rx);
    }

    /// Drain pending stream events (called from the main loop each tick).
    pub fn poll_stream(&mut self) {
        let Some(mut rx) = self.stream_rx.take() else {
            return;
        };

        loop {
            match rx.try_recv() {
                Ok(event) => {
                    // terminal events drop the receiver with the turn
                    if self.on_stream_event(event) {
                        return;
                    }
                }
                Err(TryRecvError::Empty) => {
                    self.stream_rx = Some(rx);
                    return;
                }
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!("stream channel closed without a terminal event");
                    self.finish_turn();
                    return;
                }
            }
        }
    }

    /// Apply one stream event; returns true when the turn is over.
    fn on_stream_event(&mut self, event: StreamEvent) -> bool {
        match event {
            StreamEvent::Opened => {
                self.conversation.apply(ChatEvent::AppendPlaceholder);
                self.placeholder_open = true;
                self.history.set_streaming_message(String::new());
                false
            }
            StreamEvent::TextDelta(delta) => {
                self.conversation.apply(ChatEvent::ExtendLast(delta));
                if let Some(last) = self.conversation.last() {
                    self.history.set_streaming_message(last.content.clone());
                }
                false
            }
            StreamEvent::StreamComplete => {
                self.finish_turn();
                true
            }
            StreamEvent::Error(detail) => {
                tracing::error!(error = %detail, "turn ended with an error");
                self.fail_turn();
                true
            }
        }
    }

    fn finish_turn(&mut self) {
        if self.placeholder_open {
            if let Some(last) = self.conversation.last() {
                self.history.add_assistant_message(last.content.clone());
            }
        }
        self.end_turn();
    }

    fn fail_turn(&mut self) {
        // partial content stays in place; the error is appended as its own message
        if self.placeholder_open {
            if let Some(last) = self.conversation.last() {
                if !last.content.is_empty() {
                    self.history.add_assistant_message(last.content.clone());
                }
            }
        }
        self.conversation.apply(ChatEvent::AppendError);
        self.history.add_assistant_message(ERROR_REPLY.to_string());
        self.end_turn();
    }

    fn end_turn(&mut self) {
        self.history.clear_streaming_message();
        self.placeholder_open = false;
        self.is_loading = false;
        self.indicator.set_active(false);
        self.composer.set_send_enabled(true);
    }

    #[allow(dead_code)]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    #[allow(dead_code)]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Render the conversation UI components
    pub fn render_ui(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(10),   // history
                Constraint::Length(1), // streaming indicator
                Constraint::Length(3), // composer
            ])
            .split(area);

        frame.render_widget(&self.history, chunks[0]);
        frame.render_widget(&self.indicator, chunks[1]);
        frame.render_widget(&self.composer, chunks[2]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Role;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn manager() -> ConversationManager {
        // port 9 is refused on loopback; tests never await the request anyway
        ConversationManager::new(
            ChatClient::new("http://127.0.0.1:9/api/chat".to_string()),
            Vec::new(),
        )
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn whitespace_only_input_changes_nothing() {
        let mut manager = manager();
        manager.handle_input("   \n ".to_string());

        assert!(manager.conversation.is_empty());
        assert!(!manager.is_loading());
    }

    #[tokio::test]
    async fn send_appends_user_message_and_sets_loading() {
        let mut manager = manager();
        manager.handle_input("Hello".to_string());

        let messages = manager.conversation.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "Hello");
        assert!(manager.is_loading());
    }

    #[tokio::test]
    async fn second_send_is_ignored_while_loading() {
        let mut manager = manager();
        manager.handle_input("Hello".to_string());
        manager.handle_input("again".to_string());

        assert_eq!(manager.conversation.len(), 1);
    }

    #[tokio::test]
    async fn enter_keeps_the_draft_while_loading() {
        let mut manager = manager();
        manager.handle_input("Hello".to_string());

        manager.handle_key(press(KeyCode::Char('h')));
        manager.handle_key(press(KeyCode::Char('i')));
        manager.handle_key(press(KeyCode::Enter));

        assert_eq!(manager.conversation.len(), 1);
        assert_eq!(manager.composer.content(), "hi");
    }

    #[tokio::test]
    async fn successful_stream_merges_chunks_into_placeholder() {
        let mut manager = manager();
        let (tx, rx) = mpsc::channel(8);
        manager.is_loading = true;
        manager.stream_rx = Some(rx);

        tx.send(StreamEvent::Opened).await.unwrap();
        tx.send(StreamEvent::TextDelta("Hi".to_string())).await.unwrap();
        tx.send(StreamEvent::TextDelta(" there".to_string())).await.unwrap();
        tx.send(StreamEvent::StreamComplete).await.unwrap();
        manager.poll_stream();

        let messages = manager.conversation.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].content, "Hi there");
        assert!(!manager.is_loading());
        assert!(manager.stream_rx.is_none());
    }

    #[tokio::test]
    async fn partial_merge_is_visible_between_polls() {
        let mut manager = manager();
        let (tx, rx) = mpsc::channel(8);
        manager.is_loading = true;
        manager.stream_rx = Some(rx);

        tx.send(StreamEvent::Opened).await.unwrap();
        tx.send(StreamEvent::TextDelta("Hi".to_string())).await.unwrap();
        manager.poll_stream();

        assert_eq!(manager.conversation.last().unwrap().content, "Hi");
        assert!(manager.is_loading());

        tx.send(StreamEvent::TextDelta(" there".to_string())).await.unwrap();
        tx.send(StreamEvent::StreamComplete).await.unwrap();
        manager.poll_stream();

        assert_eq!(manager.conversation.last().unwrap().content, "Hi there");
        assert!(!manager.is_loading());
    }

    #[tokio::test]
    async fn failure_preserves_partial_reply_and_appends_fixed_error() {
        let mut manager = manager();
        let (tx, rx) = mpsc::channel(8);
        manager.is_loading = true;
        manager.stream_rx = Some(rx);

        tx.send(StreamEvent::Opened).await.unwrap();
        tx.send(StreamEvent::TextDelta("par".to_string())).await.unwrap();
        tx.send(StreamEvent::Error("connection reset".to_string()))
            .await
            .unwrap();
        manager.poll_stream();

        let messages = manager.conversation.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "par");
        assert_eq!(messages[1].content, ERROR_REPLY);
        assert!(!manager.is_loading());
    }

    #[tokio::test]
    async fn failure_before_placeholder_appends_only_the_error() {
        let mut manager = manager();
        let (tx, rx) = mpsc::channel(8);
        manager.is_loading = true;
        manager.stream_rx = Some(rx);

        tx.send(StreamEvent::Error("503".to_string())).await.unwrap();
        manager.poll_stream();

        let messages = manager.conversation.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, ERROR_REPLY);
        assert!(!manager.is_loading());
    }

    #[tokio::test]
    async fn dropped_channel_still_clears_loading() {
        let mut manager = manager();
        let (tx, rx) = mpsc::channel(8);
        manager.is_loading = true;
        manager.stream_rx = Some(rx);

        tx.send(StreamEvent::Opened).await.unwrap();
        drop(tx);
        manager.poll_stream();

        assert!(!manager.is_loading());
        assert!(manager.stream_rx.is_none());
    }

    #[tokio::test]
    async fn quit_command_requests_exit() {
        let mut manager = manager();
        for c in "/quit".chars() {
            manager.handle_key(press(KeyCode::Char(c)));
        }
        // first Enter applies the palette selection, second submits the command
        manager.handle_key(press(KeyCode::Enter));
        assert_eq!(manager.handle_key(press(KeyCode::Enter)), ConversationAction::Exit);
    }
}
