//! Terminal lifecycle and the main event loop.

use crate::ui::conversation::{ConversationAction, ConversationManager};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io;
use std::time::Duration;

/// How often the loop wakes up to drain stream events and redraw.
const TICK: Duration = Duration::from_millis(50);

pub async fn run(mut manager: ConversationManager) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut manager).await;

    // restore the terminal even when the loop errored
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    manager: &mut ConversationManager,
) -> Result<()> {
    loop {
        manager.poll_stream();

        terminal.draw(|frame| {
            let area = frame.size();
            manager.render_ui(frame, area);
        })?;

        if !event::poll(TICK)? {
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                tracing::info!("interrupted, shutting down");
                return Ok(());
            }
            if manager.handle_key(key) == ConversationAction::Exit {
                return Ok(());
            }
        }
    }
}
