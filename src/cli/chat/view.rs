use std::io::Write;
use std::sync::Mutex;

use color_print::cformat;
use crossterm::cursor::MoveToColumn;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use tracing::warn;

use super::conversation_state::{Role, Turn};

const WELCOME_TEXT: &str = "Welcome 👋\nAsk your question about our products.";
const PENDING_TEXT: &str = "🤖 Response in progress...";

/// Where a chat widget shows its conversation.
///
/// Hooks receive a snapshot of the turns taken after the change and are
/// called without the widget's state locked.
pub trait ChatView: Send + Sync {
    /// The turn list changed; bring the newest turn into view.
    fn scroll_to_latest(&self, turns: &[Turn]);

    /// A request started or finished.
    fn awaiting_changed(&self, awaiting: bool);
}

/// A view that shows nothing.
pub struct NullView;

impl ChatView for NullView {
    fn scroll_to_latest(&self, _turns: &[Turn]) {}

    fn awaiting_changed(&self, _awaiting: bool) {}
}

struct TerminalState {
    output: Box<dyn Write + Send>,
    rendered: usize,
    indicator_shown: bool,
}

/// Renders the transcript as an append-only stream of lines.
pub struct TerminalView {
    state: Mutex<TerminalState>,
}

impl TerminalView {
    pub fn new(output: Box<dyn Write + Send>) -> Self {
        Self {
            state: Mutex::new(TerminalState {
                output,
                rendered: 0,
                indicator_shown: false,
            }),
        }
    }

    /// Prints the greeting shown while the conversation is empty.
    pub fn print_welcome(&self) {
        self.print_notice(&cformat!("<bold>{}</bold>", WELCOME_TEXT));
    }

    /// Prints text that is not part of the transcript.
    pub fn print_notice(&self, text: &str) {
        self.with_state(|state| {
            writeln!(state.output, "{}\n", text)?;
            state.output.flush()
        });
    }

    fn with_state(&self, f: impl FnOnce(&mut TerminalState) -> std::io::Result<()>) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = f(&mut *state) {
            warn!("Failed to write to terminal: {}", e);
        }
    }
}

impl ChatView for TerminalView {
    fn scroll_to_latest(&self, turns: &[Turn]) {
        self.with_state(|state| {
            let indicator = state.indicator_shown;
            if indicator {
                erase_indicator(state)?;
            }

            if turns.len() < state.rendered || turns.is_empty() {
                writeln!(state.output, "{}", "── new conversation ──".dim())?;
                writeln!(state.output, "{}\n", cformat!("<bold>{}</bold>", WELCOME_TEXT))?;
                state.rendered = 0;
            }

            for turn in &turns[state.rendered..] {
                writeln!(state.output, "{}\n", format_turn(turn))?;
            }
            state.rendered = turns.len();

            if indicator {
                show_indicator(state)?;
            }
            state.output.flush()
        });
    }

    fn awaiting_changed(&self, awaiting: bool) {
        self.with_state(|state| {
            match (awaiting, state.indicator_shown) {
                (true, false) => show_indicator(state)?,
                (false, true) => erase_indicator(state)?,
                _ => {}
            }
            state.output.flush()
        });
    }
}

fn format_turn(turn: &Turn) -> String {
    match turn.role() {
        Role::User => cformat!("<cyan><bold>👤 You</bold></cyan>\n{}", turn.content()),
        Role::Assistant => {
            cformat!("<green><bold>🤖 Assistant</bold></green>\n{}", turn.content())
        }
    }
}

fn show_indicator(state: &mut TerminalState) -> std::io::Result<()> {
    write!(state.output, "{}", PENDING_TEXT.dim())?;
    state.indicator_shown = true;
    Ok(())
}

fn erase_indicator(state: &mut TerminalState) -> std::io::Result<()> {
    crossterm::queue!(state.output, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
    state.indicator_shown = false;
    Ok(())
}
