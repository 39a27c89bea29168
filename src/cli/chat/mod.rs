pub mod conversation_state;
pub mod prompt;
pub mod view;
pub mod widget;

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use color_print::cstr;
use eyre::Result;
use prompt::generate_prompt;
use tracing::{debug, info, warn};
use view::TerminalView;
use widget::{ChatWidget, SubmitOutcome, WidgetConfig};

use crate::chat_client::ChatService;

const HEADER_TEXT: &str =
    cstr!("<bold>💬 Customer Support AI</bold>  <dim>(/help for commands)</dim>");

const HELP_TEXT: &str = "
Chat Widget

/reset        Start a new conversation (alias: /clear)
/help         Show this help dialogue
/quit         Quit the application
";

/// Drives a [`ChatWidget`] from a terminal.
pub struct ChatContext {
    input: Option<String>,
    interactive: bool,
    widget: ChatWidget,
    view: Arc<TerminalView>,
}

impl ChatContext {
    pub fn new(
        output: Box<dyn Write + Send>,
        input: Option<String>,
        interactive: bool,
        service: Arc<dyn ChatService>,
        config: WidgetConfig,
    ) -> Self {
        let view = Arc::new(TerminalView::new(output));
        let widget = ChatWidget::new(service, view.clone(), config);

        Self {
            input,
            interactive,
            widget,
            view,
        }
    }

    pub fn widget(&self) -> &ChatWidget {
        &self.widget
    }

    pub async fn run(&mut self) -> Result<ExitCode> {
        // Single message, then exit
        if let Some(input) = self.input.take() {
            self.handle_input(&input).await;
            return Ok(ExitCode::SUCCESS);
        }

        if self.interactive {
            self.print_welcome();
            self.run_interactive().await?;
        }

        Ok(ExitCode::SUCCESS)
    }

    fn print_welcome(&self) {
        self.view.print_notice(HEADER_TEXT);
        self.view.print_welcome();
    }

    async fn run_interactive(&mut self) -> Result<()> {
        let mut rl = prompt::rl()?;
        let history = prompt::history_path();
        if let Some(path) = &history {
            if rl.load_history(path).is_err() {
                debug!("No history loaded from {}", path.display());
            }
        }

        loop {
            let prompt_text = generate_prompt(None);
            let readline = rl.readline(&prompt_text);

            match readline {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }

                    rl.add_history_entry(line.as_str());

                    if line.trim() == "/quit" {
                        break;
                    }

                    self.handle_input(&line).await;
                }
                Err(e) => {
                    info!("Leaving chat: {}", e);
                    break;
                }
            }
        }

        if let Some(path) = &history {
            save_history(&mut rl, path);
        }

        Ok(())
    }

    async fn handle_input(&mut self, input: &str) {
        match input.trim() {
            "/help" => {
                self.view.print_notice(HELP_TEXT);
            }
            "/reset" | "/clear" => {
                self.widget.reset();
            }
            _ => {
                self.widget.set_input(input);
                if self.widget.submit_pending().await == SubmitOutcome::Ignored {
                    debug!("Input was not sent");
                }
            }
        }
    }
}

fn save_history(rl: &mut rustyline::Editor<()>, path: &std::path::Path) {
    if let Some(dir) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!("Failed to create history directory {}: {}", dir.display(), e);
            return;
        }
    }
    if let Err(e) = rl.save_history(path) {
        warn!("Failed to save history to {}: {}", path.display(), e);
    }
}
