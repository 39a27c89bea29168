use std::path::PathBuf;

use rustyline::{Config, Editor, Result};

pub fn generate_prompt(custom_prompt: Option<&str>) -> String {
    custom_prompt.unwrap_or("> ").to_string()
}

pub fn rl() -> Result<Editor<()>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(false)
        .build();
    Editor::with_config(config)
}

/// Location of the line editor history, if the platform has a data dir.
pub fn history_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("chat-widget").join("history.txt"))
}
