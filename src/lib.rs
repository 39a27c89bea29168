/// Client for the remote chat service.
pub mod chat_client;

/// Terminal front-end.
pub mod cli;

/// Settings from the environment and the command line.
pub mod config;
