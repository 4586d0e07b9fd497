//! Surcor is a terminal-first chat client for streaming LLM conversations
//! with Google Drive context attachments.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns runtime state: the transcript, the mention-aware message
//!   composer, the context catalog, configuration, and streaming
//!   orchestration.
//! - [`ui`] renders the terminal interface and runs the interactive event
//!   loop that drives user input and display updates.
//! - [`api`] defines the wire payloads and REST calls for the chat and file
//!   search endpoints.
//! - [`auth`] manages the Google session token in the system keyring and the
//!   status/profile/logout surface around it.
//! - [`commands`] implements slash-command parsing used by the chat loop.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which dispatches into [`ui::chat_loop`] for
//! interactive sessions.

pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod core;
pub mod logging;
pub mod ui;
pub mod utils;
