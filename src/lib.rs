//! A retro terminal for four local storage folders.
//!
//! The library holds everything below the window: the command language, the
//! folder store, the history log, the web helpers and the session that ties
//! them together. `main.rs` only draws
//! the [`terminal::Terminal`] state and forwards input.

pub mod command;
pub mod config;
pub mod desktop;
pub mod dispatcher;
pub mod error;
pub mod history;
pub mod logging;
pub mod storage;
pub mod terminal;
pub mod web;

pub use command::Command;
pub use config::Config;
pub use dispatcher::{Prompter, Reply, Session};
pub use error::{CommandError, WebError};
pub use storage::{Folder, FolderStore};
