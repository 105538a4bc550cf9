//! Terminal front end for the Vellum markdown note-taking application.
//!
//! The shell owns the presentation surface and session-local UI state; the
//! document store and markdown engine live in a separate core process
//! reached over the [`ipc`] message channel. The UI is an Elm-style app
//! ([`shell::ShellApp`]) driven by the [`tui`] runtime.

pub mod cli;
pub mod config;
pub mod ipc;
pub mod shell;
pub mod tui;
