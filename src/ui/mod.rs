//! ui
//!
//! Output formatting and display. All user-facing output goes through
//! [`output`] so that `--quiet`, `--debug` and `--json` behave the same in
//! every command.

pub mod output;
