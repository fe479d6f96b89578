//! ui::output
//!
//! Printing helpers shared by every command.
//!
//! # Streams
//!
//! Results go to stdout, diagnostics (`warning:`, `error:`, `[debug]`) go
//! to stderr. `--quiet` silences results and warnings but never errors.
//! JSON is printed whatever the verbosity, since the caller asked for it.

use std::fmt::Display;

use anyhow::Result;
use serde::Serialize;

/// How much the CLI prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    /// Also prints `[debug]` lines
    Debug,
}

impl Verbosity {
    /// `--quiet` wins over `--debug`.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        match (quiet, debug) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Debug,
            (false, false) => Verbosity::Normal,
        }
    }

    fn is_quiet(self) -> bool {
        self == Verbosity::Quiet
    }
}

/// Print a result line to stdout.
pub fn print(message: impl Display, verbosity: Verbosity) {
    if !verbosity.is_quiet() {
        println!("{message}");
    }
}

pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {message}");
    }
}

pub fn error(message: impl Display) {
    eprintln!("error: {message}");
}

pub fn warn(message: impl Display, verbosity: Verbosity) {
    if !verbosity.is_quiet() {
        eprintln!("warning: {message}");
    }
}

/// Print `value` as pretty JSON.
pub fn json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One item per line, each behind `prefix`.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    let lines: Vec<String> = items.iter().map(|item| format!("{prefix}{item}")).collect();
    lines.join("\n")
}

/// A labelled node in a printable tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub label: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }
}

/// Render a tree with box-drawing connectors.
///
/// ```
/// use odma::ui::output::{render_tree, TreeNode};
///
/// let tree = TreeNode {
///     label: "Object".into(),
///     children: vec![TreeNode::leaf("Document"), TreeNode::leaf("Folder")],
/// };
/// assert_eq!(render_tree(&tree), "Object\n├── Document\n└── Folder");
/// ```
pub fn render_tree(root: &TreeNode) -> String {
    let mut lines = vec![root.label.clone()];
    render_children(&root.children, "", &mut lines);
    lines.join("\n")
}

fn render_children(children: &[TreeNode], prefix: &str, lines: &mut Vec<String>) {
    let count = children.len();
    for (position, child) in children.iter().enumerate() {
        let last = position + 1 == count;
        let (connector, extension) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        lines.push(format!("{prefix}{connector}{}", child.label));
        render_children(&child.children, &format!("{prefix}{extension}"), lines);
    }
}
