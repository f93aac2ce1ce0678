//! Line commands accepted on stdin while `quotesync watch` runs.
//!
//! `watch` keeps the database open for its whole lifetime, so other
//! `quotesync` processes cannot reach it. Edits made during a watch go
//! through these commands instead and land on the same shared store the
//! scheduler merges into.
//!
//!   add <text> | <category>   validated add
//!   import <file>             replace the list from a JSON file
//!   list [<category>|all]     print quotes (default: saved filter)
//!   sync                      queue a sync cycle
//!   push                      send the local list to the remote
//!   help                      print this list
//!   quit                      stop watching

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::quote::{CategoryFilter, QuoteDraft};
use crate::sync::SharedStore;

pub const HELP: &str = "\
Commands:
  add <text> | <category>   add a quote
  import <file>             replace all quotes from a JSON file
  list [<category>|all]     show quotes
  sync                      sync now
  push                      send quotes to the remote
  quit                      stop watching";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Add(QuoteDraft),
    Import(PathBuf),
    List(Option<CategoryFilter>),
    Sync,
    Push,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "add" => {
                // Category goes after the last '|' so quote text may contain one
                let (text, category) = rest.rsplit_once('|').unwrap_or((rest, ""));
                Self::Add(QuoteDraft::new(text.trim(), category.trim()))
            }
            "import" => {
                if rest.is_empty() {
                    bail!("usage: import <file>");
                }
                Self::Import(PathBuf::from(rest))
            }
            "list" => Self::List(if rest.is_empty() {
                None
            } else {
                rest.parse::<CategoryFilter>().ok()
            }),
            "sync" => Self::Sync,
            "push" => Self::Push,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => bail!("unknown command '{}', type 'help' for a list", other),
        };
        Ok(Some(command))
    }

    /// Whether a successful run of this command changes the quote list.
    pub fn edits_quotes(&self) -> bool {
        matches!(self, Self::Add(_) | Self::Import(_))
    }
}

/// Apply a store command and return the text to show the user.
///
/// `Sync`, `Push`, `Help` and `Quit` drive the scheduler or the loop itself
/// and are left to the caller.
pub async fn apply(command: &ConsoleCommand, store: &SharedStore) -> Result<String> {
    match command {
        ConsoleCommand::Add(draft) => {
            let quote = store.lock().await.add(draft.clone())?;
            Ok(format!("New quote added successfully: {}", quote))
        }
        ConsoleCommand::Import(path) => {
            let contents = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let count = store.lock().await.import_json(&contents)?;
            Ok(format!("Quotes imported successfully ({} quotes).", count))
        }
        ConsoleCommand::List(filter) => {
            let store = store.lock().await;
            let filter = filter.clone().unwrap_or_else(|| store.selected_category());
            let shown = store.filter(&filter);
            if shown.is_empty() {
                return Ok("No quotes available.".to_string());
            }
            Ok(shown
                .iter()
                .map(|q| q.to_string())
                .collect::<Vec<_>>()
                .join("\n"))
        }
        ConsoleCommand::Help => Ok(HELP.to_string()),
        ConsoleCommand::Sync | ConsoleCommand::Push | ConsoleCommand::Quit => {
            bail!("'{:?}' is handled by the watch loop", command)
        }
    }
}
