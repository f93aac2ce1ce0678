//! Reconciliation of the local quote list with a fetched remote list.
//!
//! Quotes are keyed by `text`. Remote records are laid down first and local
//! ones after them, keeping the first occurrence of every text, so the
//! remote side wins every collision. Nothing here does I/O or mutates its
//! inputs.

use std::collections::{HashMap, HashSet};

use crate::quote::Quote;

/// A text present on both sides with differing categories. The remote
/// category is the one kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub text: String,
    pub local_category: String,
    pub remote_category: String,
}

/// Outcome of [`reconcile`]: the merged list plus what happened to get there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub merged: Vec<Quote>,
    /// Texts that exist remotely but were not in the local list.
    pub added: Vec<String>,
    /// Local categories overwritten by the remote record with the same text.
    pub conflicts: Vec<Conflict>,
    /// Local entries dropped because an earlier record had the same text.
    pub collapsed: usize,
    changed: bool,
}

impl MergeReport {
    /// Whether the merged list differs from the local list it started from.
    pub fn changed(&self) -> bool {
        self.changed
    }
}

/// Combine two lists, remote first, deduplicated by text.
pub fn merge(local: &[Quote], remote: &[Quote]) -> Vec<Quote> {
    let mut seen = HashSet::new();
    remote
        .iter()
        .chain(local.iter())
        .filter(|q| seen.insert(q.text.as_str()))
        .cloned()
        .collect()
}

/// [`merge`], plus a report of additions and overwritten categories.
pub fn reconcile(local: &[Quote], remote: &[Quote]) -> MergeReport {
    let merged = merge(local, remote);

    // First remote occurrence of each text is the one that survives
    let mut remote_by_text: HashMap<&str, &Quote> = HashMap::new();
    for quote in remote {
        remote_by_text.entry(quote.text.as_str()).or_insert(quote);
    }
    let local_texts: HashSet<&str> = local.iter().map(|q| q.text.as_str()).collect();

    let mut added = Vec::new();
    let mut seen_remote = HashSet::new();
    for quote in remote {
        if seen_remote.insert(quote.text.as_str()) && !local_texts.contains(quote.text.as_str()) {
            added.push(quote.text.clone());
        }
    }

    // One entry per text, against the local occurrence that would have survived
    let mut seen_local = HashSet::new();
    let conflicts = local
        .iter()
        .filter(|l| seen_local.insert(l.text.as_str()))
        .filter_map(|l| {
            let r = remote_by_text.get(l.text.as_str())?;
            (r.category != l.category).then(|| Conflict {
                text: l.text.clone(),
                local_category: l.category.clone(),
                remote_category: r.category.clone(),
            })
        })
        .collect();

    let surviving_local = merged.len() - remote_by_text.len();
    let collapsed = local.len() - surviving_local;
    let changed = merged.as_slice() != local;

    MergeReport {
        merged,
        added,
        conflicts,
        collapsed,
        changed,
    }
}
