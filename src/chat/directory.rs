//! Known-author directory.
//!
//! A read-only, non-authoritative projection of who participates in the
//! chat. Deliberately independent of the log store: deployments plug in
//! whatever source of names they have.

use std::collections::BTreeSet;

/// Read-only author listing.
pub trait Directory: Send + Sync + 'static {
    /// Deduplicated set of known author names, sorted.
    fn known_authors(&self) -> BTreeSet<String>;
}

/// Directory over a fixed set of names, supplied at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    names: BTreeSet<String>,
}

impl StaticDirectory {
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        StaticDirectory {
            names: names.into_iter().filter(|n| !n.trim().is_empty()).collect(),
        }
    }
}

impl Directory for StaticDirectory {
    fn known_authors(&self) -> BTreeSet<String> {
        self.names.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_directory_dedupes_and_sorts() {
        let dir = StaticDirectory::new(
            ["bob", "alice", "bob", "carol"].map(String::from),
        );
        let names: Vec<String> = dir.known_authors().into_iter().collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_static_directory_drops_blank_names() {
        let dir = StaticDirectory::new(["", "  ", "dave"].map(String::from));
        assert_eq!(dir.known_authors().len(), 1);
    }
}
