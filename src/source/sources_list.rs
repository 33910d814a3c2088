//! The `sources.list` registry of configured package sources.
//!
//! Line-oriented: blank lines and `#` comments are ignored; every other
//! line is either `<url-or-path>` or `<name><TAB><url-or-path>`. Order is
//! significant - resolution walks sources top to bottom.

use std::fmt;

/// Seed contents written when a store is initialized.
pub const DEFAULT_SOURCES_LIST: &str = "\
# paku source list
#
# # example with name:
# Name of Source\thttps://feed.example.com/
#
# # example without name:
# https://feed.example.com/
#
";

/// What kind of source a target points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Remote paged catalog feed (http/https).
    Feed,
    /// Local directory of archives.
    Directory,
}

impl SourceKind {
    /// Classify a target string: URL schemes mean a feed, anything else a
    /// local directory.
    pub fn of_target(target: &str) -> Self {
        if target.starts_with("http://") || target.starts_with("https://") {
            SourceKind::Feed
        } else {
            SourceKind::Directory
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Feed => write!(f, "feed"),
            SourceKind::Directory => write!(f, "directory"),
        }
    }
}

/// One configured source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub name: Option<String>,
    pub target: String,
    pub kind: SourceKind,
}

impl SourceEntry {
    fn from_target(name: Option<String>, target: &str) -> Self {
        let kind = SourceKind::of_target(target);
        SourceEntry {
            name,
            target: target.to_string(),
            kind,
        }
    }
}

/// Parse a `sources.list` document into ordered entries.
pub fn parse_sources_list(text: &str) -> Vec<SourceEntry> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(|line| match line.split_once('\t') {
            Some((name, target)) => {
                SourceEntry::from_target(Some(name.trim().to_string()), target.trim())
            }
            None => SourceEntry::from_target(None, line.trim()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_list_has_no_active_entries() {
        assert!(parse_sources_list(DEFAULT_SOURCES_LIST).is_empty());
    }

    #[test]
    fn test_parse_named_and_unnamed_entries() {
        let text = "\
# comment

Main Feed\thttps://feed.example.com/
/var/archives
https://other.example.com/
";
        let entries = parse_sources_list(text);
        assert_eq!(entries.len(), 3);

        assert_eq!(entries[0].name.as_deref(), Some("Main Feed"));
        assert_eq!(entries[0].target, "https://feed.example.com/");
        assert_eq!(entries[0].kind, SourceKind::Feed);

        assert_eq!(entries[1].name, None);
        assert_eq!(entries[1].target, "/var/archives");
        assert_eq!(entries[1].kind, SourceKind::Directory);

        assert_eq!(entries[2].kind, SourceKind::Feed);
    }

    #[test]
    fn test_order_is_preserved() {
        let entries = parse_sources_list("/first\n/second\n/third\n");
        let targets: Vec<&str> = entries.iter().map(|e| e.target.as_str()).collect();
        assert_eq!(targets, ["/first", "/second", "/third"]);
    }
}
