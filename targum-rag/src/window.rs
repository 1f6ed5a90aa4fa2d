//! Context window extraction around a matched unit.
//!
//! Two policies are supported:
//!
//! - [`WindowPolicy::Positional`]: the best unit plus one neighbour on each
//!   side, joined by blank lines
//! - [`WindowPolicy::Keyword`]: the first unit containing the literal query,
//!   widened by `radius` units each way and joined by single spaces, falling
//!   back to the opening units of the document

use serde::{Deserialize, Serialize};

/// Default number of units taken on each side of a keyword hit.
pub const DEFAULT_KEYWORD_RADIUS: usize = 2;

/// Default number of leading units returned when the query text is not found.
pub const DEFAULT_FALLBACK_UNITS: usize = 4;

/// How the answer passage is cut from the matched document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum WindowPolicy {
    /// One unit before and one after the best unit.
    #[default]
    Positional,
    /// A lexical scan for the query text, independent of the vector match.
    Keyword {
        /// Units taken on each side of the lexical hit.
        radius: usize,
        /// Leading units returned when no unit contains the query.
        fallback_units: usize,
    },
}

impl WindowPolicy {
    /// The keyword policy with default radius and fallback.
    pub fn keyword() -> Self {
        WindowPolicy::Keyword {
            radius: DEFAULT_KEYWORD_RADIUS,
            fallback_units: DEFAULT_FALLBACK_UNITS,
        }
    }

    /// Cut a window from `units` for a best match at `position` and the raw `query`.
    pub fn extract<S: AsRef<str>>(
        &self,
        units: &[S],
        position: usize,
        query: &str,
    ) -> ContextWindow {
        match *self {
            WindowPolicy::Positional => positional_window(units, position),
            WindowPolicy::Keyword { radius, fallback_units } => {
                keyword_window(units, query, radius, fallback_units)
            }
        }
    }
}

/// A contiguous, order-preserving span of units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    /// First unit included.
    pub start: usize,
    /// One past the last unit included.
    pub end: usize,
    /// The joined unit texts.
    pub text: String,
}

impl ContextWindow {
    fn from_range<S: AsRef<str>>(units: &[S], start: usize, end: usize, separator: &str) -> Self {
        let text =
            units[start..end].iter().map(|u| u.as_ref()).collect::<Vec<&str>>().join(separator);
        Self { start, end, text }
    }
}

/// Units `[idx - 1, idx + 2)` clamped to the document, joined by a blank line.
pub fn positional_window<S: AsRef<str>>(units: &[S], idx: usize) -> ContextWindow {
    let len = units.len();
    let idx = idx.min(len.saturating_sub(1));
    let start = idx.saturating_sub(1);
    let end = (idx + 2).min(len);
    ContextWindow::from_range(units, start, end, "\n\n")
}

/// Units around the first one containing `query` (case-insensitive), joined by spaces.
///
/// When no unit contains the query, the first `fallback_units` units are returned.
pub fn keyword_window<S: AsRef<str>>(
    units: &[S],
    query: &str,
    radius: usize,
    fallback_units: usize,
) -> ContextWindow {
    let len = units.len();
    let needle = query.to_lowercase();
    let hit = if needle.trim().is_empty() {
        None
    } else {
        units.iter().position(|u| u.as_ref().to_lowercase().contains(&needle))
    };

    match hit {
        Some(i) => {
            let start = i.saturating_sub(radius);
            let end = i.saturating_add(radius).saturating_add(1).min(len);
            ContextWindow::from_range(units, start, end, " ")
        }
        None => ContextWindow::from_range(units, 0, fallback_units.min(len), " "),
    }
}
