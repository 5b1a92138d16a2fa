//! Ordering and search helpers shared by the manager queries.

use sea_orm::{Order, sea_query::LikeExpr};
use serde::{Deserialize, Serialize};

/// Direction of a query ordering
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

impl From<SortDirection> for Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Ascending => Self::Asc,
            SortDirection::Descending => Self::Desc,
        }
    }
}

/// Normalizes a free-text search term, `None` when there is nothing to search for.
#[must_use]
pub fn search_term(term: Option<&str>) -> Option<&str> {
    term.map(str::trim).filter(|t| !t.is_empty())
}

/// Escape character used in `LIKE` patterns built from user input
const LIKE_ESCAPE: char = '\\';

/// Escapes `LIKE` wildcards so every character of `term` matches itself.
#[must_use]
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// `LIKE` expression matching values that contain `term` as a plain substring.
#[must_use]
pub fn contains_pattern(term: &str) -> LikeExpr {
    LikeExpr::new(format!("%{}%", escape_like(term))).escape(LIKE_ESCAPE)
}
