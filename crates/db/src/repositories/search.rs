//! Case-insensitive substring search shared by the list queries.

use sea_orm::sea_query::{Expr, Func, IntoColumnRef, SimpleExpr};

/// Turns a user search term into a `LIKE` pattern; blank terms disable the search.
///
/// The term is lowercased and its wildcards are escaped with `\`, the
/// `PostgreSQL` default escape character.
pub(crate) fn like_pattern(q: Option<&str>) -> Option<String> {
    let q = q?.trim();
    if q.is_empty() {
        return None;
    }
    let escaped = q
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}

/// `LOWER(column) LIKE pattern`.
pub(crate) fn lower_like(column: impl IntoColumnRef, pattern: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(pattern)
}
