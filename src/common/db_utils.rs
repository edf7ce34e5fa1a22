// src/common/db_utils.rs

use crate::common::error::AppError;

/// Turns a unique-constraint violation into a `Conflict` carrying `message`;
/// every other database error passes through untouched.
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return AppError::Conflict(message.to_string());
        }
    }
    AppError::DatabaseError(e)
}

/// Escapes `%`, `_` and `\` so user text can sit inside an ILIKE pattern.
pub(crate) fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Lowercase, dash-separated slug used for beats and genres.
pub(crate) fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.trim().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators_and_drops_symbols() {
        assert_eq!(slugify("  Dark Trap -- Vibes!! "), "dark-trap-vibes");
        assert_eq!(slugify("Lo_Fi Beat #3"), "lo-fi-beat-3");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("100%_real\\"), "100\\%\\_real\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn non_unique_errors_are_not_conflicts() {
        let err = conflict_on_unique(sqlx::Error::RowNotFound, "dup");
        assert!(matches!(err, AppError::DatabaseError(_)));
    }
}
