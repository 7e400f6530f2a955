//! Read-only SQL guard.
//!
//! A [`ReadOnlyStatement`] can only be built from a single SELECT statement
//! that contains no data- or schema-modifying keyword outside of quoted
//! literals and comments, and calls no function with side effects.

use crate::error::StatementError;
use serde::Serialize;
use serde_json::Value as JsonValue;

const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "TRUNCATE", "GRANT", "REVOKE",
    "MERGE", "COPY", "CALL", "INTO", "EXECUTE", "VACUUM", "LOCK",
];

/// Functions that change sequences, settings or large objects.
const FORBIDDEN_FUNCTIONS: &[&str] = &["SETVAL", "NEXTVAL", "SET_CONFIG", "LOWRITE"];

/// Server administration, large-object and remote-query function families.
const FORBIDDEN_FUNCTION_PREFIXES: &[&str] = &["PG_", "LO_", "DBLINK"];

/// A parameterised statement that has passed the read-only guard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadOnlyStatement {
    sql: String,
    params: Vec<JsonValue>,
}

impl ReadOnlyStatement {
    /// Validates `sql` and binds `params` (`%s` placeholders).
    ///
    /// # Errors
    ///
    /// Returns a `StatementError` if the statement is not a single read.
    pub fn new(sql: impl Into<String>, params: Vec<JsonValue>) -> Result<Self, StatementError> {
        let sql = sql.into();
        check_read_only(&sql)?;
        Ok(Self { sql, params })
    }

    /// The statement text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bound parameters, in placeholder order.
    #[must_use]
    pub fn params(&self) -> &[JsonValue] {
        &self.params
    }
}

fn check_read_only(sql: &str) -> Result<(), StatementError> {
    let code = strip_literals_and_comments(sql)?;
    let code = code.trim_end();
    let code = code.strip_suffix(';').unwrap_or(code);
    if code.contains(';') {
        return Err(StatementError::MultipleStatements);
    }

    let mut words = tokens(code);
    let leading = words.next().ok_or(StatementError::Empty)?;
    if leading.quoted || leading.text != "SELECT" {
        return Err(StatementError::NotARead {
            leading: leading.text,
        });
    }

    for word in words {
        if !word.quoted && FORBIDDEN_KEYWORDS.contains(&word.text.as_str()) {
            return Err(StatementError::ForbiddenKeyword { keyword: word.text });
        }
        if word.is_call
            && (FORBIDDEN_FUNCTIONS.contains(&word.text.as_str())
                || FORBIDDEN_FUNCTION_PREFIXES
                    .iter()
                    .any(|prefix| word.text.starts_with(prefix)))
        {
            return Err(StatementError::ForbiddenFunction { name: word.text });
        }
    }
    Ok(())
}

/// An upper-cased identifier or keyword.
struct Word {
    text: String,
    /// Written as a `"quoted"` identifier.
    quoted: bool,
    /// Followed by an opening parenthesis.
    is_call: bool,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn tokens(code: &str) -> impl Iterator<Item = Word> + '_ {
    let mut rest = code;
    std::iter::from_fn(move || {
        let start = rest.find(|c: char| is_word_char(c) || c == '"')?;
        let tail = &rest[start..];
        let (text, quoted) = if let Some(inner) = tail.strip_prefix('"') {
            let end = inner.find('"').unwrap_or(inner.len());
            rest = inner.get(end + 1..).unwrap_or("");
            (&inner[..end], true)
        } else {
            let end = tail.find(|c: char| !is_word_char(c)).unwrap_or(tail.len());
            rest = &tail[end..];
            (&tail[..end], false)
        };
        Some(Word {
            text: text.to_ascii_uppercase(),
            quoted,
            is_call: rest.trim_start().starts_with('('),
        })
    })
}

/// Replaces quoted literals and comments with spaces.
///
/// Quoted identifiers are kept as `"name"`, with characters outside
/// `[A-Za-z0-9_]` replaced by `_`, so a quoted function name is still
/// checked.
fn strip_literals_and_comments(sql: &str) -> Result<String, StatementError> {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                let quote = c;
                out.push(' ');
                if quote == '"' {
                    out.push('"');
                }
                loop {
                    match chars.next() {
                        Some(q) if q == quote => {
                            // Doubled quote is an escaped quote.
                            if chars.peek() == Some(&quote) {
                                chars.next();
                            } else {
                                break;
                            }
                        }
                        Some(inner) if quote == '"' => {
                            out.push(if is_word_char(inner) { inner } else { '_' });
                        }
                        Some(_) => {}
                        None => return Err(StatementError::Unterminated),
                    }
                }
                if quote == '"' {
                    out.push('"');
                }
                out.push(' ');
            }
            '-' if chars.peek() == Some(&'-') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
                out.push(' ');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                loop {
                    match chars.next() {
                        Some('/') if prev == '*' => break,
                        Some(next) => prev = next,
                        None => return Err(StatementError::Unterminated),
                    }
                }
                out.push(' ');
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_plain_select() {
        let stmt = ReadOnlyStatement::new(
            "SELECT id, name FROM providers WHERE specialty_id = %s;",
            vec![json!(2)],
        )
        .expect("should accept");
        assert_eq!(stmt.params(), &[json!(2)]);
    }

    #[test]
    fn accepts_columns_containing_keywords() {
        let sql = "SELECT updated_at, created_by, pg_note FROM appointments";
        assert!(ReadOnlyStatement::new(sql, vec![]).is_ok());
    }

    #[test]
    fn accepts_harmless_functions() {
        let sql = "SELECT count(*), lower(name), coalesce(notes, '') FROM patients";
        assert!(ReadOnlyStatement::new(sql, vec![]).is_ok());
    }

    #[test]
    fn rejects_with_clause() {
        let err = ReadOnlyStatement::new(
            "WITH recent AS (SELECT * FROM appointments) SELECT * FROM recent",
            vec![],
        )
        .unwrap_err();
        assert_eq!(
            err,
            StatementError::NotARead {
                leading: "WITH".to_string()
            }
        );
    }

    #[test]
    fn rejects_sequence_functions() {
        for (sql, name) in [
            ("SELECT setval('appointments_id_seq', 1)", "SETVAL"),
            ("SELECT nextval('appointments_id_seq')", "NEXTVAL"),
            ("select set_config('search_path', 'x', false)", "SET_CONFIG"),
        ] {
            assert_eq!(
                ReadOnlyStatement::new(sql, vec![]).unwrap_err(),
                StatementError::ForbiddenFunction {
                    name: name.to_string()
                },
                "{sql}"
            );
        }
    }

    #[test]
    fn rejects_admin_large_object_and_remote_functions() {
        for (sql, name) in [
            ("SELECT pg_terminate_backend(42)", "PG_TERMINATE_BACKEND"),
            ("SELECT pg_cancel_backend (42)", "PG_CANCEL_BACKEND"),
            ("SELECT lo_unlink(1234)", "LO_UNLINK"),
            ("SELECT lowrite(0, 'x')", "LOWRITE"),
            ("SELECT * FROM dblink('host=x', 'select 1') AS t(a int)", "DBLINK"),
            ("SELECT pg_catalog.setval('s', 1)", "SETVAL"),
            ("SELECT \"setval\"('s', 1)", "SETVAL"),
        ] {
            assert_eq!(
                ReadOnlyStatement::new(sql, vec![]).unwrap_err(),
                StatementError::ForbiddenFunction {
                    name: name.to_string()
                },
                "{sql}"
            );
        }
    }

    #[test]
    fn keywords_inside_literals_are_ignored() {
        let sql = "SELECT * FROM appointments WHERE notes = 'please delete; drop it'";
        assert!(ReadOnlyStatement::new(sql, vec![]).is_ok());
    }

    #[test]
    fn quoted_identifiers_are_not_keywords() {
        let sql = r#"SELECT "update", "Created By" FROM "audit log""#;
        assert!(ReadOnlyStatement::new(sql, vec![]).is_ok());
    }

    #[test]
    fn rejects_delete() {
        let err = ReadOnlyStatement::new("DELETE FROM appointments", vec![]).unwrap_err();
        assert_eq!(
            err,
            StatementError::NotARead {
                leading: "DELETE".to_string()
            }
        );
    }

    #[test]
    fn rejects_stacked_statements() {
        let err =
            ReadOnlyStatement::new("SELECT 1; DELETE FROM appointments", vec![]).unwrap_err();
        assert_eq!(err, StatementError::MultipleStatements);
    }

    #[test]
    fn rejects_modifying_subquery_and_select_into() {
        let err = ReadOnlyStatement::new(
            "SELECT * FROM (DELETE FROM appointments RETURNING *) AS gone",
            vec![],
        )
        .unwrap_err();
        assert_eq!(
            err,
            StatementError::ForbiddenKeyword {
                keyword: "DELETE".to_string()
            }
        );

        let err = ReadOnlyStatement::new("select * into backup from patients", vec![]).unwrap_err();
        assert_eq!(
            err,
            StatementError::ForbiddenKeyword {
                keyword: "INTO".to_string()
            }
        );
    }

    #[test]
    fn comments_cannot_hide_a_second_statement_marker() {
        assert!(ReadOnlyStatement::new("SELECT 1 -- ; DROP TABLE patients", vec![]).is_ok());
        assert!(ReadOnlyStatement::new("/* note */ SELECT 1", vec![]).is_ok());
        assert_eq!(
            ReadOnlyStatement::new("SELECT 1 /* unterminated", vec![]).unwrap_err(),
            StatementError::Unterminated
        );
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(
            ReadOnlyStatement::new("  -- nothing\n", vec![]).unwrap_err(),
            StatementError::Empty
        );
    }
}
