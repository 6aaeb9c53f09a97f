mod render;
mod types;

use error_set::error_set;
use pg_query::protobuf::KeywordKind;

error_set! {
    ExprError := {
        #[display("Operand index {index} out of range ({count} operands)")]
        IndexOutOfRange { index: usize, count: usize },
        #[display("Expected {expected} node, found {found}")]
        StructuralMismatch {
            expected: &'static str,
            found: &'static str,
        },
    }
}

pub trait Deparse {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String;
}

/// Whether an identifier must be double-quoted to survive re-parsing unchanged.
pub fn identifier_needs_quotes(id: &str) -> bool {
    let plain = match id.as_bytes() {
        [] => false,
        [first, rest @ ..] => {
            (first.is_ascii_lowercase() || *first == b'_')
                && rest
                    .iter()
                    .all(|&b| b == b'_' || b.is_ascii_lowercase() || b.is_ascii_digit())
        }
    };

    !plain || identifier_is_keyword(id)
}

/// Only unreserved keywords can stand as bare identifiers.
fn identifier_is_keyword(id: &str) -> bool {
    let Ok(scan) = pg_query::scan(id) else {
        return true;
    };

    match scan.tokens.as_slice() {
        [token] => !matches!(
            token.keyword_kind(),
            KeywordKind::NoKeyword | KeywordKind::UnreservedKeyword
        ),
        _ => true,
    }
}

impl Deparse for String {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        self.as_str().deparse(buf)
    }
}

impl Deparse for &str {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        match identifier_needs_quotes(self) {
            true => {
                buf.push('"');
                buf.push_str(&self.replace('"', "\"\""));
                buf.push('"');
            }
            false => buf.push_str(self),
        };

        buf
    }
}

// Re-export everything public from submodules
pub use render::*;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_identifiers_unquoted() {
        assert!(!identifier_needs_quotes("large_table"));
        assert!(!identifier_needs_quotes("_tmp1"));
        assert!(!identifier_needs_quotes("date_time3"));
    }

    #[test]
    fn keyword_identifiers() {
        // Unreserved keywords stay bare
        assert!(!identifier_needs_quotes("type"));
        assert!(!identifier_needs_quotes("name"));

        assert!(identifier_needs_quotes("order"));
        assert!(identifier_needs_quotes("user"));
        assert!(identifier_needs_quotes("select"));
        assert!(identifier_needs_quotes("left"));

        let mut buf = String::new();
        "order".deparse(&mut buf);
        assert_eq!(buf, "\"order\"");
    }

    #[test]
    fn unusual_identifiers_quoted() {
        assert!(identifier_needs_quotes(""));
        assert!(identifier_needs_quotes("MyTable"));
        assert!(identifier_needs_quotes("1abc"));
        assert!(identifier_needs_quotes("with space"));

        let mut buf = String::new();
        "Odd\"Name".deparse(&mut buf);
        assert_eq!(buf, "\"Odd\"\"Name\"");
    }
}
