//! Text preprocessing applied to raw WHERE clauses before parsing.

use std::borrow::Cow;

const JDBC_ESCAPE_KEYWORDS: [&str; 3] = ["d", "t", "ts"];

/// Strip JDBC date/time escapes down to the quoted literal they wrap.
///
/// `{d '2010-01-01'}`, `{t '12:00:00'}` and `{ts '2010-01-01 12:00:00'}` (keyword
/// case-insensitive) become `'2010-01-01'` and so on. Braces inside string
/// literals, and brace sequences that are not a complete escape, pass through
/// unchanged. Borrows when there is nothing to strip.
pub fn jdbc_escapes_strip(text: &str) -> Cow<'_, str> {
    if !text.contains('{') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut in_literal = false;
    let mut stripped = false;

    loop {
        if !in_literal && let Some((literal, remaining)) = jdbc_escape_match(rest) {
            out.push_str(literal);
            rest = remaining;
            stripped = true;
            continue;
        }

        let mut chars = rest.chars();
        let Some(c) = chars.next() else {
            break;
        };
        if c == '\'' {
            in_literal = !in_literal;
        }
        out.push(c);
        rest = chars.as_str();
    }

    if stripped {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(text)
    }
}

/// Match an escape at the start of `text`, returning the inner literal and the
/// text following the closing brace.
fn jdbc_escape_match(text: &str) -> Option<(&str, &str)> {
    let body = text.strip_prefix('{')?.trim_start();

    let keyword_len = body.find(|c: char| !c.is_ascii_alphabetic())?;
    let (keyword, after_keyword) = body.split_at(keyword_len);
    if !JDBC_ESCAPE_KEYWORDS
        .iter()
        .any(|k| keyword.eq_ignore_ascii_case(k))
    {
        return None;
    }

    // `{d'...'}` is not an escape
    let literal_start = after_keyword.trim_start();
    if literal_start.len() == after_keyword.len() {
        return None;
    }

    let literal_len = quoted_literal_len(literal_start)?;
    let (literal, after_literal) = literal_start.split_at(literal_len);
    let remaining = after_literal.trim_start().strip_prefix('}')?;

    Some((literal, remaining))
}

/// Byte length of the single-quoted literal at the start of `text`, quotes
/// included. Doubled quotes are part of the literal.
fn quoted_literal_len(text: &str) -> Option<usize> {
    let body = text.strip_prefix('\'')?;
    let mut chars = body.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c == '\'' && chars.next_if(|&(_, next)| next == '\'').is_none() {
            return Some(i + 2);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn no_braces_borrows() {
        let text = "a.x = 1 AND a.y = 'z'";
        assert!(matches!(jdbc_escapes_strip(text), Cow::Borrowed(t) if t == text));
    }

    #[test]
    fn date_escape_stripped() {
        assert_eq!(
            jdbc_escapes_strip("t.d BETWEEN {d '2010-01-01'} AND {d '2017-01-01'}"),
            "t.d BETWEEN '2010-01-01' AND '2017-01-01'"
        );
    }

    #[test]
    fn keyword_case_and_spacing() {
        assert_eq!(
            jdbc_escapes_strip("t.ts >= { TS  '2010-01-01 10:00:00' }"),
            "t.ts >= '2010-01-01 10:00:00'"
        );
        assert_eq!(jdbc_escapes_strip("t.c = {T '12:30:00'}"), "t.c = '12:30:00'");
    }

    #[test]
    fn escaped_quote_inside_literal() {
        assert_eq!(jdbc_escapes_strip("x = {d 'it''s'}"), "x = 'it''s'");
    }

    #[test]
    fn braces_inside_string_literal_untouched() {
        let text = "x = '{d ''2010-01-01''}' AND y = 1";
        assert_eq!(jdbc_escapes_strip(text), text);
    }

    #[test]
    fn other_braces_untouched() {
        for text in [
            "x = {fn now()}",
            "x = {d'2010-01-01'}",
            "x = {d '2010-01-01'",
            "x = {date '2010-01-01'}",
            "x = {",
        ] {
            let stripped = jdbc_escapes_strip(text);
            assert_eq!(stripped, text);
            assert!(matches!(stripped, Cow::Borrowed(_)));
        }
    }

    #[test]
    fn escape_after_string_literal() {
        assert_eq!(
            jdbc_escapes_strip("a = 'x' AND b < {d '2020-02-02'}"),
            "a = 'x' AND b < '2020-02-02'"
        );
    }
}
