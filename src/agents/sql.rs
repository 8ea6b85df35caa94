//! Sanitization of generated SQL before it reaches the data gateway.
//!
//! Generated text is untrusted: it may carry Markdown fences, a label, several statements
//! or a broken LIMIT clause. [`sanitize_sql`] reduces it to one statement with no trailing
//! separator and a numeric LIMIT. Comments are dropped before statements are split, so a
//! quote inside a comment cannot hide a separator. String literals are never altered.

use regex::Regex;
use std::sync::LazyLock;

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:sql\s+query|sqlite|sql)\s*:\s*").expect("valid label regex")
});
static LIMIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bLIMIT\b\s*(?P<value>[^\s()]*)").expect("valid limit regex")
});
static LIMIT_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(,\d*)?$").expect("valid limit value regex"));

/// Reduce generated text to a single executable statement.
pub fn sanitize_sql(raw: &str, row_cap: u32) -> String {
    let unfenced = strip_fences(raw);
    let unlabeled = LABEL_RE.replace(unfenced.trim(), "");

    let statement = split_statements(&unlabeled)
        .into_iter()
        .next()
        .unwrap_or_default();
    let statement = statement
        .trim()
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace());

    normalize_limit(statement, row_cap).trim().to_string()
}

/// Lexical class of one character of SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Code,
    /// Opening or closing quote character.
    Delimiter,
    /// Inside a string literal or quoted identifier.
    Quoted,
    /// Inside a `--` or `/* */` comment, markers included.
    Comment,
}

/// Classify every character. A `--` comment ends at the newline, which is code again; an
/// unterminated `/*` runs to the end. Comment text never opens or closes a quote.
fn lex(sql: &str) -> Vec<(char, Segment)> {
    #[derive(Clone, Copy)]
    enum State {
        Code,
        Quote(char),
        LineComment,
        BlockComment,
    }

    let mut out = Vec::with_capacity(sql.len());
    let mut state = State::Code;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '\'' | '"' | '`' => {
                    state = State::Quote(c);
                    out.push((c, Segment::Delimiter));
                }
                '-' if chars.peek() == Some(&'-') => {
                    state = State::LineComment;
                    out.push((c, Segment::Comment));
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = State::BlockComment;
                    out.push((c, Segment::Comment));
                    out.push(('*', Segment::Comment));
                }
                _ => out.push((c, Segment::Code)),
            },
            State::Quote(q) => {
                if c == q {
                    state = State::Code;
                    out.push((c, Segment::Delimiter));
                } else {
                    out.push((c, Segment::Quoted));
                }
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                    out.push((c, Segment::Code));
                } else {
                    out.push((c, Segment::Comment));
                }
            }
            State::BlockComment => {
                out.push((c, Segment::Comment));
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Code;
                    out.push(('/', Segment::Comment));
                }
            }
        }
    }

    out
}

/// Remove comments, leaving one space where each stood so tokens stay apart.
pub fn strip_comments(sql: &str) -> String {
    let mut stripped = String::with_capacity(sql.len());
    let mut in_comment = false;

    for (c, segment) in lex(sql) {
        if segment == Segment::Comment {
            if !in_comment {
                stripped.push(' ');
            }
            in_comment = true;
        } else {
            in_comment = false;
            stripped.push(c);
        }
    }

    stripped
}

/// Split on statement separators that sit outside string literals, quoted identifiers and
/// comments. Comments are dropped and blank statements are skipped.
pub fn split_statements(sql: &str) -> Vec<String> {
    let stripped = strip_comments(sql);
    let mut statements = Vec::new();
    let mut current = String::new();

    for (c, segment) in lex(&stripped) {
        if c == ';' && segment == Segment::Code {
            if !current.trim().is_empty() {
                statements.push(current.trim().to_string());
            }
            current.clear();
        } else {
            current.push(c);
        }
    }

    if !current.trim().is_empty() {
        statements.push(current.trim().to_string());
    }

    statements
}

fn strip_fences(raw: &str) -> String {
    if !raw.contains("```") {
        return raw.to_string();
    }

    let inner = raw.split("```").nth(1).unwrap_or_default();
    let mut lines = inner.lines();
    let first = lines.clone().next().unwrap_or_default().trim().to_lowercase();
    if first.is_empty() || first == "sql" || first == "sqlite" {
        lines.next();
    }
    lines.collect::<Vec<_>>().join("\n")
}

/// Byte-for-byte copy where quoted text becomes `x` and comment text becomes spaces, so
/// keyword searches only see code while offsets stay aligned with the original.
fn mask_quoted(sql: &str) -> String {
    let mut masked = String::with_capacity(sql.len());

    for (c, segment) in lex(sql) {
        match segment {
            Segment::Code | Segment::Delimiter => masked.push(c),
            Segment::Quoted => masked.extend(std::iter::repeat('x').take(c.len_utf8())),
            Segment::Comment => masked.extend(std::iter::repeat(' ').take(c.len_utf8())),
        }
    }

    masked
}

fn normalize_limit(statement: &str, row_cap: u32) -> String {
    let masked = mask_quoted(statement);
    let mut result = statement.to_string();

    let replacements: Vec<(usize, usize)> = LIMIT_RE
        .captures_iter(&masked)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let value = caps.name("value").map(|m| m.as_str()).unwrap_or_default();
            if LIMIT_VALUE_RE.is_match(value) {
                return None;
            }
            // LIMIT (subquery) is left alone
            if value.is_empty() && masked[whole.end()..].starts_with('(') {
                return None;
            }
            Some((whole.start(), whole.end()))
        })
        .collect();

    for (start, end) in replacements.into_iter().rev() {
        let tail = &result[end..];
        let sep = match tail.chars().next() {
            None | Some(')') => "",
            Some(c) if c.is_whitespace() => "",
            Some(_) => " ",
        };
        result = format!("{}LIMIT {}{}{}", &result[..start], row_cap, sep, tail);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strips_trailing_semicolon() {
        assert_eq!(
            sanitize_sql("SELECT * FROM players LIMIT 10;", 10),
            "SELECT * FROM players LIMIT 10"
        );
    }

    #[test]
    fn test_keeps_only_first_statement() {
        assert_eq!(
            sanitize_sql("SELECT * FROM players; DROP TABLE players;", 10),
            "SELECT * FROM players"
        );
    }

    #[test]
    fn test_separator_inside_literal_preserved() {
        assert_eq!(
            sanitize_sql("SELECT * FROM clans WHERE clan_name = 'A;B' LIMIT 5", 10),
            "SELECT * FROM clans WHERE clan_name = 'A;B' LIMIT 5"
        );
    }

    #[test]
    fn test_strips_markdown_fence_and_label() {
        let raw = "```sql\nSELECT username FROM players\n```";
        assert_eq!(sanitize_sql(raw, 10), "SELECT username FROM players");

        let raw = "SQL query: SELECT username FROM players";
        assert_eq!(sanitize_sql(raw, 10), "SELECT username FROM players");
    }

    #[test]
    fn test_normalizes_malformed_limit() {
        assert_eq!(
            sanitize_sql("SELECT * FROM players LIMIT ten", 10),
            "SELECT * FROM players LIMIT 10"
        );
        assert_eq!(
            sanitize_sql("SELECT * FROM players LIMIT", 25),
            "SELECT * FROM players LIMIT 25"
        );
        assert_eq!(
            sanitize_sql("SELECT * FROM players LIMIT -1 OFFSET 2", 10),
            "SELECT * FROM players LIMIT 10 OFFSET 2"
        );
    }

    #[test]
    fn test_valid_limits_untouched() {
        assert_eq!(
            sanitize_sql("SELECT * FROM players LIMIT 3 OFFSET 6", 10),
            "SELECT * FROM players LIMIT 3 OFFSET 6"
        );
        assert_eq!(
            sanitize_sql("SELECT * FROM players LIMIT 5,10", 10),
            "SELECT * FROM players LIMIT 5,10"
        );
    }

    #[test]
    fn test_limit_word_inside_literal_untouched() {
        assert_eq!(
            sanitize_sql("SELECT * FROM items WHERE name = 'No limit here' LIMIT 2", 10),
            "SELECT * FROM items WHERE name = 'No limit here' LIMIT 2"
        );
    }

    #[test]
    fn test_leading_empty_statement_skipped() {
        assert_eq!(sanitize_sql(";; SELECT 1;", 10), "SELECT 1");
    }

    #[test]
    fn test_quote_inside_line_comment_does_not_hide_separator() {
        let raw = "SELECT username FROM players -- look up the player's row\n; DELETE FROM players";
        assert_eq!(sanitize_sql(raw, 10), "SELECT username FROM players");
        assert_eq!(
            split_statements(raw),
            vec!["SELECT username FROM players", "DELETE FROM players"]
        );
    }

    #[test]
    fn test_quote_inside_block_comment_does_not_hide_separator() {
        let raw = "SELECT clan_name FROM clans /* the clan's name */; SELECT * FROM players";
        assert_eq!(sanitize_sql(raw, 10), "SELECT clan_name FROM clans");
    }

    #[test]
    fn test_comment_markers_inside_literal_untouched() {
        let raw = "SELECT * FROM items WHERE name = 'Blade -- of /* Dawn */' LIMIT 2";
        assert_eq!(sanitize_sql(raw, 10), raw);
    }

    #[test]
    fn test_strip_comments() {
        assert_eq!(
            strip_comments("SELECT 1 -- one\nFROM t /* two */ LIMIT 3"),
            "SELECT 1  \nFROM t   LIMIT 3"
        );
        assert_eq!(strip_comments("SELECT 1 /* never closed; DROP"), "SELECT 1  ");
    }

    #[test]
    fn test_limit_inside_comment_ignored() {
        assert_eq!(
            sanitize_sql("SELECT * FROM players /* LIMIT ten */ LIMIT 4", 10),
            "SELECT * FROM players   LIMIT 4"
        );
    }

    #[test]
    fn test_split_statements_respects_quotes() {
        assert_eq!(
            split_statements("SELECT ';'; SELECT \"a;b\"; "),
            vec!["SELECT ';'", "SELECT \"a;b\""]
        );
    }
}
