//! Permissive frontmatter extraction for rule files.
//!
//! A rule file opens with a `---` delimiter line, carries `key: value`
//! metadata lines plus an optional nested `conditions:` list, closes with a
//! second `---` line, and everything after that is the free-text message body.
//!
//! This is deliberately *not* a YAML parser. The grammar is line-oriented and
//! forgiving: unknown top-level keys are kept but ignored by the compiler,
//! unknown nested blocks are skipped, and double-quoted values only unescape
//! `\\` and `\"` so that regex patterns survive round-trips intact.

use std::collections::BTreeMap;

use thiserror::Error;

/// Why a file could not be split into frontmatter and body.
#[derive(Debug, Error, PartialEq)]
pub enum FrontmatterError {
    #[error("file does not start with a '---' frontmatter delimiter")]
    MissingOpeningDelimiter,
    #[error("frontmatter block is never closed by a '---' delimiter")]
    UnterminatedBlock,
}

/// A metadata value with shape-inferred typing.
///
/// Quoted values are always strings; unquoted `true`/`false` become booleans
/// and integer shapes become integers.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Scalar {
    fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(unquoted) = unquote(trimmed) {
            return Self::Str(unquoted);
        }
        match trimmed {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return Self::Int(n);
        }
        Self::Str(trimmed.to_string())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Render the value as text regardless of inferred type. Patterns and
    /// field names are consumed through this so that e.g. `pattern: 403`
    /// still works.
    pub fn to_text(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Str(s) => s.clone(),
        }
    }
}

/// The extracted metadata block of one rule file.
#[derive(Debug, Default, Clone)]
pub struct Frontmatter {
    /// Top-level `key: value` pairs, unknown keys included.
    pub scalars: BTreeMap<String, Scalar>,
    /// Items of the nested `conditions:` list, each a map of scalar pairs.
    pub conditions: Vec<BTreeMap<String, Scalar>>,
}

/// Split raw rule-file text into `(metadata, message_body)`.
///
/// An absent opening delimiter or an unterminated block is a hard
/// [`FrontmatterError`]; the file is never partially parsed.
pub fn extract(text: &str) -> Result<(Frontmatter, String), FrontmatterError> {
    let mut lines = text.lines();

    let first = lines
        .next()
        .map(|l| l.trim_start_matches('\u{feff}').trim())
        .unwrap_or("");
    if first != "---" {
        return Err(FrontmatterError::MissingOpeningDelimiter);
    }

    let mut fm = Frontmatter::default();
    let mut in_conditions = false;
    let mut closed = false;
    let mut body_lines: Vec<&str> = Vec::new();

    for line in lines {
        if closed {
            body_lines.push(line);
            continue;
        }
        if line.trim() == "---" {
            closed = true;
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if !line.starts_with(' ') && !line.starts_with('\t') {
            // Top-level line.
            let Some((key, value)) = split_key_value(line) else {
                // No colon at all; tolerate and move on.
                continue;
            };
            if key == "conditions" && value.trim().is_empty() {
                in_conditions = true;
                continue;
            }
            in_conditions = false;
            if value.trim().is_empty() {
                // Start of an unknown nested block; its indented lines fall
                // through the `in_conditions == false` arm below.
                continue;
            }
            fm.scalars.insert(key.to_string(), Scalar::parse(value));
        } else if in_conditions {
            parse_condition_line(trimmed, &mut fm.conditions);
        }
        // Indented lines outside a conditions block belong to an unknown
        // nested key and are ignored.
    }

    if !closed {
        return Err(FrontmatterError::UnterminatedBlock);
    }

    let body = body_lines.join("\n").trim().to_string();
    Ok((fm, body))
}

/// Split a `key: value` line at the first colon. Returns `None` when the line
/// has no colon or an empty key.
fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Consume one already-trimmed line inside the `conditions:` list.
fn parse_condition_line(trimmed: &str, conditions: &mut Vec<BTreeMap<String, Scalar>>) {
    if let Some(rest) = trimmed.strip_prefix("- ") {
        conditions.push(BTreeMap::new());
        if let Some((key, value)) = split_key_value(rest) {
            if let Some(item) = conditions.last_mut() {
                item.insert(key.to_string(), Scalar::parse(value));
            }
        }
    } else if trimmed == "-" {
        conditions.push(BTreeMap::new());
    } else if let Some((key, value)) = split_key_value(trimmed) {
        // Continuation line of the current item.
        if let Some(item) = conditions.last_mut() {
            item.insert(key.to_string(), Scalar::parse(value));
        }
    }
}

/// Strip surrounding quotes. Double quotes unescape `\\` and `\"`; single
/// quotes are verbatim. Returns `None` when the value is unquoted.
fn unquote(trimmed: &str) -> Option<String> {
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        let inner = &trimmed[1..trimmed.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some(other) => {
                        // Unknown escape: keep both characters so regex
                        // classes like \s pass through untouched.
                        out.push('\\');
                        out.push(other);
                    }
                    None => out.push('\\'),
                }
            } else {
                out.push(c);
            }
        }
        Some(out)
    } else if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        Some(trimmed[1..trimmed.len() - 1].to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_scalars_and_body() {
        let text = "---\nname: block-rm\nenabled: true\nevent: bash\npriority: 5\n---\nDo not do that.\n";
        let (fm, body) = extract(text).unwrap();
        assert_eq!(
            fm.scalars.get("name"),
            Some(&Scalar::Str("block-rm".to_string()))
        );
        assert_eq!(fm.scalars.get("enabled"), Some(&Scalar::Bool(true)));
        assert_eq!(fm.scalars.get("priority"), Some(&Scalar::Int(5)));
        assert_eq!(body, "Do not do that.");
    }

    #[test]
    fn missing_opening_delimiter_is_error() {
        let err = extract("name: foo\n---\n").unwrap_err();
        assert_eq!(err, FrontmatterError::MissingOpeningDelimiter);
    }

    #[test]
    fn unterminated_block_is_error() {
        let err = extract("---\nname: foo\nevent: bash\n").unwrap_err();
        assert_eq!(err, FrontmatterError::UnterminatedBlock);
    }

    #[test]
    fn empty_file_is_error() {
        assert_eq!(
            extract("").unwrap_err(),
            FrontmatterError::MissingOpeningDelimiter
        );
    }

    #[test]
    fn parses_conditions_list() {
        let text = "---\nname: r\nevent: bash\nconditions:\n  - field: command\n    operator: regex_match\n    pattern: \"rm\\\\s+-rf\"\n  - field: command\n    operator: not_contains\n    pattern: --dry-run\n---\nbody\n";
        let (fm, _) = extract(text).unwrap();
        assert_eq!(fm.conditions.len(), 2);
        assert_eq!(
            fm.conditions[0].get("pattern"),
            Some(&Scalar::Str(r"rm\s+-rf".to_string()))
        );
        assert_eq!(
            fm.conditions[1].get("operator"),
            Some(&Scalar::Str("not_contains".to_string()))
        );
    }

    #[test]
    fn double_quoted_backslashes_unescape_once() {
        let text = "---\npattern: \"eval\\\\(\"\nname: r\nevent: bash\n---\n";
        let (fm, _) = extract(text).unwrap();
        assert_eq!(
            fm.scalars.get("pattern"),
            Some(&Scalar::Str(r"eval\(".to_string()))
        );
    }

    #[test]
    fn unquoted_backslashes_stay_literal() {
        let text = "---\npattern: rm\\s+-rf\nname: r\nevent: bash\n---\n";
        let (fm, _) = extract(text).unwrap();
        assert_eq!(
            fm.scalars.get("pattern"),
            Some(&Scalar::Str(r"rm\s+-rf".to_string()))
        );
    }

    #[test]
    fn single_quotes_are_verbatim() {
        let text = "---\npattern: 'a\\b'\nname: r\nevent: bash\n---\n";
        let (fm, _) = extract(text).unwrap();
        assert_eq!(
            fm.scalars.get("pattern"),
            Some(&Scalar::Str(r"a\b".to_string()))
        );
    }

    #[test]
    fn quoted_bool_stays_a_string() {
        let text = "---\nenabled: \"true\"\nname: r\nevent: bash\n---\n";
        let (fm, _) = extract(text).unwrap();
        assert_eq!(
            fm.scalars.get("enabled"),
            Some(&Scalar::Str("true".to_string()))
        );
    }

    #[test]
    fn unknown_top_level_keys_are_kept_not_rejected() {
        let text = "---\nname: r\nevent: bash\nauthor: someone\n---\n";
        let (fm, _) = extract(text).unwrap();
        assert_eq!(
            fm.scalars.get("author"),
            Some(&Scalar::Str("someone".to_string()))
        );
    }

    #[test]
    fn unknown_nested_block_is_skipped() {
        let text = "---\nname: r\nevent: bash\nmetadata:\n  origin: upstream\n  tier: 2\nconditions:\n  - field: command\n    operator: contains\n    pattern: sudo\n---\n";
        let (fm, _) = extract(text).unwrap();
        assert!(!fm.scalars.contains_key("origin"));
        assert_eq!(fm.conditions.len(), 1);
    }

    #[test]
    fn comments_and_blank_lines_inside_block_are_ignored() {
        let text = "---\n# a comment\nname: r\n\nevent: bash\n---\nbody";
        let (fm, body) = extract(text).unwrap();
        assert_eq!(fm.scalars.len(), 2);
        assert_eq!(body, "body");
    }

    #[test]
    fn body_preserves_interior_structure() {
        let text = "---\nname: r\nevent: bash\n---\n\nLine one.\n\nLine two.\n";
        let (_, body) = extract(text).unwrap();
        assert_eq!(body, "Line one.\n\nLine two.");
    }

    #[test]
    fn body_may_contain_delimiter_lines() {
        let text = "---\nname: r\nevent: bash\n---\nbefore\n---\nafter\n";
        let (_, body) = extract(text).unwrap();
        assert_eq!(body, "before\n---\nafter");
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let text = "---\r\nname: r\r\nevent: bash\r\n---\r\nbody\r\n";
        let (fm, body) = extract(text).unwrap();
        assert_eq!(fm.scalars.get("name"), Some(&Scalar::Str("r".to_string())));
        assert_eq!(body, "body");
    }

    #[test]
    fn condition_item_unknown_keys_are_kept_in_item() {
        let text = "---\nname: r\nevent: bash\nconditions:\n  - field: command\n    operator: contains\n    pattern: x\n    note: irrelevant\n---\n";
        let (fm, _) = extract(text).unwrap();
        assert_eq!(
            fm.conditions[0].get("note"),
            Some(&Scalar::Str("irrelevant".to_string()))
        );
    }
}
