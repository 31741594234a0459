//! Small text helpers shared by the parsers and stages.

/// Truncate to at most `max_chars` characters (not bytes).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Cut trailing text after the last sentence terminator.
///
/// Text without any terminator is returned unchanged.
pub fn trunk_to_sentence(text: &str) -> &str {
    let text = text.trim();
    match text.rfind(['.', '!', '?']) {
        Some(idx) => &text[..=idx],
        None => text,
    }
}

/// Truncate to `max_chars`, then back off to the last complete sentence.
pub fn bounded_sentence(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    trunk_to_sentence(truncate_chars(text, max_chars)).trim().to_string()
}

/// Remove an opening and closing tag pair such as `<ISSUE>`/`</ISSUE>`.
///
/// Tag matching is case-sensitive; missing tags are tolerated.
pub fn strip_tags<'a>(text: &'a str, tag: &str) -> &'a str {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut text = text.trim();
    if let Some(idx) = text.find(&open) {
        text = &text[idx + open.len()..];
    }
    if let Some(idx) = text.find(&close) {
        text = &text[..idx];
    }
    text.trim()
}

/// Label made from the first three words of `text`, joined by `-`.
pub fn label_from_words(text: &str) -> String {
    text.split_whitespace()
        .take(3)
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Remove surrounding quotes, tolerating a missing closing quote.
pub fn unquote(value: &str) -> String {
    let v = value.trim();
    let quote = match v.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => return v.to_string(),
    };
    let inner = &v[1..];
    let inner = inner.strip_suffix(quote).unwrap_or(inner);
    if quote == '"' {
        inner.replace("\\\"", "\"").replace("\\\\", "\\")
    } else {
        inner.replace("''", "'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trunk_to_sentence() {
        assert_eq!(trunk_to_sentence("One. Two. Thr"), "One. Two.");
        assert_eq!(trunk_to_sentence("no terminator"), "no terminator");
        assert_eq!(trunk_to_sentence("Really? yes"), "Really?");
    }

    #[test]
    fn test_bounded_sentence_keeps_short_text() {
        assert_eq!(bounded_sentence("  Short text  ", 80), "Short text");
        assert_eq!(bounded_sentence("First one. Second one is long", 20), "First one.");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<ISSUE>Should we go?</ISSUE>", "ISSUE"), "Should we go?");
        assert_eq!(strip_tags("<ISSUE>Cut off", "ISSUE"), "Cut off");
    }

    #[test]
    fn test_unquote_variants() {
        assert_eq!(unquote(r#""say \"hi\"""#), r#"say "hi""#);
        assert_eq!(unquote(r#""truncated"#), "truncated");
        assert_eq!(unquote("'it''s'"), "it's");
        assert_eq!(unquote("bare"), "bare");
    }

    #[test]
    fn test_label_from_words() {
        assert_eq!(label_from_words("Cars pollute the air."), "Cars-pollute-the");
        assert_eq!(label_from_words(""), "");
    }
}
