//! Hidden detail blocks for chat transcripts.
//!
//! A scored response is shown as the plain response followed by collapsible
//! `<details>` blocks with the reasoning protocol and the argument map:
//!
//! ~~~text
//! {response}
//!
//! <details id="reasoning"><summary>Reasoning</summary>
//! {html-escaped reasoning}
//! </details>
//! <details id="svg_argmap"><summary>Argument map</summary>
//! {svg}
//! </details>
//! ~~~
//!
//! [`extract`] exactly inverts [`embed`] for every response and reasoning
//! text, and for every SVG without `<details` / `</details>` in it.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{ArgmapError, Result};
use crate::parse::argdown::format_proscons;
use crate::pipeline::stage::{ISSUE, PROSCONS, UNPACKED_PROSCONS};
use crate::types::state::DebugState;

const REASONING_OPEN: &str = "\n\n<details id=\"reasoning\"><summary>Reasoning</summary>\n";
const SVG_OPEN: &str = "\n<details id=\"svg_argmap\"><summary>Argument map</summary>\n";
const CLOSE: &str = "\n</details>";

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(amp|lt|gt|quot);").expect("valid entity pattern"));
static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<a\b[^>]*>|</a\s*>").expect("valid anchor pattern"));
static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s(?:xlink:)?href\s*=\s*("[^"]*"|'[^']*')"#).expect("valid href pattern")
});
static PROLOG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<\?xml.*?\?>\s*|<!DOCTYPE[^>]*>\s*").expect("valid prolog pattern")
});
static SVG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<svg\b[^>]*>").expect("valid svg tag pattern"));
static SIZE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s(width|height)\s*=\s*("[^"]*"|'[^']*')"#).expect("valid size pattern")
});

/// Response text with its embedded details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embedded {
    pub response: String,
    pub reasoning: String,
    pub svg: Option<String>,
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn unescape_html(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures<'_>| match &caps[1] {
            "amp" => "&",
            "lt" => "<",
            "gt" => ">",
            _ => "\"",
        })
        .into_owned()
}

/// Append reasoning and an optional SVG as detail blocks to `response`.
pub fn embed(response: &str, reasoning: &str, svg: Option<&str>) -> Result<String> {
    let mut out = format!("{response}{REASONING_OPEN}{}{CLOSE}", escape_html(reasoning));
    if let Some(svg) = svg {
        if svg.contains("<details") || svg.contains("</details>") {
            return Err(ArgmapError::Export("svg must not contain details tags".into()));
        }
        out.push_str(SVG_OPEN);
        out.push_str(svg);
        out.push_str(CLOSE);
    }
    Ok(out)
}

/// Split a message produced by [`embed`] into its parts.
///
/// Returns `None` if `text` carries no (well-formed) reasoning block.
pub fn extract(text: &str) -> Option<Embedded> {
    let start = text.rfind(REASONING_OPEN)?;
    let response = &text[..start];
    let rest = &text[start + REASONING_OPEN.len()..];

    let end = rest.find(CLOSE)?;
    let reasoning = unescape_html(&rest[..end]);
    let tail = &rest[end + CLOSE.len()..];

    let svg = if tail.is_empty() {
        None
    } else {
        let inner = tail.strip_prefix(SVG_OPEN)?.strip_suffix(CLOSE)?;
        if inner.contains("</details>") {
            return None;
        }
        Some(inner.to_string())
    };

    Some(Embedded {
        response: response.to_string(),
        reasoning,
        svg,
    })
}

/// Drop the response's detail blocks, keeping the visible text only.
pub fn strip_details(text: &str) -> &str {
    match text.rfind(REASONING_OPEN) {
        Some(start) if extract(text).is_some() => &text[..start],
        _ => text,
    }
}

/// Make a graphviz SVG embeddable: no XML prolog, no links, full width.
pub fn normalize_svg(svg: &str) -> String {
    let svg = PROLOG.replace_all(svg, "");
    let svg = ANCHOR.replace_all(&svg, "");
    let svg = HREF.replace_all(&svg, "");
    SVG_TAG
        .replace(&svg, |caps: &regex::Captures<'_>| {
            let tag = SIZE_ATTR.replace_all(&caps[0], "");
            format!("<svg width=\"100%\"{}", &tag["<svg".len()..])
        })
        .trim()
        .to_string()
}

/// Markdown protocol of an analysis: issue, pros and cons, scores, warnings.
pub fn protocol(state: &DebugState) -> String {
    let mut sections = Vec::new();

    if let Some(issue) = state.text(ISSUE).filter(|i| !i.is_empty()) {
        sections.push(format!("### Issue\n\n{issue}"));
    }

    let list = state
        .proscons(UNPACKED_PROSCONS)
        .or_else(|| state.proscons(PROSCONS))
        .filter(|l| !l.is_empty());
    if let Some(list) = list {
        sections.push(format!("### Pros and cons\n\n{}", format_proscons(list)));
    }

    if !state.scores.is_empty() {
        let mut table = String::from("### Scores\n\n| Metric | Value |\n|---|---|");
        for score in &state.scores {
            table.push_str(&format!("\n| {} | {:.3} |", score.id, score.value));
        }
        sections.push(table);
    }

    if !state.warnings.is_empty() {
        let items: Vec<String> = state
            .warnings
            .iter()
            .map(|w| format!("- `{}`: {}", w.product, w.message))
            .collect();
        sections.push(format!("### Warnings\n\n{}", items.join("\n")));
    }

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::claim::{Claim, ProsConsList, RootClaim};
    use crate::types::state::{Artifact, ArtifactData, Score};
    use proptest::prelude::*;

    #[test]
    fn test_embed_layout() {
        let text = embed("Buy.", "a < b", Some("<svg></svg>")).unwrap();
        assert_eq!(
            text,
            "Buy.\n\n<details id=\"reasoning\"><summary>Reasoning</summary>\na &lt; b\n</details>\n<details id=\"svg_argmap\"><summary>Argument map</summary>\n<svg></svg>\n</details>"
        );
    }

    #[test]
    fn test_svg_with_details_is_rejected() {
        assert!(embed("r", "x", Some("<details>")).is_err());
    }

    #[test]
    fn test_text_without_blocks() {
        assert_eq!(extract("plain answer"), None);
        assert_eq!(strip_details("plain answer"), "plain answer");
        let text = embed("answer", "why", None).unwrap();
        assert_eq!(strip_details(&text), "answer");
    }

    #[test]
    fn test_normalize_svg() {
        let svg = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<svg width="320pt" height="188pt" viewBox="0 0 320 188" xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">
<g><a xlink:href="https://example.com" xlink:title="x"><text>R</text></a></g>
</svg>"#;
        let out = normalize_svg(svg);
        assert!(out.starts_with("<svg width=\"100%\" viewBox=\"0 0 320 188\""));
        assert!(!out.contains("height="));
        assert!(!out.contains("<a"));
        assert!(!out.contains("</a>"));
        assert!(!out.contains("example.com"));
        assert!(out.contains("<text>R</text>"));
    }

    #[test]
    fn test_protocol_sections() {
        let mut state = DebugState::new("Rent or buy?", "Buy.");
        state.push_artifact(Artifact::new(ISSUE, "Issue", ArtifactData::Text("Rent or buy".into())));
        state.push_artifact(Artifact::new(
            PROSCONS,
            "Pros and cons",
            ArtifactData::ProsCons(ProsConsList::new(vec![
                RootClaim::new("Buy", "Buy a flat.").with_pro(Claim::new("Equity", "Builds equity.")),
            ])),
        ));
        state.push_score(Score::new("argmap_size", "Size", 2.0));
        state.warn("svg_argmap", "graphviz missing");

        let text = protocol(&state);
        assert!(text.starts_with("### Issue\n\nRent or buy"));
        assert!(text.contains("+ [Equity]: Builds equity."));
        assert!(text.contains("| argmap_size | 2.000 |"));
        assert!(text.contains("- `svg_argmap`: graphviz missing"));
    }

    proptest! {
        #[test]
        fn embed_then_extract_is_identity(
            response in any::<String>(),
            reasoning in any::<String>(),
            svg in proptest::option::of("<svg>[a-z =\"/]{0,40}</svg>"),
        ) {
            let text = embed(&response, &reasoning, svg.as_deref()).unwrap();
            let parts = extract(&text).unwrap();
            prop_assert_eq!(parts.response, response);
            prop_assert_eq!(parts.reasoning, reasoning);
            prop_assert_eq!(parts.svg, svg);
        }

        #[test]
        fn unescape_inverts_escape(text in any::<String>()) {
            prop_assert_eq!(unescape_html(&escape_html(&text)), text);
        }
    }
}
