//! Argdown snippets for pros/cons lists.
//!
//! A pros/cons list is exchanged with the model as
//!
//! ~~~text
//! ```argdown
//! [Root]: Root claim text.
//! // PROS
//! + [Pro]: Pro reason text.
//! // CONS
//! - [Con]: Con reason text.
//! ```
//! ~~~
//!
//! The parser accepts snippets with missing fences or section headers and
//! skips lines it does not understand.

use tracing::debug;

use crate::types::claim::{Claim, ProsConsList, RootClaim};

/// Opening fence of an argdown snippet.
pub const FENCE_OPEN: &str = "```argdown";

/// Closing fence.
pub const FENCE_CLOSE: &str = "```";

/// Parse `[label]: text`.
pub fn parse_proposition(line: &str) -> Option<Claim> {
    let rest = line.trim().strip_prefix('[')?;
    let (label, text) = rest.split_once("]:")?;
    let label = label.trim();
    let text = text.trim();
    if label.is_empty() || text.is_empty() {
        return None;
    }
    Some(Claim::new(label, text))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Pros,
    Cons,
}

/// Parse an argdown pros/cons snippet. Never fails.
pub fn parse_proscons(snippet: &str) -> ProsConsList {
    let mut roots: Vec<RootClaim> = Vec::new();
    let mut section: Option<Section> = None;
    let mut started = false;

    for raw in snippet.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with(FENCE_CLOSE) {
            if started || !roots.is_empty() {
                break;
            }
            started = true;
            continue;
        }

        let upper = line.to_ascii_uppercase();
        if upper.starts_with("//") {
            match upper.trim_start_matches('/').trim() {
                "PROS" => section = Some(Section::Pros),
                "CONS" => section = Some(Section::Cons),
                other => debug!(comment = other, "ignoring argdown comment"),
            }
            continue;
        }

        let bullet = if let Some(rest) = line.strip_prefix('+') {
            Some((Section::Pros, rest))
        } else {
            line.strip_prefix('-').map(|rest| (Section::Cons, rest))
        };

        match bullet {
            Some((valence, rest)) => {
                let Some(root) = roots.last_mut() else {
                    debug!(line, "reason before any root claim");
                    continue;
                };
                let Some(claim) = parse_proposition(rest) else {
                    debug!(line, "expected proposition");
                    continue;
                };
                if section.is_some_and(|s| s != valence) {
                    debug!(line, "bullet does not match section header, using bullet");
                }
                match valence {
                    Section::Pros => root.pros.push(claim),
                    Section::Cons => root.cons.push(claim),
                }
            }
            None => match parse_proposition(line) {
                Some(claim) => {
                    roots.push(RootClaim::new(claim.label, claim.text));
                    section = None;
                }
                None => debug!(line, "expected root claim"),
            },
        }
    }

    ProsConsList::new(roots)
}

/// Format a pros/cons list as a fenced argdown snippet.
pub fn format_proscons(list: &ProsConsList) -> String {
    let mut lines = vec![FENCE_OPEN.to_string()];
    for root in &list.roots {
        lines.push(format!("[{}]: {}", root.label, root.text));
        lines.push("// PROS".to_string());
        lines.extend(root.pros.iter().map(|c| format!("+ [{}]: {}", c.label, c.text)));
        lines.push("// CONS".to_string());
        lines.extend(root.cons.iter().map(|c| format!("- [{}]: {}", c.label, c.text)));
    }
    lines.push(FENCE_CLOSE.to_string());
    lines.join("\n")
}
