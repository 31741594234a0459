//! Claim-list extraction from semi-structured model output.
//!
//! Models are asked for a fenced, yaml-like list:
//!
//! ~~~text
//! ```yaml
//! arguments:
//! - title: "Costs"
//!   gist: "The plan is too expensive."
//! - title: "Jobs"
//!   gist: "It creates jobs."
//! ```
//! ~~~
//!
//! Real output drifts: fences go missing, quotes are unbalanced, keys change
//! (`claim`, `text`, `label`), generation stops mid-item, or the model
//! answers with a JSON array instead. Parsing is best-effort and never fails;
//! an unusable answer yields an empty list.

use serde_json::Value;
use tracing::debug;

use super::text::{bounded_sentence, truncate_chars, unquote};
use crate::types::claim::Claim;

/// Bounds applied while extracting claims.
#[derive(Debug, Clone, Copy)]
pub struct ClaimLimits {
    pub max_items: usize,
    pub max_len_label: usize,
    pub max_len_text: usize,
}

impl Default for ClaimLimits {
    fn default() -> Self {
        Self {
            max_items: 50,
            max_len_label: 32,
            max_len_text: 180,
        }
    }
}

const LABEL_KEYS: [&str; 3] = ["title", "label", "name"];
const TEXT_KEYS: [&str; 4] = ["gist", "claim", "text", "statement"];

#[derive(Default)]
struct RawItem {
    label: Option<String>,
    text: Option<String>,
    last_key: Option<&'static str>,
}

impl RawItem {
    fn set(&mut self, key: &str, value: String) -> bool {
        if let Some(k) = LABEL_KEYS.iter().find(|k| **k == key) {
            self.label = Some(value);
            self.last_key = Some(*k);
            true
        } else if let Some(k) = TEXT_KEYS.iter().find(|k| **k == key) {
            self.text = Some(value);
            self.last_key = Some(*k);
            true
        } else {
            false
        }
    }

    fn append(&mut self, continuation: &str) {
        let target = match self.last_key {
            Some(k) if LABEL_KEYS.contains(&k) => &mut self.label,
            Some(_) => &mut self.text,
            None => return,
        };
        if let Some(value) = target {
            let cont = continuation.trim().trim_matches('"');
            if !cont.is_empty() {
                value.push(' ');
                value.push_str(cont);
            }
        }
    }

    fn into_claim(self, limits: &ClaimLimits) -> Option<Claim> {
        let text = self.text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
        let label = self.label.unwrap_or_default();
        Some(Claim::new(
            truncate_chars(label.trim(), limits.max_len_label).trim(),
            bounded_sentence(&text, limits.max_len_text),
        ))
    }
}

/// Split `key: value` (the key must be a bare identifier).
fn split_key_value(line: &str) -> Option<(String, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim().trim_matches('"').to_ascii_lowercase();
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((key, value))
}

/// Parse a yaml-like list of claims. Returns an empty list on failure.
pub fn parse_claims(text: &str, limits: &ClaimLimits) -> Vec<Claim> {
    let claims = parse_yaml_like(text, limits);
    if !claims.is_empty() {
        return claims;
    }
    let claims = parse_json_list(text, limits);
    if claims.is_empty() && !text.trim().is_empty() {
        debug!(len = text.len(), "no claims found in model output");
    }
    claims
}

fn parse_yaml_like(text: &str, limits: &ClaimLimits) -> Vec<Claim> {
    let mut claims = Vec::new();
    let mut current: Option<RawItem> = None;
    let mut inside_fence = false;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.starts_with("```") {
            if inside_fence {
                break;
            }
            inside_fence = true;
            continue;
        }
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("- ").or_else(|| (line == "-").then_some("")) {
            if let Some(item) = current.take() {
                claims.extend(item.into_claim(limits));
                if claims.len() >= limits.max_items {
                    return claims;
                }
            }
            let mut item = RawItem::default();
            if let Some((key, value)) = split_key_value(rest) {
                item.set(&key, unquote(value));
            }
            current = Some(item);
            continue;
        }

        match (current.as_mut(), split_key_value(line)) {
            (Some(item), Some((key, value))) => {
                if !item.set(&key, unquote(value)) {
                    item.last_key = None;
                }
            }
            (Some(item), None) => item.append(line),
            // top-level keys such as `arguments:` or `claims:`
            (None, _) => {}
        }
    }

    if let Some(item) = current {
        if claims.len() < limits.max_items {
            claims.extend(item.into_claim(limits));
        }
    }
    claims
}

fn parse_json_list(text: &str, limits: &ClaimLimits) -> Vec<Claim> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Vec::new();
    };
    if end <= start {
        return Vec::new();
    }
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&text[start..=end]) else {
        return Vec::new();
    };

    let field = |obj: &serde_json::Map<String, Value>, keys: &[&str]| {
        keys.iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))
            .map(str::to_string)
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|obj| {
            RawItem {
                label: field(obj, &LABEL_KEYS),
                text: field(obj, &TEXT_KEYS),
                last_key: None,
            }
            .into_claim(limits)
        })
        .take(limits.max_items)
        .collect()
}

/// Parse a list of short option descriptions.
///
/// Accepts a JSON array of strings or of `{"option": ...}` objects, and falls
/// back to bullet or numbered lines.
pub fn parse_options(text: &str, max_items: usize) -> Vec<String> {
    if let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) {
        if start < end {
            if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&text[start..=end]) {
                let options: Vec<String> = items
                    .iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s.trim().to_string()),
                        Value::Object(o) => o
                            .get("option")
                            .and_then(Value::as_str)
                            .map(|s| s.trim().to_string()),
                        _ => None,
                    })
                    .filter(|s| !s.is_empty())
                    .take(max_items)
                    .collect();
                if !options.is_empty() {
                    return options;
                }
            }
        }
    }

    text.lines()
        .map(str::trim)
        .filter_map(|line| {
            line.strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
                .or_else(|| {
                    let digits = line.chars().take_while(char::is_ascii_digit).count();
                    (digits > 0)
                        .then(|| line[digits..].strip_prefix(". "))
                        .flatten()
                })
        })
        .map(unquote)
        .filter(|s| !s.is_empty())
        .take(max_items)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ClaimLimits {
        ClaimLimits::default()
    }

    #[test]
    fn test_parse_fenced_yaml() {
        let text = r#"Here you go:
```yaml
arguments:
- title: "Costs"
  gist: "The plan is too expensive."
- title: "Jobs"
  gist: "It creates \"green\" jobs."
```
Trailing chatter: - title: "Ignored""#;
        let claims = parse_claims(text, &limits());
        assert_eq!(
            claims,
            vec![
                Claim::new("Costs", "The plan is too expensive."),
                Claim::new("Jobs", "It creates \"green\" jobs."),
            ]
        );
    }

    #[test]
    fn test_tolerates_missing_fence_and_truncation() {
        let text = "claims:\n- title: A\n  claim: First claim.\n- title: B\n  claim: \"Second claim is cut. And th";
        let claims = parse_claims(text, &limits());
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[1].text, "Second claim is cut. And th");
    }

    #[test]
    fn test_continuation_lines_and_missing_label() {
        let text = "- gist: \"Spans\n    two lines.\"\n- title: Only label";
        let claims = parse_claims(text, &limits());
        assert_eq!(claims, vec![Claim::new("", "Spans two lines.")]);
    }

    #[test]
    fn test_bounds_items_and_lengths() {
        let mut text = String::new();
        for i in 0..10 {
            text.push_str(&format!(
                "- title: \"A very long title number {i} that goes on\"\n  gist: \"Short.\"\n"
            ));
        }
        let limits = ClaimLimits {
            max_items: 3,
            max_len_label: 10,
            max_len_text: 180,
        };
        let claims = parse_claims(&text, &limits);
        assert_eq!(claims.len(), 3);
        assert_eq!(claims[0].label, "A very lon");
    }

    #[test]
    fn test_json_fallback() {
        let text = r#"```json
[{"label": "Risk", "text": "It is risky."}, {"title": "Fun", "gist": "It is fun."}, 3]
```"#;
        let claims = parse_claims(text, &limits());
        assert_eq!(
            claims,
            vec![Claim::new("Risk", "It is risky."), Claim::new("Fun", "It is fun.")]
        );
    }

    #[test]
    fn test_garbage_yields_empty() {
        assert!(parse_claims("I cannot help with that.", &limits()).is_empty());
        assert!(parse_claims("", &limits()).is_empty());
    }

    #[test]
    fn test_parse_options() {
        assert_eq!(
            parse_options(r#"[{"option": "Buy a car"}, "Take the bus"]"#, 6),
            vec!["Buy a car", "Take the bus"]
        );
        assert_eq!(
            parse_options("Options:\n1. Stay home\n2. Go out\n- \"Wait\"", 6),
            vec!["Stay home", "Go out", "Wait"]
        );
    }
}
