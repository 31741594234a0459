//! LLM prompts for the reconstruction stages.
//!
//! Placeholders use `{name}` and are filled by the `format_*` helpers. The
//! source text is always substituted last so that braces inside it are never
//! mistaken for placeholders.

use crate::parse::argdown::format_proscons;
use crate::types::claim::{Claim, ProsConsList};

/// System message shared by all stages.
pub const SYSTEM_PROMPT: &str = "You are a helpful, honest and knowledgeable AI assistant with expertise in critical thinking and argumentation analysis. Always answer as helpfully as possible.";

/// Labels used to enumerate issue drafts.
pub const DRAFT_LABELS: [&str; 7] = ["A", "B", "C", "D", "E", "F", "G"];

/// Rubric for rating issue drafts.
pub const ISSUE_RUBRIC: [&str; 3] = [
    "Which alternative captures best the text's overarching issue addressed?",
    "Which alternative is most clear and concise?",
    "Which alternative is most faithful to the text?",
];

/// Prompt for drafting the central issue.
pub const ISSUE_DRAFT_PROMPT: &str = r#"Assignment: Identify the overarching issue addressed in a text.

Read the following text carefully:

<TEXT>
{text}
</TEXT>

What is the overarching problem, decision or question the text is addressing?

State the issue in a single, concise sentence (no more than {max_len} characters), enclosed in <ISSUE></ISSUE> tags. Don't add any explanation."#;

/// Prompt for rating issue drafts.
pub const ISSUE_RATING_PROMPT: &str = r#"Assignment: Evaluate alternative statements of a text's issue.

<TEXT>
{text}
</TEXT>

Alternative descriptions of the issue addressed in the text:

{alternatives}

{question}

Answer with the letter of the alternative only."#;

/// Prompt for mining reasons.
pub const MINE_REASONS_PROMPT: &str = r#"Assignment: Summarize all the arguments (pros and cons) presented in a text.

<ISSUE>
{issue}
</ISSUE>

<TEXT>
{text}
</TEXT>

What are the text's arguments (pros and cons) that address the issue?

- Go through the text from beginning to end and extract all arguments in the order of appearance.
- For each argument, sketch its gist in one or two grammatically correct sentences (less than {max_len_gist} characters), staying close to the original wording.
- Provide a short title that flashlights the argument's key idea (2-4 words, less than {max_len_title} characters).
- Avoid repeating one and the same argument in different words.
- You don't have to distinguish between pro and con arguments.
- IMPORTANT: Stay faithful to the text! Don't invent your own reasons. Only provide reasons which are presented or discussed in the text.

Format your answer as a yaml list:
```yaml
arguments:
- title: "first argument's title"
  gist: "first argument's gist"
- title: "second argument's title"
  gist: "second argument's gist"
```"#;

/// Prompt for describing the options available.
pub const OPTIONS_PROMPT: &str = r#"Assignment: Describe the basic options available to an agent facing an issue.

<ISSUE>
{issue}
</ISSUE>

<TEXT>
{text}
</TEXT>

What are the basic, mutually exclusive options for addressing this issue? Sketch each option in 2-6 words.

Answer with a JSON list of strings, e.g. ["first option", "second option"]."#;

/// Prompt for organizing reasons as a pros/cons list.
pub const PROSCONS_PROMPT: &str = r#"Assignment: Organize an unstructured set of reasons as a pros & cons list.

<ISSUE>
{issue}
</ISSUE>

<OPTIONS>
{options}
</OPTIONS>

<REASONS>
{reasons}
</REASONS>

Find fitting root claims (no more than {max_roots}) that the reasons argue for (pros) or against (cons), and assign every reason to exactly one root claim.

- Be bold: root claims are simple, unequivocal statements (less than {max_len_root} characters) corresponding to the options above.
- No reasoning: root claims must not contain reasons, comments or explanations.
- Keep it short: prefer a single root claim, add more only for genuinely alternative options.
- Be exhaustive: every reason must figure in your list, with its original label.
- Don't list a reason twice, and don't invent new reasons.

Use the following argdown format:
```argdown
[Root claim label]: Root claim text.
// PROS
+ [Reason label]: Reason text.
// CONS
- [Reason label]: Reason text.
```"#;

/// Prompt for revising an incomplete pros/cons list.
pub const REVISE_PROSCONS_PROMPT: &str = r#"Assignment: Revise a pros & cons list so that it is complete and correct.

<ISSUE>
{issue}
</ISSUE>

<REASONS>
{reasons}
</REASONS>

Current pros & cons list:

{proscons}

Problems found in the current list:

{critique}

Produce a corrected pros & cons list that assigns every reason to exactly one root claim, keeps the original reason labels, and uses the same argdown format."#;

/// Prompt for unpacking a compound reason.
pub const UNPACK_PROMPT: &str = r#"Assignment: Unpack a reason into its individual claims.

<ISSUE>
{issue}
</ISSUE>

<REASON>
{reason}
</REASON>

Does the reason make several distinct assertions? List each individual claim, in one sentence each, with a short title (2-4 words). If the reason makes just one assertion, list only that one.

- IMPORTANT: Don't add claims that are not contained in the reason.

Format your answer as a yaml list:
```yaml
claims:
- title: "first claim's title"
  claim: "first claim"
```"#;

/// Reasons as `[label]: text` lines.
pub fn format_reasons(reasons: &[Claim]) -> String {
    reasons
        .iter()
        .map(|c| format!("[{}]: {}", c.label, c.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_issue_draft_prompt(text: &str, max_len: usize) -> String {
    ISSUE_DRAFT_PROMPT
        .replace("{max_len}", &max_len.to_string())
        .replace("{text}", text)
}

pub fn format_issue_rating_prompt(text: &str, drafts: &[String], question: &str) -> String {
    let alternatives = drafts
        .iter()
        .zip(DRAFT_LABELS)
        .map(|(draft, label)| format!("({label}) {draft}"))
        .collect::<Vec<_>>()
        .join("\n");
    ISSUE_RATING_PROMPT
        .replace("{question}", question)
        .replace("{alternatives}", &alternatives)
        .replace("{text}", text)
}

pub fn format_mine_reasons_prompt(
    text: &str,
    issue: &str,
    max_len_title: usize,
    max_len_gist: usize,
) -> String {
    MINE_REASONS_PROMPT
        .replace("{max_len_title}", &max_len_title.to_string())
        .replace("{max_len_gist}", &max_len_gist.to_string())
        .replace("{issue}", issue)
        .replace("{text}", text)
}

pub fn format_options_prompt(text: &str, issue: &str) -> String {
    OPTIONS_PROMPT
        .replace("{issue}", issue)
        .replace("{text}", text)
}

pub fn format_proscons_prompt(
    issue: &str,
    options: &[String],
    reasons: &[Claim],
    max_roots: usize,
    max_len_root: usize,
) -> String {
    let options = options
        .iter()
        .map(|o| format!("- {o}"))
        .collect::<Vec<_>>()
        .join("\n");
    PROSCONS_PROMPT
        .replace("{max_roots}", &max_roots.to_string())
        .replace("{max_len_root}", &max_len_root.to_string())
        .replace("{options}", &options)
        .replace("{issue}", issue)
        .replace("{reasons}", &format_reasons(reasons))
}

pub fn format_revise_prompt(
    issue: &str,
    reasons: &[Claim],
    current: &ProsConsList,
    critique: &[String],
) -> String {
    let critique = critique
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {c}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    REVISE_PROSCONS_PROMPT
        .replace("{critique}", &critique)
        .replace("{proscons}", &format_proscons(current))
        .replace("{issue}", issue)
        .replace("{reasons}", &format_reasons(reasons))
}

pub fn format_unpack_prompt(issue: &str, reason: &Claim) -> String {
    UNPACK_PROMPT
        .replace("{issue}", issue)
        .replace("{reason}", &format!("[{}]: {}", reason.label, reason.text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_text_braces_survive() {
        let prompt = format_mine_reasons_prompt("uses {issue} literally", "Go or stay?", 32, 180);
        assert!(prompt.contains("uses {issue} literally"));
        assert!(prompt.contains("<ISSUE>\nGo or stay?\n</ISSUE>"));
        assert!(!prompt.contains("{max_len_gist}"));
    }

    #[test]
    fn test_rating_prompt_enumerates_drafts() {
        let drafts = vec!["First?".to_string(), "Second?".to_string()];
        let prompt = format_issue_rating_prompt("text", &drafts, ISSUE_RUBRIC[1]);
        assert!(prompt.contains("(A) First?\n(B) Second?"));
        assert!(prompt.contains("most clear and concise"));
    }
}
