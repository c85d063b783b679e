//! Prompt templates sent with every chunk.

use crate::Result;
use crate::types::{Slide, Tool};

/// Editor instructions for the wording revision tool.
pub const WORDING_REVISION_PROMPT: &str = r#"You are an editor for consulting-style English slides. From a slide deck exported to JSON, selectively polish only the sentences that truly need work, while preserving meaning and slide layout.

## Input format

- JSON objects with `slide_number: <int>` and `elements: [{ id, type, text }, ...]` where `type` is one of `Title/Subtitle`, `Body`, `Table`, ...
- Table content appears as lines like `Row N, Col M: <cell text>`.
- Line breaks are `\n`, sometimes `\u000b` (vertical tab); treat both as line breaks.

## Candidate sentences

- Any visible line, bullet or cell with at least 5 words after trimming labels.
- For `Table` lines starting with `Row N, Col M:` use only the text after the colon.
- Every line break starts a separate candidate.

## Skip entirely

- Lines with fewer than 5 words.
- Numbers, metrics or labels only (`0.70`, `23Q2`, `18%`, `N/a`, `~80%`, `2.6M (10%)`).
- IDs, hashes and export artifacts (`overall_1_134002`, `columns_2_`).
- Table header labels such as "Cost bucket", "Size of prize ($)", "Time to value (Months)".
- Headers, footers, slide numbers, legends, axis labels, URLs, paths, and `Note:` lines unless they form a full sentence of at least 10 words.

## When to edit

Edit only if a sentence shows one or more of:

- Wordiness, redundancy or filler ("in order to", "it should be noted").
- Awkward phrasing or translation artifacts.
- Grammar, tense or agreement issues.
- Passive voice hiding ownership where active voice is clearer.
- Vague or hedged language where precise business phrasing is better.
- Inconsistent terminology on the same slide.

If a sentence is already strong, do not include it.

## Style

- US English; crisp, professional, one idea per line.
- Prefer active voice, concrete verbs and parallel bullets.
- Keep numbers, units, percentages, part numbers, supplier names and acronyms exactly as given.
- Preserve bracketed and parenthetical content.

## Length

- Equal or shorter than the original; at most 10% more words if essential for clarity.
- One-to-one mapping: never split or merge sentences.

## Output

Produce exactly this table for the sentences you revised:

| Page | Original | Revised |
| --- | --- | --- |

- One row per edited sentence.
- If no edits are warranted, output exactly: `No edits recommended.`
- No commentary before or after the table.

Now process the JSON that follows. Output only the table above (or `No edits recommended.`).

`JSON:`"#;

/// Reviewer instructions for the slide review tool.
pub const SLIDE_REVIEW_PROMPT: &str = r#"You are a meticulous reviewer of English business slides. For every slide in the JSON that follows, report spelling mistakes, grammar problems and logic or consistency issues.

## Input format

- JSON objects with `slide_number: <int>` and `elements: [{ id, type, text }, ...]`.
- Table content appears as lines like `Row N, Col M: <cell text>`.

## Rules

- Spelling: list each misspelled word as `wrong -> right`.
- Grammar: quote the shortest fragment that is wrong and give the fix.
- Logic: flag contradictions, numbers that do not add up and inconsistent terminology.
- Separate several issues in one cell with commas; use `-` when a column has nothing to report.
- Skip slides without any issue.

## Output

Produce exactly this table:

| Page | Spelling | Grammar | Logic |
| --- | --- | --- | --- |

- If no slide has any issue, output exactly: `No edits recommended.`
- No commentary before or after the table.

`JSON:`"#;

/// Returns the instructions for `tool`.
pub const fn prompt_for(tool: Tool) -> &'static str {
    match tool {
        Tool::WordingRevision => WORDING_REVISION_PROMPT,
        Tool::SlideReview => SLIDE_REVIEW_PROMPT,
    }
}

/// Builds the single user message for a chunk: instructions, a newline, and
/// the payload as pretty-printed JSON.
pub fn build_user_message(tool: Tool, payload: &[Slide]) -> Result<String> {
    let json = serde_json::to_string_pretty(payload)?;
    Ok(format!("{}\n{json}", prompt_for(tool)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::NO_EDITS_SENTINEL;
    use crate::types::{ElementKind, SlideElement};

    #[test]
    fn prompts_mention_the_sentinel() {
        assert!(WORDING_REVISION_PROMPT.contains(NO_EDITS_SENTINEL));
        assert!(SLIDE_REVIEW_PROMPT.contains(NO_EDITS_SENTINEL));
    }

    #[test]
    fn user_message_appends_pretty_json() {
        let payload = vec![Slide::new(
            7,
            vec![SlideElement::new("ab12cd34", ElementKind::Body, "Grüße aus Köln")],
        )];
        let message = build_user_message(Tool::WordingRevision, &payload).unwrap();

        assert!(message.starts_with(WORDING_REVISION_PROMPT));
        assert!(message.contains("\n[\n  {\n    \"slide_number\": 7"));
        assert!(message.contains("Grüße aus Köln"));
        assert!(message.contains("\"type\": \"Body\""));
    }
}
