use serde_json::Value;

use crate::error::{Result, StoryboardError};

/// Extract a JSON value from a text model's free-form reply.
///
/// The raw text is tried as-is first. If that fails, the usual formatting
/// deviations are undone (a Markdown code fence, typographic quotes, trailing
/// commas) and the text is parsed once more. Anything beyond that is
/// surfaced as [`StoryboardError::MalformedModelOutput`] with the original
/// text attached for diagnostics.
pub fn parse_model_json(raw: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_str(raw) {
        return Ok(value);
    }

    let stripped = strip_code_fence(raw);
    let normalized = remove_trailing_commas(&normalize_quotes(stripped));
    serde_json::from_str(&normalized).map_err(|source| StoryboardError::MalformedModelOutput {
        raw: raw.to_string(),
        source,
    })
}

/// Remove one leading/trailing ``` fence, with an optional `json` tag.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Replace typographic quotes with their plain ASCII forms.
fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201c}' | '\u{201d}' | '\u{201e}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

/// Drop commas that sit directly before a closing `}` or `]`, outside of
/// string literals.
fn remove_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let chars: Vec<char> = text.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().copied().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}' | ']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }

    out
}
