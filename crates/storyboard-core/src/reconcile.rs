use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use crate::types::{ModelSceneRecord, Scene};

/// Suffix every image prompt must carry so the image model frames for video.
pub const ASPECT_MARKER: &str = "16:9 aspect ratio";

/// Identifier fields probed on each model record, most specific first.
const ID_FIELDS: [&str; 6] = [
    "scene_number",
    "sceneNumber",
    "scene_id",
    "scene",
    "id",
    "number",
];

const PLACEHOLDER_PREFIX: &str = "(no prompt generated for scene ";

/// Validate the `scenes` array of a parsed model response into strict records.
///
/// Records that carry no usable identifier or prompt are kept (their position
/// still matters for the positional fallback) with the missing parts as `None`.
pub fn extract_records(response: &Value) -> Vec<ModelSceneRecord> {
    let Some(items) = response.get("scenes").and_then(Value::as_array) else {
        warn!("model response has no scenes array");
        return Vec::new();
    };

    items
        .iter()
        .map(|item| ModelSceneRecord {
            id_hint: probe_identifier(item),
            prompt: item
                .get("prompt")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
        .collect()
}

fn probe_identifier(record: &Value) -> Option<u32> {
    ID_FIELDS
        .iter()
        .filter_map(|field| record.get(field))
        .find_map(coerce_identifier)
}

/// Coerce an identifier value to a positive scene number. Strings are reduced
/// to their digits first, so "scene_3" and "#3" both resolve to 3.
fn coerce_identifier(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => {
            let f = n.as_f64()?;
            if f.is_finite() && f >= 1.0 {
                Some(f as u32)
            } else {
                None
            }
        }
        Value::String(s) => {
            let digits: String = s.chars().filter(char::is_ascii_digit).collect();
            digits.parse::<u32>().ok().filter(|&n| n >= 1)
        }
        _ => None,
    }
}

/// Trim a prompt and make sure it ends with the aspect marker exactly once.
pub fn normalize_prompt(prompt: &str) -> String {
    let trimmed = prompt.trim();
    if trimmed.ends_with(ASPECT_MARKER) {
        trimmed.to_string()
    } else {
        format!("{trimmed}. {ASPECT_MARKER}")
    }
}

/// Deterministic stand-in for scenes the model left without a prompt.
pub fn placeholder_prompt(scene_number: u32) -> String {
    format!("{PLACEHOLDER_PREFIX}{scene_number})")
}

/// Recognized by the image pass as "no prompt available, skip this scene".
pub fn is_placeholder_prompt(prompt: &str) -> bool {
    prompt.starts_with(PLACEHOLDER_PREFIX)
}

/// Map model records back onto the segmenter's scenes.
///
/// Records are matched by their coerced identifiers. If not a single record
/// in the set had a usable identifier, the match falls back to position:
/// record *i* is assigned to scene *i*. Scenes with no match receive the
/// placeholder prompt.
pub fn reconcile(scenes: &mut [Scene], records: &[ModelSceneRecord]) {
    let any_ids = records.iter().any(|r| r.id_hint.is_some());
    if !any_ids && !records.is_empty() {
        warn!("no scene identifiers recovered, falling back to positional assignment");
    }

    let mut prompts: BTreeMap<u32, String> = BTreeMap::new();
    for (i, record) in records.iter().enumerate() {
        let Some(prompt) = record.prompt.as_deref() else {
            continue;
        };
        let scene_number = if any_ids {
            match record.id_hint {
                Some(n) => n,
                None => continue,
            }
        } else {
            i as u32 + 1
        };
        prompts.insert(scene_number, normalize_prompt(prompt));
    }

    for scene in scenes.iter_mut() {
        scene.prompt = Some(
            prompts
                .remove(&scene.scene_number)
                .unwrap_or_else(|| placeholder_prompt(scene.scene_number)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scene(n: u32) -> Scene {
        Scene {
            scene_number: n,
            start_time_sec: (n - 1) as f64 * 7.0,
            end_time_sec: n as f64 * 7.0,
            script_text: format!("scene {n} text"),
            prompt: None,
            image: None,
        }
    }

    #[test]
    fn extracts_records_from_mixed_identifier_fields() {
        let response = json!({
            "analysis": "three beats",
            "scenes": [
                {"scene_number": 2, "prompt": "a"},
                {"id": "scene_1", "prompt": "b"},
                {"scene": "x", "prompt": "c"},
            ]
        });
        let records = extract_records(&response);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id_hint, Some(2));
        assert_eq!(records[1].id_hint, Some(1));
        assert_eq!(records[2].id_hint, None);
    }

    #[test]
    fn parsable_identifiers_map_to_their_scenes() {
        let mut scenes = vec![scene(1), scene(2), scene(3)];
        let records = vec![
            ModelSceneRecord {
                id_hint: Some(2),
                prompt: Some("second".into()),
            },
            ModelSceneRecord {
                id_hint: Some(1),
                prompt: Some("first".into()),
            },
            ModelSceneRecord {
                id_hint: None,
                prompt: Some("lost".into()),
            },
        ];
        reconcile(&mut scenes, &records);
        assert_eq!(scenes[0].prompt.as_deref(), Some("first. 16:9 aspect ratio"));
        assert_eq!(
            scenes[1].prompt.as_deref(),
            Some("second. 16:9 aspect ratio")
        );
        // Scene 3 had no matching record: placeholder.
        assert!(is_placeholder_prompt(scenes[2].prompt.as_deref().unwrap()));
    }

    #[test]
    fn all_unparsable_identifiers_fall_back_to_position() {
        let mut scenes = vec![scene(1), scene(2), scene(3)];
        let records: Vec<ModelSceneRecord> = ["one", "two", "three"]
            .iter()
            .map(|p| ModelSceneRecord {
                id_hint: None,
                prompt: Some(p.to_string()),
            })
            .collect();
        reconcile(&mut scenes, &records);
        assert_eq!(scenes[0].prompt.as_deref(), Some("one. 16:9 aspect ratio"));
        assert_eq!(scenes[1].prompt.as_deref(), Some("two. 16:9 aspect ratio"));
        assert_eq!(
            scenes[2].prompt.as_deref(),
            Some("three. 16:9 aspect ratio")
        );
    }

    #[test]
    fn aspect_marker_is_appended_exactly_once() {
        let normalized = normalize_prompt("  a castle at dawn  ");
        assert_eq!(normalized, "a castle at dawn. 16:9 aspect ratio");
        assert_eq!(normalize_prompt(&normalized), normalized);
        assert_eq!(normalized.matches(ASPECT_MARKER).count(), 1);
    }

    #[test]
    fn numeric_identifier_must_be_finite_and_positive() {
        assert_eq!(coerce_identifier(&json!(3)), Some(3));
        assert_eq!(coerce_identifier(&json!(2.0)), Some(2));
        assert_eq!(coerce_identifier(&json!(0)), None);
        assert_eq!(coerce_identifier(&json!(-1)), None);
        assert_eq!(coerce_identifier(&json!(null)), None);
        assert_eq!(coerce_identifier(&json!("no digits")), None);
    }
}
