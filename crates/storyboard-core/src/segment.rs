use std::time::Duration;

use crate::types::{Scene, WordSpan};

/// Default target duration a scene should reach before a sentence boundary
/// is allowed to close it.
pub const DEFAULT_SCENE_TARGET: Duration = Duration::from_millis(7000);

/// Sentence-terminal punctuation, including the danda used as a full stop
/// in Devanagari-script narration.
const SENTENCE_ENDINGS: [char; 4] = ['.', '!', '?', '।'];

fn ends_sentence(word: &str) -> bool {
    word.trim_end()
        .chars()
        .last()
        .is_some_and(|c| SENTENCE_ENDINGS.contains(&c))
}

/// Partition a word timeline into scenes.
///
/// Words accumulate into a buffer that closes when a word ends a sentence and
/// the buffer has run at least `target`, or at the end of the stream. A long
/// sentence is never split mid-sentence, so a single scene can run well past
/// the target.
pub fn segment_words(words: &[WordSpan], target: Duration) -> Vec<Scene> {
    let target_secs = target.as_secs_f64();
    let mut scenes: Vec<Scene> = Vec::new();
    let mut tokens: Vec<&str> = Vec::new();
    let mut buffer_start = 0.0;

    for (i, span) in words.iter().enumerate() {
        if tokens.is_empty() {
            buffer_start = span.start_time;
        }
        tokens.push(span.word.as_str());

        let elapsed = span.end_time - buffer_start;
        let at_end = i + 1 == words.len();
        if at_end || (ends_sentence(&span.word) && elapsed >= target_secs) {
            scenes.push(Scene {
                scene_number: scenes.len() as u32 + 1,
                start_time_sec: buffer_start,
                end_time_sec: span.end_time,
                script_text: tokens.join(" ").trim().to_string(),
                prompt: None,
                image: None,
            });
            tokens.clear();
        }
    }

    scenes
}
