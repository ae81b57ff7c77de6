use crate::fonts::{self, Face};

/// Converts a single long string into the sequence of lines that each fit within
/// `max_width` points when set in the given face and font size.
///
/// The algorithm is word-greedy: whitespace runs are collapsed to single spaces,
/// words are packed onto the current line while they fit, and a word that alone
/// exceeds `max_width` is split by character-greedy packing before word packing
/// resumes. The function is pure and deterministic; it draws nothing.
///
/// Every returned line measures at most `max_width`, except in the degenerate case
/// of a single character whose own width already exceeds it. Empty input yields no
/// lines: rendering a placeholder instead is the caller's concern.
pub fn wrap_text(text: &str, face: Face, font_size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.is_empty() {
            if fonts::text_width(word, face, font_size) <= max_width {
                current_line.push_str(word);
            } else {
                // The word alone does not fit on an empty line: hard-break it
                current_line = pack_characters(word, face, font_size, max_width, &mut lines);
            }
            continue;
        }

        let candidate_width =
            fonts::text_width(&format!("{} {}", current_line, word), face, font_size);
        if candidate_width <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current_line));
            if fonts::text_width(word, face, font_size) <= max_width {
                current_line.push_str(word);
            } else {
                current_line = pack_characters(word, face, font_size, max_width, &mut lines);
            }
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    lines
}

/// Character-greedy packing for a word which alone exceeds `max_width`: completed
/// chunks are flushed to `lines` and the trailing chunk is returned as the new
/// accumulator so that word packing can resume after it.
fn pack_characters(
    word: &str,
    face: Face,
    font_size: f32,
    max_width: f32,
    lines: &mut Vec<String>,
) -> String {
    let mut current_chunk = String::new();

    for character in word.chars() {
        let mut candidate = current_chunk.clone();
        candidate.push(character);
        if fonts::text_width(&candidate, face, font_size) <= max_width || current_chunk.is_empty() {
            // A lone character wider than the whole line is accepted as-is
            current_chunk = candidate;
        } else {
            lines.push(std::mem::replace(&mut current_chunk, character.to_string()));
        }
    }

    current_chunk
}
