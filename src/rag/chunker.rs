//! Overlapping text splitter.
//!
//! Windows of `chunk_size` characters start every `chunk_size - overlap`
//! characters; the last window ends at the end of the document. A window
//! that is not the last may end early at a natural boundary, but never before
//! the point where the next window starts, so no text is dropped and the
//! number of chunks depends only on the document length.

use serde::{Deserialize, Serialize};

/// A text chunk with its position in the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    /// Character offset in the original document
    pub start_offset: usize,
    pub chunk_index: usize,
}

/// Boundary kinds in order of preference.
const BOUNDARY_LEVELS: [&[&str]; 4] = [
    &["\n\n"],
    &[". ", "! ", "? ", ".\n", "!\n", "?\n"],
    &["\n"],
    &[" "],
];

pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let total_chars = chars.len();

    if total_chars == 0 || chunk_size == 0 {
        return chunks;
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut start = 0;

    loop {
        let end = (start + chunk_size).min(total_chars);
        let is_last = end == total_chars;
        let cut = if is_last {
            end
        } else {
            find_boundary(&chars, start + step, end).unwrap_or(end)
        };

        let chunk_text: String = chars[start..cut].iter().collect();
        if !chunk_text.trim().is_empty() {
            chunks.push(TextChunk {
                text: chunk_text,
                start_offset: start,
                chunk_index: chunks.len(),
            });
        }

        if is_last {
            break;
        }
        start += step;
    }

    chunks
}

/// Latest cut position in `min_cut..=end` that falls right after a boundary,
/// trying paragraph breaks first and single spaces last.
fn find_boundary(chars: &[char], min_cut: usize, end: usize) -> Option<usize> {
    for level in BOUNDARY_LEVELS {
        let best = level
            .iter()
            .filter_map(|sep| last_boundary_after(chars, sep, min_cut, end))
            .max();
        if best.is_some() {
            return best;
        }
    }
    None
}

fn last_boundary_after(chars: &[char], sep: &str, min_cut: usize, end: usize) -> Option<usize> {
    let sep: Vec<char> = sep.chars().collect();
    let lowest = min_cut.max(sep.len());
    (lowest..=end)
        .rev()
        .find(|&cut| chars[cut - sep.len()..cut] == sep[..])
}
