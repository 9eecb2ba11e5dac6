//! Fixed-window text splitter with configurable overlap.
//!
//! Windows advance by `chunk_size - overlap` characters, so adjacent chunks
//! share exactly `overlap` characters and concatenating the non-overlapping
//! portions reconstructs the input. A window end prefers the last occurrence
//! of the separator inside the window whenever cutting there still advances
//! past the shared overlap, keeping chunks aligned to line boundaries where
//! the text allows it.
//!
//! Splitting is fully determined by the input text and the chunking
//! parameters; rebuilding an index from the same text always yields the
//! same chunk set with the same ordinals.

use crate::config::ChunkingConfig;
use crate::models::Chunk;

/// Split text into overlapping chunks. Ordinals are contiguous from 0.
///
/// Sizes are measured in characters, not bytes, so multibyte scripts chunk
/// the same way short ASCII text does.
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    let chars: Vec<char> = text.chars().collect();
    let separator: Vec<char> = config.separator.chars().collect();
    let size = config.chunk_size;
    let overlap = config.overlap;

    if chars.is_empty() {
        return Vec::new();
    }
    if chars.len() <= size {
        return vec![Chunk {
            ordinal: 0,
            text: text.to_string(),
        }];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut ordinal = 0i64;

    loop {
        let hard_end = (start + size).min(chars.len());
        let mut end = hard_end;

        if hard_end < chars.len() && !separator.is_empty() {
            // Snap back to the last separator in the window, as long as the
            // cut still lands beyond the region shared with the next chunk.
            if let Some(cut) = rfind_separator(&chars, &separator, start, hard_end) {
                if cut > start + overlap {
                    end = cut;
                }
            }
        }

        chunks.push(Chunk {
            ordinal,
            text: chars[start..end].iter().collect(),
        });
        ordinal += 1;

        if end == chars.len() {
            break;
        }
        start = end - overlap;
    }

    chunks
}

/// Last position `p` in `(start, end]` such that the separator ends at `p`.
fn rfind_separator(chars: &[char], separator: &[char], start: usize, end: usize) -> Option<usize> {
    let mut p = end;
    while p >= start + separator.len() && p >= separator.len() {
        if &chars[p - separator.len()..p] == separator {
            return Some(p);
        }
        p -= 1;
    }
    None
}
