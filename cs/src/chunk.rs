//! Bounded, overlapping chunking of flat project text

use tracing::debug;

/// Split `text` into chunks of at most `chunk_size` characters.
///
/// Consecutive chunks share `overlap` characters so context that straddles a
/// boundary is present in both. A window prefers to end on a newline when one
/// falls in its second half. Splitting is done on `char` boundaries, never
/// inside a UTF-8 sequence.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size - 1);
    let chars: Vec<char> = text.chars().collect();

    let mut chunks = Vec::new();
    let mut offset = 0usize;

    while offset < chars.len() {
        let mut end = (offset + chunk_size).min(chars.len());

        if end < chars.len() {
            let half = offset + chunk_size / 2;
            if let Some(pos) = chars[half..end].iter().rposition(|c| *c == '\n') {
                end = half + pos + 1;
            }
        }

        chunks.push(chars[offset..end].iter().collect::<String>());

        // Move forward, accounting for overlap
        offset = if end >= chars.len() {
            end
        } else {
            end.saturating_sub(overlap).max(offset + 1)
        };
    }

    debug!(chunk_count = chunks.len(), chunk_size, overlap, "chunk_text: done");
    chunks
}
