use once_cell::sync::Lazy;
use regex::Regex;

/// Default byte budget for one generation chunk.
pub const DEFAULT_CHUNK_BYTES: usize = 135;

/// Sentence boundary: ASCII punctuation followed by whitespace (the whitespace
/// is dropped), or Chinese punctuation on its own.
static RE_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[;:,.!?]\s+|[；：，。！？]").unwrap());

/// Split `text` into sentences at punctuation boundaries.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in RE_BOUNDARY.find_iter(text) {
        let punct_len = m.as_str().chars().next().map_or(0, char::len_utf8);
        sentences.push(&text[start..m.start() + punct_len]);
        start = m.end();
    }
    sentences.push(&text[start..]);

    sentences.retain(|s| !s.is_empty());
    sentences
}

/// Pack sentences of `text` into chunks of at most `max_bytes` UTF-8 bytes.
///
/// A sentence ending in a single-byte character gets a trailing space before
/// packing. A sentence longer than the budget becomes its own chunk.
pub fn chunk_text(text: &str, max_bytes: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(text) {
        let ends_single_byte = sentence.chars().last().is_some_and(|c| c.len_utf8() == 1);
        let segment = if ends_single_byte {
            format!("{sentence} ")
        } else {
            sentence.to_string()
        };

        if current.len() + segment.len() <= max_bytes {
            current.push_str(&segment);
        } else {
            if !current.trim().is_empty() {
                chunks.push(current.trim().to_string());
            }
            current = segment;
        }
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}

/// Texts to synthesize for one request.
///
/// Without a budget the whole text is one pass. With a budget the text is
/// packed by [`chunk_text`]; if that leaves nothing (empty or blank text) the
/// text still goes through as a single pass, same as the unchunked path.
pub fn generation_chunks(text: &str, max_bytes: Option<usize>) -> Vec<String> {
    let chunks = match max_bytes {
        Some(max_bytes) => chunk_text(text, max_bytes),
        None => Vec::new(),
    };
    if chunks.is_empty() {
        vec![text.to_string()]
    } else {
        chunks
    }
}
