use serde::{Deserialize, Serialize};

/// Discord rejects message content longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Serialize)]
pub struct CreateDmRequest<'a> {
    pub recipient_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateMessageRequest<'a> {
    pub content: &'a str,
}

/// The part of a channel object we use.
#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub id: String,
}

/// Body of a 429 response.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimited {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub retry_after: f64,
}

/// Split `text` into pieces that fit in one Discord message, preferring
/// line breaks as cut points.
pub fn split_content(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len <= limit {
            current.push_str(line);
            current_len += line_len;
            continue;
        }
        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len <= limit {
            current.push_str(line);
            current_len = line_len;
            continue;
        }
        // A single line longer than the limit is cut on character boundaries.
        let chars: Vec<char> = line.chars().collect();
        for piece in chars.chunks(limit) {
            if piece.len() == limit {
                chunks.push(piece.iter().collect());
            } else {
                current = piece.iter().collect();
                current_len = piece.len();
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(split_content("hello", 2000), vec!["hello".to_string()]);
        assert!(split_content("", 2000).is_empty());
    }

    #[test]
    fn test_splits_on_lines() {
        let text = "aaaa\nbbbb\ncccc";
        let chunks = split_content(text, 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb\n".to_string(), "cccc".to_string()]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_long_line_counts_chars_not_bytes() {
        let text = "ا".repeat(25);
        let chunks = split_content(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), text);
    }
}
