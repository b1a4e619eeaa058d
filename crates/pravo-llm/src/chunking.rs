//! Splitting long texts into embeddable chunks.
//!
//! Target chunk length is ~2,048 characters (~512 tokens) with a ~50-word
//! overlap between neighbours. A cut prefers the nearest sentence boundary
//! within a 10% slack window behind the target; only when no boundary is
//! available does it fall on the raw character limit.

/// Chunking parameters.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Target chunk length in characters.
    pub target_chars: usize,
    /// Overlap between consecutive chunks, in words.
    pub overlap_words: usize,
    /// Slack fraction for the sentence-boundary search.
    pub slack: f32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_chars: 2048,
            overlap_words: 50,
            slack: 0.1,
        }
    }
}

/// Splits `text` into chunks per the config. Returns the whole text as one
/// chunk when it fits the target.
pub fn split_for_embedding(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= config.target_chars {
        let trimmed = text.trim();
        return if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        };
    }

    let slack = (config.target_chars as f32 * config.slack) as usize;
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let hard_end = (start + config.target_chars).min(chars.len());
        let end = if hard_end == chars.len() {
            hard_end
        } else {
            sentence_boundary_before(&chars, hard_end, slack).unwrap_or(hard_end)
        };

        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end == chars.len() {
            break;
        }
        // The overlap rewind must still advance past the previous start.
        start = overlap_start(&chars, end, config.overlap_words).max(start + 1);
    }

    chunks
}

/// Finds the last sentence end in `(from - slack, from]`, returning the
/// index one past the terminator.
fn sentence_boundary_before(chars: &[char], from: usize, slack: usize) -> Option<usize> {
    let floor = from.saturating_sub(slack);
    (floor..from)
        .rev()
        .find(|&i| matches!(chars[i], '.' | '!' | '?' | '\n'))
        .map(|i| i + 1)
}

/// Rewinds `overlap_words` whitespace-separated words from `end`.
fn overlap_start(chars: &[char], end: usize, overlap_words: usize) -> usize {
    let mut words = 0;
    let mut i = end;
    let mut in_word = false;
    while i > 0 && words < overlap_words {
        i -= 1;
        if chars[i].is_whitespace() {
            if in_word {
                words += 1;
                in_word = false;
            }
        } else {
            in_word = true;
        }
    }
    // Never rewind to (or before) a point that would stall the walk.
    if i == 0 { end.saturating_sub(1).max(1) } else { i + 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = split_for_embedding("Суд ухвалив рішення.", &ChunkingConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "Суд ухвалив рішення.");
    }

    #[test]
    fn test_empty_text_no_chunks() {
        assert!(split_for_embedding("   ", &ChunkingConfig::default()).is_empty());
    }

    #[test]
    fn test_long_text_splits_with_overlap() {
        let sentence = "Позивач звернувся до суду з позовом про стягнення заборгованості. ";
        let text = sentence.repeat(100);
        let config = ChunkingConfig::default();
        let chunks = split_for_embedding(&text, &config);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            // Slack allows a cut slightly past nothing; chunks never exceed
            // the raw target.
            assert!(chunk.chars().count() <= config.target_chars);
        }
        // Consecutive chunks share the overlap words.
        let tail: String = chunks[0]
            .split_whitespace()
            .rev()
            .take(5)
            .collect::<Vec<_>>()
            .join(" ");
        assert!(!tail.is_empty());
        assert!(chunks[1].contains(tail.split(' ').next_back().unwrap()));
    }

    #[test]
    fn test_prefers_sentence_boundary() {
        // A sentence end sits just inside the slack window before the
        // 2048-char target; the cut should land right after it.
        let mut text = "а".repeat(1950);
        text.push('.');
        text.push(' ');
        text.push_str(&"б".repeat(500));
        let chunks = split_for_embedding(&text, &ChunkingConfig::default());
        assert!(chunks[0].ends_with('.'));
    }

    #[test]
    fn test_no_boundary_falls_back_to_hard_cut() {
        let text = "г".repeat(5000);
        let config = ChunkingConfig::default();
        let chunks = split_for_embedding(&text, &config);
        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0].chars().count(), config.target_chars);
    }
}
