use super::DEFAULT_MAX_CHARS_PER_LINE;

/// Characters that close a caption clause
const CLAUSE_BREAKS: [char; 4] = ['.', '?', '!', ','];

/// Splits narration text into ordered caption chunks
#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    max_chars: usize,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHARS_PER_LINE)
    }
}

impl Segmenter {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Segment `text` into caption chunks.
    ///
    /// Always returns at least one chunk: when nothing survives splitting the
    /// original text is returned unchanged.
    pub fn segment(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();

        for clause in split_clauses(text) {
            if char_len(clause) > self.max_chars {
                self.pack_words(clause, &mut chunks);
            } else {
                chunks.push(clause.to_string());
            }
        }

        if chunks.is_empty() {
            chunks.push(text.to_string());
        }
        chunks
    }

    /// Greedily pack whole words into chunks no longer than `max_chars`.
    /// A word that alone exceeds the limit becomes its own chunk.
    fn pack_words(&self, clause: &str, chunks: &mut Vec<String>) {
        let mut current = String::new();

        for word in clause.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }

            if char_len(&current) + 1 + char_len(word) > self.max_chars {
                chunks.push(std::mem::take(&mut current));
                current.push_str(word);
            } else {
                current.push(' ');
                current.push_str(word);
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }
    }
}

/// Index of the chunk active at `progress` when there are `count` chunks
pub fn caption_index(progress: f64, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let progress = progress.clamp(0.0, 1.0);
    ((progress * count as f64).floor() as usize).min(count - 1)
}

/// Split after every run of clause-breaking punctuation, trimming and
/// dropping empty clauses.
fn split_clauses(text: &str) -> Vec<&str> {
    let mut clauses = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if !CLAUSE_BREAKS.contains(&ch) {
            continue;
        }

        let mut end = idx + ch.len_utf8();
        while let Some(&(next_idx, next)) = chars.peek() {
            if !CLAUSE_BREAKS.contains(&next) {
                break;
            }
            end = next_idx + next.len_utf8();
            chars.next();
        }

        push_trimmed(&mut clauses, &text[start..end]);
        start = end;
    }

    push_trimmed(&mut clauses, &text[start..]);
    clauses
}

fn push_trimmed<'a>(clauses: &mut Vec<&'a str>, clause: &'a str) {
    let clause = clause.trim();
    if !clause.is_empty() {
        clauses.push(clause);
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_korean_clauses() {
        let chunks = Segmenter::default().segment("안녕하세요, 오늘은 맑습니다.");
        assert_eq!(chunks, vec!["안녕하세요,", "오늘은 맑습니다."]);
    }

    #[test]
    fn test_punctuation_stays_attached() {
        let chunks = Segmenter::default().segment("Wait... What?! Fine");
        assert_eq!(chunks, vec!["Wait...", "What?!", "Fine"]);
    }

    #[test]
    fn test_long_clause_is_word_packed() {
        let segmenter = Segmenter::new(10);
        let chunks = segmenter.segment("the quick brown fox jumps over the lazy dog.");

        assert_eq!(chunks, vec!["the quick", "brown fox", "jumps over", "the lazy", "dog."]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn test_unsplittable_word_kept_whole() {
        let segmenter = Segmenter::new(5);
        let chunks = segmenter.segment("a supercalifragilistic b");

        assert_eq!(chunks, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn test_word_order_preserved() {
        let text = "Once upon a time, in a kingdom far far away, there lived a very curious dragon! \
                    Did it sleep? Never, not even once.";
        for max in [1, 5, 12, 25, 80] {
            let chunks = Segmenter::new(max).segment(text);
            let rejoined: Vec<String> = chunks.iter().flat_map(|c| words(c)).collect();
            assert_eq!(rejoined, words(text), "max_chars = {max}");

            for chunk in &chunks {
                let len = chunk.chars().count();
                assert!(len <= max || words(chunk).len() == 1, "chunk {chunk:?} over {max}");
            }
        }
    }

    #[test]
    fn test_never_empty() {
        let segmenter = Segmenter::default();
        assert_eq!(segmenter.segment("   "), vec!["   "]);
        assert_eq!(segmenter.segment("..."), vec!["..."]);
        assert_eq!(segmenter.segment("no punctuation"), vec!["no punctuation"]);
    }

    #[test]
    fn test_caption_index() {
        assert_eq!(caption_index(0.0, 3), 0);
        assert_eq!(caption_index(0.34, 3), 1);
        assert_eq!(caption_index(0.999, 3), 2);
        assert_eq!(caption_index(1.0, 3), 2);
        assert_eq!(caption_index(1.5, 3), 2);
        assert_eq!(caption_index(0.5, 1), 0);
    }
}
