use std::collections::BTreeMap;

/// Disfluency vocabulary checked against each transcript token. Matching is
/// per whitespace-split token, so the multi-word entries only count when the
/// recognizer emits the whole phrase as a single token.
pub const FILLER_LEXICON: &[&str] = &[
    "um", "uh", "like", "you know", "so", "right", "actually", "basically", "i mean",
];

/// Punctuation stripped before tokens are compared against the lexicon.
const STRIPPED_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':'];

/// Count filler-word occurrences in a transcript. Only terms that actually
/// occur appear in the map; an empty transcript yields an empty map.
pub fn count_filler_words(transcript: &str) -> BTreeMap<String, u32> {
    let cleaned: String = transcript
        .to_lowercase()
        .chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect();

    let mut counts = BTreeMap::new();
    for token in cleaned.split_whitespace() {
        if FILLER_LEXICON.contains(&token) {
            *counts.entry(token.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

pub fn total_fillers(counts: &BTreeMap<String, u32>) -> u32 {
    counts.values().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_transcript_yields_empty_map() {
        assert!(count_filler_words("").is_empty());
    }

    #[test]
    fn counts_repeated_fillers() {
        let counts = count_filler_words("um um um");
        assert_eq!(counts.len(), 1);
        assert_eq!(counts["um"], 3);
        assert_eq!(total_fillers(&counts), 3);
    }

    #[test]
    fn strips_punctuation_and_lowercases() {
        let counts = count_filler_words("Um, so... RIGHT! Actually; basically:");
        assert_eq!(counts["um"], 1);
        assert_eq!(counts["so"], 1);
        assert_eq!(counts["right"], 1);
        assert_eq!(counts["actually"], 1);
        assert_eq!(counts["basically"], 1);
    }

    #[test]
    fn non_fillers_are_ignored() {
        let counts = count_filler_words("the quick brown fox");
        assert!(counts.is_empty());
    }

    #[test]
    fn multi_word_lexicon_entries_never_match_split_tokens() {
        // "you know" tokenizes into "you" and "know", neither of which is a
        // lexicon entry on its own.
        let counts = count_filler_words("you know i mean you know");
        assert!(counts.is_empty());
    }
}
