//! Deterministic extractive summaries.

/// Select leading sentences of `text` up to a word budget.
///
/// The first usable sentence is always included, even when it alone blows
/// the budget; unpunctuated text falls back to a truncated prefix.
pub fn extractive_summary(text: &str, max_words: usize) -> String {
    let mut picked: Vec<String> = Vec::new();
    let mut used_words = 0usize;

    for sentence in sentences(text) {
        let sentence = truncate_chars(sentence, 180);
        let words = count_words(&sentence);
        if words == 0 {
            continue;
        }
        if !picked.is_empty() && used_words + words > max_words {
            break;
        }
        used_words += words;
        picked.push(sentence);
        if used_words >= max_words {
            break;
        }
    }

    if picked.is_empty() {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return String::new();
        }
        return truncate_chars(trimmed, 200);
    }

    let mut summary = picked.join(". ");
    summary.push('.');
    summary
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c| matches!(c, '.' | '!' | '?'))
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars - 1).collect();
    truncated.push('…');
    truncated
}

fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
