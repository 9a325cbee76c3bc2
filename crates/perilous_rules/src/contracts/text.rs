//! Text helpers shared by the parsers and validators.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Words too common to count as content when comparing texts.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "into", "onto", "over", "under", "your", "you", "are",
    "was", "but", "not", "all", "any", "its", "it's", "this", "that", "then", "than", "there",
    "their", "they", "them", "have", "has", "had", "will", "would", "can", "could", "out", "off",
    "of", "to", "in", "on", "at", "by", "as", "or", "an", "a", "is", "be", "my", "me", "i", "up",
    "down", "what", "who", "how", "why", "when", "where", "just", "very", "some", "one", "two",
];

/// Words that introduce model commentary rather than content.
const PREAMBLE_OPENERS: &[&str] = &[
    "sure", "okay", "ok", "certainly", "here", "here's", "absolutely", "of course", "alright",
    "great", "below",
];

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Counts whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Lowercases and strips everything except letters, digits and single spaces.
pub fn normalize(text: &str) -> String {
    let kept: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    collapse_whitespace(&kept)
}

/// Lowercase alphanumeric tokens.
pub fn tokens(text: &str) -> Vec<String> {
    normalize(text).split(' ').filter(|t| !t.is_empty()).map(String::from).collect()
}

/// Returns true if the token sequence of `phrase` occurs in `haystack`.
pub fn contains_phrase(haystack: &[String], phrase: &str) -> bool {
    let needle = tokens(phrase);
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| window == needle.as_slice())
}

/// Content words: at least three letters, not a stopword, trailing "s" stripped.
pub fn content_words(text: &str) -> Vec<String> {
    tokens(text)
        .into_iter()
        .filter(|t| t.len() >= 3 && !STOPWORDS.contains(&t.as_str()))
        .map(|t| stem(&t))
        .collect()
}

fn stem(word: &str) -> String {
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

/// Splits text into sentences on `.`, `!` and `?` followed by whitespace.
///
/// Closing quotes and brackets stay with their sentence. A trailing fragment
/// without terminal punctuation is returned as its own sentence.
pub fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            while let Some(&next) = chars.peek() {
                if matches!(next, '.' | '!' | '?' | '"' | '\'' | '\u{201d}' | '\u{2019}' | ')') {
                    current.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            if chars.peek().is_none_or(|next| next.is_whitespace()) {
                let sentence = current.trim();
                if !sentence.is_empty() {
                    out.push(sentence.to_string());
                }
                current.clear();
            }
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        out.push(rest.to_string());
    }
    out
}

/// Returns true if the text ends with terminal punctuation (ignoring closing quotes).
pub fn ends_with_terminal(text: &str) -> bool {
    text.trim_end()
        .trim_end_matches(['"', '\'', '\u{201d}', '\u{2019}', ')'])
        .ends_with(['.', '!', '?'])
}

/// Cuts a possibly truncated text back to its last complete sentence.
///
/// Text without any complete sentence gets a period appended instead.
pub fn trim_to_complete_sentences(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() || ends_with_terminal(text) {
        return text.to_string();
    }
    let complete: Vec<String> = sentences(text)
        .into_iter()
        .filter(|s| ends_with_terminal(s))
        .collect();
    if complete.is_empty() {
        format!("{}.", text.trim_end_matches([',', ';', ':', '-']))
    } else {
        complete.join(" ")
    }
}

/// Strips wrapping quotes, markdown emphasis and trailing separators.
pub fn strip_decorations(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| {
            matches!(c, '"' | '\'' | '`' | '*' | '_' | '\u{201c}' | '\u{201d}' | '|' | ',' | ';')
                || c.is_whitespace()
        })
        .to_string()
}

/// Drops code fences, blank lines and leading commentary lines.
///
/// A leading line counts as commentary when it opens with a stock opener
/// ("Sure", "Here is") or ends with a colon and carries no marker of its own.
pub fn strip_preamble(raw: &str) -> String {
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("```"))
        .collect();

    let first_content = lines
        .iter()
        .position(|line| !is_commentary(line))
        .unwrap_or(lines.len());

    lines[first_content..].join("\n")
}

fn is_commentary(line: &str) -> bool {
    let lower = line.to_lowercase();
    let trimmed = lower.trim_start_matches(|c: char| !c.is_alphanumeric());
    let opener = PREAMBLE_OPENERS.iter().any(|opener| {
        trimmed.starts_with(opener)
            && trimmed[opener.len()..]
                .chars()
                .next()
                .is_none_or(|c| !c.is_alphanumeric())
    });
    let label_only = trimmed.ends_with(':') && !trimmed.trim_end_matches(':').contains(':');
    let short = word_count(trimmed) <= 12 || trimmed.ends_with(['!', ':']);
    (opener && short) || (label_only && word_count(trimmed) > 1)
}

/// Extracts labelled fields such as `PHRASE: ...` from raw text.
///
/// Markers are matched case-insensitively, in any order, on one line or
/// several. Each value runs until the next marker. The first occurrence of a
/// marker wins.
pub fn extract_fields(text: &str, markers: &[&str]) -> HashMap<String, String> {
    let pattern = format!(r"(?i)\b({})\b\s*[:=]", markers.join("|"));
    let mut fields = HashMap::new();
    let Ok(regex) = Regex::new(&pattern) else {
        return fields;
    };

    let hits: Vec<(String, usize, usize)> = regex
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?.as_str().to_uppercase();
            Some((name, whole.start(), whole.end()))
        })
        .collect();

    for (i, (name, _, value_start)) in hits.iter().enumerate() {
        let value_end = hits.get(i + 1).map_or(text.len(), |(_, start, _)| *start);
        let value = strip_decorations(&collapse_whitespace(&text[*value_start..value_end]));
        fields.entry(name.clone()).or_insert(value);
    }
    fields
}

/// Returns the outermost `{...}` slice of a text, if any.
pub fn json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
