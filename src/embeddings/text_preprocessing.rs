//! Text preprocessing utilities for embedding and reranking
//!
//! Corpus texts are only flattened onto one line before they reach a model.
//! User queries get the full treatment: markup and control characters are
//! deleted, whitespace collapsed and the result truncated.

/// Flatten a text onto one line for model input.
///
/// Verses carry hard line breaks from the source layout; sentence models
/// treat them as noise.
pub fn clean_for_model(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Sanitize a raw user query.
///
/// Deletes markup tags and non-whitespace control characters, collapses
/// whitespace and keeps at most `max_chars` characters. Deleted characters
/// never split a word: `"a\0b"` becomes `"ab"`. The word-count rule is
/// applied by the caller on the returned text.
pub fn sanitize_query(raw: &str, max_chars: usize) -> String {
    let without_markup = strip_markup(raw);
    let normalized = normalize_whitespace(&remove_control_chars(&without_markup));
    truncate_chars(&normalized, max_chars)
}

/// Number of whitespace-separated words
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Delete `<tag ...>` sequences. Text on either side is joined as is.
///
/// A `<` that does not open a tag (e.g. `a < b`) is kept verbatim.
pub fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let opens_tag = after
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'));
        match (opens_tag, after.find('>')) {
            (true, Some(end)) => {
                out.push_str(&rest[..start]);
                rest = &after[end + 1..];
            }
            _ => {
                out.push_str(&rest[..=start]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

// \t, \n and friends stay: they separate words
fn remove_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_for_model_flattens_newlines() {
        assert_eq!(
            clean_for_model("AU COMMENCEMENT,\nDieu créa\r\nle ciel"),
            "AU COMMENCEMENT, Dieu créa le ciel"
        );
    }

    #[test]
    fn test_strip_markup_removes_tags() {
        assert_eq!(
            strip_markup("<b>amour</b> de <script>x</script>Dieu"),
            "amour de xDieu"
        );
    }

    #[test]
    fn test_sanitize_query_deletes_script_tags() {
        assert_eq!(
            sanitize_query("<script>alert(\"x\")</script>hello world", 300),
            "alert(\"x\")hello world"
        );
    }

    #[test]
    fn test_sanitize_query_deletes_null_bytes() {
        assert_eq!(sanitize_query("hello\0world", 300), "helloworld");
        let joined = sanitize_query("un\0deux\0trois\0quatre\0cinq", 300);
        assert_eq!(word_count(&joined), 1);
    }

    #[test]
    fn test_strip_markup_keeps_lone_angle_brackets() {
        assert_eq!(strip_markup("a < b and c > d"), "a < b and c > d");
        assert_eq!(strip_markup("unterminated <tag"), "unterminated <tag");
    }

    #[test]
    fn test_sanitize_query_collapses_whitespace_and_controls() {
        let query = sanitize_query("  Que\tdit\u{0007} la\n\n Bible  ", 300);
        assert_eq!(query, "Que dit la Bible");
        assert_eq!(sanitize_query("Dieu\u{0007}dit", 300), "Dieudit");
    }

    #[test]
    fn test_sanitize_query_truncates_on_char_boundary() {
        let query = sanitize_query("éééé ééé", 6);
        assert_eq!(query, "éééé é");
        assert_eq!(sanitize_query("abc def", 4), "abc");
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("one two  three"), 3);
        assert_eq!(word_count("   "), 0);
    }
}
