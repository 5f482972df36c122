use serde::Deserialize;
use serde::Serialize;

/// One indivisible text entry of the corpus (a verse).
///
/// The same record is persisted as a mapping entry, so the field names are
/// part of the on-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusUnit {
    /// Stable identifier (source row id)
    pub id: i64,
    /// Containing section (book); context windows never cross it
    pub section_id: i64,
    /// 0-based position within the section, strictly increasing
    pub ordinal: u32,
    pub text: String,
    #[serde(default)]
    pub book: String,
    #[serde(default)]
    pub book_title: String,
    #[serde(default)]
    pub chapter: String,
    #[serde(default)]
    pub chapter_id: i64,
    #[serde(default)]
    pub chapter_title: String,
    /// Verse label; empty for headings and non-numbered lines
    #[serde(default)]
    pub verse: String,
}

impl CorpusUnit {
    /// Bare unit without display metadata
    pub fn new(id: i64, section_id: i64, ordinal: u32, text: impl Into<String>) -> Self {
        Self {
            id,
            section_id,
            ordinal,
            text: text.into(),
            book: String::new(),
            book_title: String::new(),
            chapter: String::new(),
            chapter_id: 0,
            chapter_title: String::new(),
            verse: String::new(),
        }
    }

    /// Length in characters, not bytes
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Human-readable reference such as `La Genèse 1:3`
    pub fn reference(&self) -> String {
        let title = if self.book_title.is_empty() {
            &self.book
        } else {
            &self.book_title
        };
        match (self.chapter.is_empty(), self.verse.is_empty()) {
            (false, false) => format!("{title} {}:{}", self.chapter, self.verse),
            (false, true) => format!("{title} {}", self.chapter),
            _ => title.clone(),
        }
    }
}

/// A reranked hit with its surrounding verses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub unit: CorpusUnit,
    /// Sigmoid-normalized relevance in [0, 1]
    pub score: f32,
    /// Neighbors from the same section, in ordinal order
    pub context: Vec<CorpusUnit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_use_chars_and_whitespace_words() {
        let unit = CorpusUnit::new(1, 1, 0, "Dieu dit :\n« Que la lumière soit. »");
        assert_eq!(unit.word_count(), 9);
        assert_eq!(unit.char_count(), 35);
    }

    #[test]
    fn test_reference_formats() {
        let mut unit = CorpusUnit::new(1, 1, 0, "text");
        unit.book = "Gn".to_string();
        unit.book_title = "La Genèse".to_string();
        unit.chapter = "1".to_string();
        unit.verse = "3".to_string();
        assert_eq!(unit.reference(), "La Genèse 1:3");

        unit.verse.clear();
        assert_eq!(unit.reference(), "La Genèse 1");

        unit.book_title.clear();
        unit.chapter.clear();
        assert_eq!(unit.reference(), "Gn");
    }

    #[test]
    fn test_search_result_serializes_flat() {
        let result = SearchResult {
            unit: CorpusUnit::new(7, 2, 3, "some verse text here"),
            score: 0.75,
            context: vec![CorpusUnit::new(6, 2, 2, "previous verse text")],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["section_id"], 2);
        assert_eq!(json["ordinal"], 3);
        assert_eq!(json["context"][0]["id"], 6);
        assert!(json["context"][0].get("score").is_none());
    }
}
