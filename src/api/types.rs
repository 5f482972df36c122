//! API request and response types

use serde::Deserialize;
use serde::Serialize;

use crate::models::CorpusUnit;
use crate::models::SearchResult;
use crate::rag::relevance_label;
use crate::rag::score_percent;

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `loading`, `healthy` or `failed`
    pub status: String,
    pub version: String,
    /// Engine loaded and serving
    pub ready: bool,
    /// Indexed verses, 0 until ready
    pub units: usize,
}

/// Verse search request
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

/// One displayed hit
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: i64,
    pub reference: String,
    pub book: String,
    pub book_title: String,
    pub chapter: String,
    pub chapter_title: String,
    pub verse: String,
    pub text: String,
    pub score: f32,
    pub pct: u32,
    pub label: String,
    pub context: Vec<CorpusUnit>,
}

impl From<SearchResult> for SearchHit {
    fn from(result: SearchResult) -> Self {
        let unit = result.unit;
        Self {
            reference: unit.reference(),
            id: unit.id,
            book: unit.book,
            book_title: unit.book_title,
            chapter: unit.chapter,
            chapter_title: unit.chapter_title,
            verse: unit.verse,
            text: unit.text,
            score: result.score,
            pct: score_percent(result.score),
            label: relevance_label(result.score).to_string(),
            context: result.context,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub elapsed_ms: u64,
}
