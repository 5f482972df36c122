//! Human-readable relevance bands for normalized scores

pub const VERY_RELEVANT: f32 = 0.8;
pub const RELEVANT: f32 = 0.5;
pub const SOMEWHAT_RELEVANT: f32 = 0.3;

pub fn relevance_label(score: f32) -> &'static str {
    if score >= VERY_RELEVANT {
        "very relevant"
    } else if score >= RELEVANT {
        "relevant"
    } else if score >= SOMEWHAT_RELEVANT {
        "somewhat relevant"
    } else {
        "low relevance"
    }
}

/// Score as a whole percentage, truncated toward zero (0.876 shows as 87)
pub fn score_percent(score: f32) -> u32 {
    (score.clamp(0.0, 1.0) * 100.0) as u32
}
