//! SQLite corpus (`verses` table of the reference Bible database)

use std::path::Path;
use std::path::PathBuf;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::Row;
use tracing::debug;
use tracing::info;

use super::CorpusSource;
use crate::errors::Result;
use crate::errors::VerseRagError;
use crate::models::CorpusUnit;

/// Ordinal = 0-based rank of the row inside its book, by rowid
const FETCH_VERSES_SQL: &str = r"
    SELECT
        rowid AS id,
        book_id AS section_id,
        ROW_NUMBER() OVER (PARTITION BY book_id ORDER BY rowid) - 1 AS ordinal,
        text,
        book,
        book_title,
        chapter,
        chapter_id,
        chapter_title,
        verse
    FROM verses
    ORDER BY rowid
";

pub struct SqliteCorpus {
    path: PathBuf,
}

impl SqliteCorpus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CorpusSource for SqliteCorpus {
    async fn fetch_units(&self) -> Result<Vec<CorpusUnit>> {
        if !self.path.exists() {
            return Err(VerseRagError::Ingestion(format!(
                "corpus database not found: {}",
                self.path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        info!("Fetching verses from {}", self.path.display());
        let rows = sqlx::query(FETCH_VERSES_SQL).fetch_all(&pool).await?;

        let mut units = Vec::with_capacity(rows.len());
        for row in rows {
            let ordinal: i64 = row.try_get("ordinal")?;
            units.push(CorpusUnit {
                id: row.try_get("id")?,
                section_id: row.try_get("section_id")?,
                ordinal: u32::try_from(ordinal).map_err(|_| {
                    VerseRagError::Ingestion(format!("ordinal out of range: {ordinal}"))
                })?,
                text: row.try_get::<Option<String>, _>("text")?.unwrap_or_default(),
                book: row.try_get::<Option<String>, _>("book")?.unwrap_or_default(),
                book_title: row
                    .try_get::<Option<String>, _>("book_title")?
                    .unwrap_or_default(),
                chapter: row.try_get::<Option<String>, _>("chapter")?.unwrap_or_default(),
                chapter_id: row.try_get::<Option<i64>, _>("chapter_id")?.unwrap_or_default(),
                chapter_title: row
                    .try_get::<Option<String>, _>("chapter_title")?
                    .unwrap_or_default(),
                verse: row.try_get::<Option<String>, _>("verse")?.unwrap_or_default(),
            });
        }
        pool.close().await;

        debug!("Fetched {} rows", units.len());
        Ok(units)
    }

    fn describe(&self) -> String {
        format!("sqlite corpus {}", self.path.display())
    }
}
