use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use verserag::corpus::MemoryCorpus;
use verserag::corpus::SqliteCorpus;
use verserag::embeddings::EmbeddingBackend;
use verserag::embeddings::TextEncoder;
use verserag::index::load_artifacts;
use verserag::ingest::IngestionPipeline;
use verserag::ingest::UnitFilter;
use verserag::reranker::RelevanceScorer;
use verserag::testing::HashEncoder;
use verserag::testing::KeywordScorer;
use verserag::AppConfig;
use verserag::CorpusUnit;
use verserag::Result;
use verserag::RetrievalEngine;
use verserag::VerseRagError;

const DIM: usize = 48;

fn corpus() -> Vec<CorpusUnit> {
    let genesis = [
        "Au commencement, Dieu créa le ciel et la terre.",
        "La terre était informe et vide, les ténèbres étaient au-dessus de l'abîme.",
        "Dieu dit : Que la lumière soit. Et la lumière fut.",
        "Dieu vit que la lumière était bonne, et Dieu sépara la lumière des ténèbres.",
        "Dieu appela la lumière jour, il appela les ténèbres nuit.",
    ];
    let psalm = [
        "Le Seigneur est mon berger : je ne manque de rien.",
        "Sur des prés d'herbe fraîche, il me fait reposer.",
        "LUI",
        "Il me conduit par le juste chemin pour l'honneur de son nom.",
    ];

    let mut units = Vec::new();
    for (ordinal, text) in genesis.iter().enumerate() {
        let mut unit = CorpusUnit::new(units.len() as i64 + 1, 1, ordinal as u32, *text);
        unit.book_title = "La Genèse".to_string();
        unit.chapter = "1".to_string();
        unit.verse = (ordinal + 1).to_string();
        units.push(unit);
    }
    for (ordinal, text) in psalm.iter().enumerate() {
        let mut unit = CorpusUnit::new(units.len() as i64 + 1, 2, ordinal as u32, *text);
        unit.book_title = "Psaumes".to_string();
        unit.chapter = "23".to_string();
        units.push(unit);
    }
    units
}

fn encoder() -> TextEncoder {
    TextEncoder::new(Arc::new(HashEncoder::new(DIM)), DIM, 4)
}

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.embeddings.dimension = DIM;
    config
}

fn paths(dir: &Path) -> (PathBuf, PathBuf) {
    (dir.join("index.bin"), dir.join("mapping.json"))
}

fn pipeline(dir: &Path, encoder: TextEncoder) -> IngestionPipeline {
    let (index, mapping) = paths(dir);
    IngestionPipeline::new(encoder, UnitFilter::from_config(&config()), index, mapping)
}

fn open_engine(dir: &Path) -> Result<RetrievalEngine> {
    let (index, mapping) = paths(dir);
    let artifacts = load_artifacts(&index, &mapping)?;
    RetrievalEngine::new(
        artifacts,
        encoder(),
        RelevanceScorer::new(Arc::new(KeywordScorer)),
        &config(),
    )
}

#[tokio::test]
async fn test_ingest_then_search() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let report = pipeline(dir.path(), encoder())
        .run(&MemoryCorpus::new(corpus()))
        .await?;
    assert_eq!(report.total_units, 9);
    assert_eq!(report.retained_units, 8);

    let engine = open_engine(dir.path())?;
    assert_eq!(engine.len(), 8);

    let results = engine.search("Dieu dit : Que la lumière soit")?;
    assert!(!results.is_empty());
    assert!(results.len() <= 5);
    assert_eq!(results[0].unit.id, 3);
    assert_eq!(results[0].unit.reference(), "La Genèse 1:3");
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));

    let context: Vec<i64> = results[0].context.iter().map(|u| u.id).collect();
    assert_eq!(context, vec![1, 2, 4, 5]);
    Ok(())
}

#[tokio::test]
async fn test_short_query_is_rejected_after_sanitizing() -> Result<()> {
    let dir = tempfile::tempdir()?;
    pipeline(dir.path(), encoder())
        .run(&MemoryCorpus::new(corpus()))
        .await?;
    let engine = open_engine(dir.path())?;

    let err = engine.search("<b>la</b>   lumière\u{0007} fut").unwrap_err();
    assert!(matches!(err, VerseRagError::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn test_context_respects_book_boundaries_and_gaps() -> Result<()> {
    let dir = tempfile::tempdir()?;
    pipeline(dir.path(), encoder())
        .run(&MemoryCorpus::new(corpus()))
        .await?;
    let engine = open_engine(dir.path())?;

    // last verse of Genesis
    let ids: Vec<i64> = engine.context(5, 3)?.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![2, 3, 4]);

    // first verse of the psalm
    let ids: Vec<i64> = engine.context(6, 3)?.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![7, 9]);

    // the dropped heading left a gap at ordinal 2
    let ids: Vec<i64> = engine.context(9, 1)?.iter().map(|u| u.id).collect();
    assert!(ids.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_ingestion_is_idempotent() -> Result<()> {
    let first = tempfile::tempdir()?;
    let second = tempfile::tempdir()?;

    let a = pipeline(first.path(), encoder())
        .run(&MemoryCorpus::new(corpus()))
        .await?;
    let b = pipeline(second.path(), encoder())
        .run(&MemoryCorpus::new(corpus()))
        .await?;
    assert_eq!(a.build_id, b.build_id);

    let (index_a, mapping_a) = paths(first.path());
    let (index_b, mapping_b) = paths(second.path());
    assert_eq!(std::fs::read(index_a)?, std::fs::read(index_b)?);
    assert_eq!(std::fs::read(mapping_a)?, std::fs::read(mapping_b)?);

    let query = "Le Seigneur est mon berger fidèle";
    assert_eq!(
        open_engine(first.path())?.search(query)?,
        open_engine(second.path())?.search(query)?
    );
    Ok(())
}

struct FailingEncoder;

impl EmbeddingBackend for FailingEncoder {
    fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(VerseRagError::Inference("out of memory".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

#[tokio::test]
async fn test_failed_rebuild_keeps_previous_artifacts() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let report = pipeline(dir.path(), encoder())
        .run(&MemoryCorpus::new(corpus()))
        .await?;

    let failing = TextEncoder::new(Arc::new(FailingEncoder), DIM, 4);
    let err = pipeline(dir.path(), failing)
        .run(&MemoryCorpus::new(corpus()))
        .await
        .unwrap_err();
    assert!(matches!(err, VerseRagError::Ingestion(_)));

    let (index, mapping) = paths(dir.path());
    let loaded = load_artifacts(&index, &mapping)?;
    assert_eq!(loaded.build_id, report.build_id);
    assert_eq!(loaded.entries.len(), 8);
    Ok(())
}

#[tokio::test]
async fn test_sqlite_corpus_end_to_end() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("bible.db");

    let pool = SqlitePool::connect_with(
        SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true),
    )
    .await?;
    sqlx::query(
        "CREATE TABLE verses (
            book TEXT, book_id INTEGER, book_title TEXT,
            chapter TEXT, chapter_id INTEGER, chapter_title TEXT,
            verse TEXT, text TEXT
        )",
    )
    .execute(&pool)
    .await?;
    for unit in corpus() {
        sqlx::query(
            "INSERT INTO verses (book, book_id, book_title, chapter, chapter_id, chapter_title, verse, text)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(if unit.section_id == 1 { "Gn" } else { "Ps" })
        .bind(unit.section_id)
        .bind(&unit.book_title)
        .bind(&unit.chapter)
        .bind(0i64)
        .bind("")
        .bind(&unit.verse)
        .bind(&unit.text)
        .execute(&pool)
        .await?;
    }
    pool.close().await;

    let report = pipeline(dir.path(), encoder())
        .run(&SqliteCorpus::new(&db_path))
        .await?;
    assert_eq!(report.retained_units, 8);

    let engine = open_engine(dir.path())?;
    let results = engine.search("Le Seigneur est mon berger fidèle")?;
    assert_eq!(results[0].unit.book, "Ps");
    assert_eq!(results[0].unit.ordinal, 0);
    Ok(())
}
