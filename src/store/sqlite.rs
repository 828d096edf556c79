//! SQLite-backed [`ChunkStore`].
//!
//! Chunks live in `chunks` (with `document_id` as the explicit ownership
//! index) and are mirrored into the `chunks_fts` FTS5 table. When an
//! embedding provider is configured the store embeds text on insert and
//! answers queries by cosine distance over `chunk_vectors`; otherwise it
//! answers with FTS5 BM25 ranking.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::config::EmbeddingConfig;
use crate::embedding::{self, blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{owning_document_id, ChunkRecord, SearchResult};

use super::{query_terms, ChunkStore};

pub struct SqliteChunkStore {
    pool: SqlitePool,
    embedding: EmbeddingConfig,
}

impl SqliteChunkStore {
    pub fn new(pool: SqlitePool, embedding: EmbeddingConfig) -> Self {
        Self { pool, embedding }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn keyword_query(&self, text: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let terms = query_terms(text);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        // Quoted terms joined by OR: any shared word is a candidate, BM25 orders them.
        let match_expr = terms
            .iter()
            .map(|t| format!("\"{}\"", t))
            .collect::<Vec<_>>()
            .join(" OR ");

        let rows = sqlx::query(
            r#"
            SELECT m.chunk_id, c.text, c.filename, m.score
            FROM (
                SELECT chunk_id, rank AS score
                FROM chunks_fts
                WHERE chunks_fts MATCH ?
                ORDER BY rank
                LIMIT ?
            ) m
            JOIN chunks c ON c.id = m.chunk_id
            ORDER BY m.score
            "#,
        )
        .bind(&match_expr)
        .bind(top_k as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| SearchResult {
                chunk_id: row.get("chunk_id"),
                content: row.get("text"),
                source: row.get("filename"),
                distance: bm25_distance(row.get("score")),
            })
            .collect())
    }

    async fn vector_query(&self, text: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let query_vec = embedding::embed_query(&self.embedding, text).await?;

        let rows = sqlx::query(
            r#"
            SELECT cv.chunk_id, cv.embedding, c.text, c.filename
            FROM chunk_vectors cv
            JOIN chunks c ON c.id = cv.chunk_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut results: Vec<SearchResult> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let similarity = cosine_similarity(&query_vec, &blob_to_vec(&blob)) as f64;
                SearchResult {
                    chunk_id: row.get("chunk_id"),
                    content: row.get("text"),
                    source: row.get("filename"),
                    distance: (1.0 - similarity).max(0.0),
                }
            })
            .collect();

        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        Ok(results)
    }
}

/// FTS5 `rank` is negated BM25 (more negative is better); map it onto `(0, 1]`.
fn bm25_distance(rank: f64) -> f64 {
    1.0 / (1.0 + (-rank).max(0.0))
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    async fn add(&self, records: &[ChunkRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let owners = records
            .iter()
            .map(|r| {
                owning_document_id(&r.id)
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("malformed chunk id: {}", r.id))
            })
            .collect::<Result<Vec<_>>>()?;

        // Embed before opening the transaction so a provider failure leaves nothing behind.
        let vectors = if self.embedding.is_enabled() {
            let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
            Some(embedding::embed_texts(&self.embedding, &texts).await?)
        } else {
            None
        };
        let model = embedding::model_name(&self.embedding);
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;

        for (i, (record, document_id)) in records.iter().zip(owners.iter()).enumerate() {
            sqlx::query(
                "INSERT INTO chunks (id, document_id, chunk_index, filename, text, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&record.id)
            .bind(document_id)
            .bind(record.metadata.chunk_index as i64)
            .bind(&record.metadata.filename)
            .bind(&record.text)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            sqlx::query("INSERT INTO chunks_fts (chunk_id, document_id, text) VALUES (?, ?, ?)")
                .bind(&record.id)
                .bind(document_id)
                .bind(&record.text)
                .execute(&mut *tx)
                .await?;

            if let Some(vecs) = &vectors {
                let vector = &vecs[i];
                sqlx::query(
                    "INSERT INTO chunk_vectors (chunk_id, document_id, model, dims, embedding) \
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(&record.id)
                .bind(document_id)
                .bind(&model)
                .bind(vector.len() as i64)
                .bind(vec_to_blob(vector))
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if self.embedding.is_enabled() {
            self.vector_query(text, top_k).await
        } else {
            self.keyword_query(text, top_k).await
        }
    }

    async fn ids(&self) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar("SELECT id FROM chunks ORDER BY document_id, chunk_index")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn chunk_ids_for_document(&self, document_id: &str) -> Result<Vec<String>> {
        let ids =
            sqlx::query_scalar("SELECT id FROM chunks WHERE document_id = ? ORDER BY chunk_index")
                .bind(document_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query("DELETE FROM chunk_vectors WHERE chunk_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM chunks_fts WHERE chunk_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM chunks WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{chunk_id, ChunkMetadata};
    use crate::{db, migrate};

    async fn open_store(tmp: &tempfile::TempDir) -> SqliteChunkStore {
        let mut config = Config::default();
        config.paths.vector_db_dir = tmp.path().join("vector_db");
        let pool = db::connect(&config).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        SqliteChunkStore::new(pool, config.embedding)
    }

    fn records(doc: &str, filename: &str, texts: &[&str]) -> Vec<ChunkRecord> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| ChunkRecord {
                id: chunk_id(doc, i),
                text: t.to_string(),
                metadata: ChunkMetadata {
                    filename: filename.to_string(),
                    chunk_index: i,
                },
            })
            .collect()
    }

    #[tokio::test]
    async fn keyword_query_ranks_and_reports_source() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        store
            .add(&records(
                "doc-a",
                "rust.txt",
                &["Cargo builds Rust crates.", "Borrowing rules in Rust."],
            ))
            .await
            .unwrap();
        store
            .add(&records("doc-b", "garden.txt", &["Tomatoes need sun."]))
            .await
            .unwrap();

        let results = store.query("How does borrowing work?", 3).await.unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].chunk_id, "doc-a_1");
        assert_eq!(results[0].source, "rust.txt");
        for pair in results.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
        for r in &results {
            assert!(r.distance > 0.0 && r.distance <= 1.0, "distance {}", r.distance);
        }

        assert!(store.query("?!", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_by_document_index_purges_search() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        store
            .add(&records("doc-a", "a.txt", &["alpha one", "alpha two"]))
            .await
            .unwrap();
        store
            .add(&records("doc-b", "b.txt", &["alpha three"]))
            .await
            .unwrap();

        let ids = store.chunk_ids_for_document("doc-a").await.unwrap();
        assert_eq!(ids, vec!["doc-a_0", "doc-a_1"]);
        store.delete(&ids).await.unwrap();

        let results = store.query("alpha", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(owning_document_id(&results[0].chunk_id), Some("doc-b"));
        assert_eq!(store.ids().await.unwrap(), vec!["doc-b_0"]);
    }

    #[test]
    fn bm25_distance_is_bounded_and_monotonic() {
        assert_eq!(bm25_distance(0.0), 1.0);
        assert!(bm25_distance(-5.0) < bm25_distance(-1.0));
        assert!(bm25_distance(-1e9) > 0.0);
        assert_eq!(bm25_distance(0.5), 1.0);
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        migrate::run_migrations(store.pool()).await.unwrap();
        assert!(store.ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn enabled_provider_failure_leaves_store_untouched() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut store = open_store(&tmp).await;
        store.embedding = EmbeddingConfig {
            provider: "ollama".to_string(),
            model: Some("nomic-embed-text".to_string()),
            url: Some("http://127.0.0.1:1".to_string()),
            timeout_secs: 2,
            ..EmbeddingConfig::default()
        };

        let result = store.add(&records("doc-a", "a.txt", &["text"])).await;
        assert!(result.is_err());
        assert!(store.ids().await.unwrap().is_empty());
    }
}
