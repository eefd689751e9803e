//! In-memory [`SimilarityIndex`] implementation.
//!
//! Records and their vectors are held in plain `Vec`s. Every record's
//! searchable text is embedded once in [`InMemoryIndex::build`]; queries are
//! brute-force cosine similarity over the records that pass the filter.
//! Nothing is mutated after construction, so no locking is needed.

use std::sync::Arc;

use anyhow::{bail, ensure, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::embedding::{cosine_similarity, Embedder};
use crate::filter::FilterExpr;
use crate::models::Record;

use super::{Candidate, SimilarityIndex};

const EMBED_BATCH: usize = 64;

/// Read-only in-memory index.
pub struct InMemoryIndex {
    records: Vec<Record>,
    vectors: Vec<Vec<f32>>,
    embedder: Arc<dyn Embedder>,
}

impl InMemoryIndex {
    /// Embed `records` and build the index.
    ///
    /// Record ids must be exactly `"1"..="N"` in order; anything else is
    /// rejected so the id invariant holds for the life of the index.
    pub async fn build(records: Vec<Record>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        for (i, rec) in records.iter().enumerate() {
            let expected = (i + 1).to_string();
            if rec.id != expected {
                bail!(
                    "record ids must be dense and sequential: expected '{}' at position {}, found '{}'",
                    expected,
                    i,
                    rec.id
                );
            }
        }

        let mut vectors = Vec::with_capacity(records.len());
        for batch in records.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|r| r.searchable_text.clone()).collect();
            let embedded = embedder.embed(&texts).await?;
            ensure!(
                embedded.len() == texts.len(),
                "embedder returned {} vectors for {} texts",
                embedded.len(),
                texts.len()
            );
            vectors.extend(embedded);
        }

        debug!(
            records = records.len(),
            model = embedder.model_name(),
            dims = embedder.dims(),
            "built in-memory index"
        );

        Ok(Self {
            records,
            vectors,
            embedder,
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    fn rank(&self, query_vec: &[f32], top_k: usize, filter: Option<&FilterExpr>) -> Vec<Candidate> {
        let mut scored: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| filter.map_or(true, |f| f.matches(&r.metadata)))
            .map(|(i, _)| (i, cosine_similarity(query_vec, &self.vectors[i])))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(i, score)| {
                let r = &self.records[i];
                Candidate {
                    id: r.id.clone(),
                    score,
                    document: r.searchable_text.clone(),
                    metadata: r.metadata.clone(),
                }
            })
            .collect()
    }
}

#[async_trait]
impl SimilarityIndex for InMemoryIndex {
    async fn query(
        &self,
        texts: &[String],
        top_k: usize,
        filter: Option<&FilterExpr>,
    ) -> Result<Vec<Vec<Candidate>>> {
        ensure!(!texts.is_empty(), "query requires at least one text");
        let query_vecs = self.embedder.embed(texts).await?;
        ensure!(
            query_vecs.len() == texts.len(),
            "embedder returned {} vectors for {} query texts",
            query_vecs.len(),
            texts.len()
        );
        Ok(query_vecs
            .iter()
            .map(|qv| self.rank(qv, top_k, filter))
            .collect())
    }

    async fn get(&self, filter: Option<&FilterExpr>) -> Result<Vec<Record>> {
        Ok(self
            .records
            .iter()
            .filter(|r| filter.map_or(true, |f| f.matches(&r.metadata)))
            .cloned()
            .collect())
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::filter::{build_filter, Constraints};
    use crate::models::{FileMetadata, FileSource, FileType};

    fn record(id: usize, text: &str, source: FileSource, file_type: FileType) -> Record {
        Record {
            id: id.to_string(),
            searchable_text: text.to_string(),
            metadata: FileMetadata {
                author: "Dana".into(),
                source,
                file_title: text.to_string(),
                file_size: 1000,
                file_type,
                file_location_at_source: "team/meetings".into(),
                file_created_at: "2024-02-01".into(),
                file_last_updated_at: "2024-02-01".into(),
                file_url: format!("http://example.com/{}", id),
            },
        }
    }

    async fn index() -> InMemoryIndex {
        let records = vec![
            record(1, "team meeting notes", FileSource::GoogleDrive, FileType::Docx),
            record(2, "product roadmap", FileSource::Web, FileType::Pdf),
            record(3, "sprint planning board", FileSource::Avoma, FileType::Pptx),
        ];
        InMemoryIndex::build(records, Arc::new(HashingEmbedder::new(128)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_build_rejects_sparse_ids() {
        let records = vec![
            record(1, "a", FileSource::Web, FileType::Pdf),
            record(3, "b", FileSource::Web, FileType::Pdf),
        ];
        let err = InMemoryIndex::build(records, Arc::new(HashingEmbedder::new(8)))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("dense"));
    }

    #[tokio::test]
    async fn test_query_returns_one_list_per_text() {
        let idx = index().await;
        let out = idx
            .query(&["roadmap".into(), "sprint".into()], 10, None)
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0][0].id, "2");
        assert_eq!(out[1][0].id, "3");
    }

    #[tokio::test]
    async fn test_query_respects_top_k_and_filter() {
        let idx = index().await;
        let out = idx.query(&["notes".into()], 1, None).await.unwrap();
        assert_eq!(out[0].len(), 1);

        let filter = build_filter(&Constraints {
            source: Some(FileSource::Web),
            ..Default::default()
        });
        let out = idx
            .query(&["team meeting notes".into()], 10, filter.as_ref())
            .await
            .unwrap();
        assert_eq!(out[0].len(), 1);
        assert_eq!(out[0][0].metadata.source, FileSource::Web);
    }

    #[tokio::test]
    async fn test_get_is_unranked_id_order() {
        let idx = index().await;
        let all = idx.get(None).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(idx.len(), 3);
    }
}
