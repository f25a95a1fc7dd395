use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RetrievalError, Result};

/// A retrievable unit of source text plus the embedding space it was
/// written into. Invariant: `embedding_space_tag` is non-empty and of the
/// form `<provider>:<model>:dim=<N>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorChunk {
    pub chunk_id: String,
    pub source_doc: String,
    pub page: Option<u32>,
    pub content: String,
    pub embedding_space_tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    chunk: VectorChunk,
    vector: Vec<f32>,
}

/// Distance metric used to rank chunks. Lower score is more similar for
/// both variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorDistance {
    Cosine,
    L2,
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - (dot / (norm_a * norm_b))
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt()
}

/// Brute-force, in-memory vector collection scoped to a single
/// `collection_name`, persisted as a flat bincode file. No external vector
/// database — this store only needs to support `upsert` + `search` well
/// enough for the query path to exercise.
pub struct VectorStore {
    collection_name: String,
    path: PathBuf,
    distance: VectorDistance,
    records: Vec<StoredRecord>,
}

impl VectorStore {
    /// Open the collection at `path`, loading any previously persisted
    /// records. A missing file is treated as an empty collection.
    pub fn open(collection_name: impl Into<String>, path: impl Into<PathBuf>, distance: VectorDistance) -> Result<Self> {
        let path = path.into();
        let records = if path.exists() {
            let bytes = fs::read(&path).map_err(|err| RetrievalError::CollectionIo {
                path: path.display().to_string(),
                detail: err.to_string(),
            })?;
            let (records, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
                .map_err(|err| RetrievalError::CollectionIo { path: path.display().to_string(), detail: err.to_string() })?;
            records
        } else {
            Vec::new()
        };

        Ok(Self { collection_name: collection_name.into(), path, distance, records })
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn upsert(&mut self, chunk: VectorChunk, vector: Vec<f32>) {
        if let Some(existing) = self.records.iter_mut().find(|r| r.chunk.chunk_id == chunk.chunk_id) {
            existing.chunk = chunk;
            existing.vector = vector;
        } else {
            self.records.push(StoredRecord { chunk, vector });
        }
    }

    pub fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| RetrievalError::CollectionIo {
                path: self.path.display().to_string(),
                detail: err.to_string(),
            })?;
        }
        let bytes = bincode::serde::encode_to_vec(&self.records, bincode::config::standard())
            .map_err(|err| RetrievalError::CollectionIo { path: self.path.display().to_string(), detail: err.to_string() })?;
        fs::write(&self.path, bytes).map_err(|err| RetrievalError::CollectionIo {
            path: self.path.display().to_string(),
            detail: err.to_string(),
        })
    }

    /// Top-`k` nearest chunks by the configured distance metric, lowest
    /// score first.
    pub fn search(&self, query_vector: &[f32], k: usize) -> Vec<(VectorChunk, f32)> {
        let mut scored: Vec<(VectorChunk, f32)> = self
            .records
            .iter()
            .map(|record| {
                let score = match self.distance {
                    VectorDistance::Cosine => cosine_distance(query_vector, &record.vector),
                    VectorDistance::L2 => l2_distance(query_vector, &record.vector),
                };
                (record.chunk.clone(), score)
            })
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}

pub fn default_collection_path(root: &Path, provider_id: &str) -> PathBuf {
    root.join(format!("{provider_id}.bin"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str) -> VectorChunk {
        VectorChunk {
            chunk_id: id.to_string(),
            source_doc: "doc.pdf".to_string(),
            page: Some(1),
            content: format!("content for {id}"),
            embedding_space_tag: "ollama:nomic-embed-text:dim=3".to_string(),
        }
    }

    #[test]
    fn search_ranks_closer_vectors_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VectorStore::open("test", dir.path().join("test.bin"), VectorDistance::L2).unwrap();
        store.upsert(chunk("near"), vec![1.0, 0.0, 0.0]);
        store.upsert(chunk("far"), vec![0.0, 0.0, 10.0]);
        let results = store.search(&[1.0, 0.0, 0.0], 2);
        assert_eq!(results[0].0.chunk_id, "near");
        assert_eq!(results[1].0.chunk_id, "far");
    }

    #[test]
    fn persist_then_open_round_trips_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.bin");
        {
            let mut store = VectorStore::open("test", &path, VectorDistance::Cosine).unwrap();
            store.upsert(chunk("a"), vec![1.0, 2.0, 3.0]);
            store.persist().unwrap();
        }
        let reopened = VectorStore::open("test", &path, VectorDistance::Cosine).unwrap();
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn upsert_replaces_existing_chunk_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VectorStore::open("test", dir.path().join("test.bin"), VectorDistance::L2).unwrap();
        store.upsert(chunk("a"), vec![1.0, 0.0, 0.0]);
        store.upsert(chunk("a"), vec![0.0, 1.0, 0.0]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn opening_missing_path_yields_empty_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open("test", dir.path().join("nope.bin"), VectorDistance::L2).unwrap();
        assert!(store.is_empty());
    }
}
