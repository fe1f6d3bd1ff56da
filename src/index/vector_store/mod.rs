
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use tracing::{debug, info};
use uuid::Uuid;

use super::{ChunkRecord, IndexFingerprint};
use crate::PdfChatError;
use crate::embeddings::{Chunk, TextEmbedder};

/// Vector database store using LanceDB for similarity search.
///
/// One store wraps one named snapshot (a LanceDB table plus a fingerprint
/// sidecar). Building under an existing name replaces the prior snapshot.
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    dimension: usize,
}

/// One retrieved chunk, best-first by similarity.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub text: String,
    pub source: String,
    pub ordinal: u32,
    pub score: f32,
}

impl VectorStore {
    /// Embed every chunk and build a fresh snapshot at `location`, replacing
    /// any snapshot of the same name. Refuses to build an empty index: with
    /// no chunks there is nothing a consumer could meaningfully query.
    #[inline]
    pub async fn build(
        chunks: &[Chunk],
        embedder: &dyn TextEmbedder,
        location: &Path,
        snapshot: &str,
        sources: &str,
    ) -> Result<Self, PdfChatError> {
        if chunks.is_empty() {
            return Err(PdfChatError::EmptyCorpus);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts)?;

        let records: Vec<ChunkRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| ChunkRecord {
                id: Uuid::new_v4().to_string(),
                text: chunk.text.clone(),
                source: sources.to_string(),
                ordinal: chunk.ordinal as u32,
                vector,
            })
            .collect();

        let dimension = embedder.dimension();
        for record in &records {
            if record.vector.len() != dimension {
                return Err(PdfChatError::Database(format!(
                    "Embedding dimension {} does not match index dimension {}",
                    record.vector.len(),
                    dimension
                )));
            }
        }

        let connection = connect(location).await?;
        let store = Self {
            connection,
            table_name: snapshot.to_string(),
            dimension,
        };

        store.replace_table(&records).await?;

        let fingerprint = IndexFingerprint::for_embedder(embedder, records.len());
        write_fingerprint(location, snapshot, &fingerprint)?;

        info!(
            "Built index snapshot '{}' with {} chunks ({} dimensions)",
            snapshot,
            records.len(),
            dimension
        );
        Ok(store)
    }

    /// Open a previously persisted snapshot for querying.
    ///
    /// The embedder must match the one the snapshot was built with; the
    /// stored fingerprint is checked and a mismatch is a hard error. A
    /// missing snapshot reports that no index has been built yet.
    #[inline]
    pub async fn load(
        location: &Path,
        snapshot: &str,
        embedder: &dyn TextEmbedder,
    ) -> Result<Self, PdfChatError> {
        let fingerprint = read_fingerprint(location, snapshot)?;
        if !fingerprint.compatible_with(embedder) {
            return Err(PdfChatError::Snapshot(format!(
                "snapshot was built with model '{}' ({} dimensions), \
                 but the configured embedder is '{}' ({} dimensions)",
                fingerprint.model_id,
                fingerprint.dimension,
                embedder.model_id(),
                embedder.dimension()
            )));
        }

        let connection = connect(location).await?;
        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to list tables: {e}")))?;

        if !table_names.contains(&snapshot.to_string()) {
            return Err(PdfChatError::IndexNotBuilt);
        }

        debug!("Loaded index snapshot '{}'", snapshot);
        Ok(Self {
            connection,
            table_name: snapshot.to_string(),
            dimension: fingerprint.dimension,
        })
    }

    /// Return the `k` stored chunks nearest to the query vector, best-first.
    /// Asking for more chunks than the snapshot holds returns all of them.
    #[inline]
    pub async fn query(
        &self,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>, PdfChatError> {
        if query_vector.len() != self.dimension {
            return Err(PdfChatError::Database(format!(
                "Query vector has {} dimensions, index has {}",
                query_vector.len(),
                self.dimension
            )));
        }

        debug!("Searching for {} nearest chunks", k);

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to open table: {e}")))?;

        let mut results = table
            .vector_search(query_vector)
            .map_err(|e| PdfChatError::Database(format!("Failed to create vector search: {e}")))?
            .column("vector")
            .limit(k)
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to execute search: {e}")))?;

        let mut hits = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to read result stream: {e}")))?
        {
            hits.extend(parse_search_batch(&batch)?);
        }

        debug!("Parsed {} search results", hits.len());
        Ok(hits)
    }

    /// Number of chunks stored in the snapshot.
    #[inline]
    pub async fn count(&self) -> Result<usize, PdfChatError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to open table: {e}")))?;

        table
            .count_rows(None)
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to count rows: {e}")))
    }

    /// Drop the old table (if any) and write the new records.
    async fn replace_table(&self, records: &[ChunkRecord]) -> Result<(), PdfChatError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to list tables: {e}")))?;

        if table_names.contains(&self.table_name) {
            debug!("Replacing existing snapshot '{}'", self.table_name);
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| PdfChatError::Database(format!("Failed to drop table: {e}")))?;
        }

        let schema = self.schema();
        self.connection
            .create_empty_table(&self.table_name, Arc::clone(&schema))
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to create table: {e}")))?;

        let batch = self.create_record_batch(records)?;
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to open table: {e}")))?;

        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to insert embeddings: {e}")))?;

        Ok(())
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.dimension as i32,
                ),
                false,
            ),
            Field::new("text", DataType::Utf8, false),
            Field::new("source", DataType::Utf8, false),
            Field::new("ordinal", DataType::UInt32, false),
        ]))
    }

    fn create_record_batch(&self, records: &[ChunkRecord]) -> Result<RecordBatch, PdfChatError> {
        let len = records.len();
        let mut ids = Vec::with_capacity(len);
        let mut texts = Vec::with_capacity(len);
        let mut source_names = Vec::with_capacity(len);
        let mut ordinals = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * self.dimension);

        for record in records {
            ids.push(record.id.as_str());
            texts.push(record.text.as_str());
            source_names.push(record.source.as_str());
            ordinals.push(record.ordinal);
            flat_values.extend_from_slice(&record.vector);
        }

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            self.dimension as i32,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| PdfChatError::Database(format!("Failed to create vector array: {e}")))?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(texts)),
            Arc::new(StringArray::from(source_names)),
            Arc::new(UInt32Array::from(ordinals)),
        ];

        RecordBatch::try_new(self.schema(), arrays)
            .map_err(|e| PdfChatError::Database(format!("Failed to create record batch: {e}")))
    }
}

async fn connect(location: &Path) -> Result<Connection, PdfChatError> {
    fs::create_dir_all(location).map_err(|e| {
        PdfChatError::Database(format!("Failed to create vector database directory: {e}"))
    })?;

    let uri = format!("file://{}", location.display());
    lancedb::connect(&uri)
        .execute()
        .await
        .map_err(|e| PdfChatError::Database(format!("Failed to connect to LanceDB: {e}")))
}

fn fingerprint_path(location: &Path, snapshot: &str) -> PathBuf {
    location.join(format!("{snapshot}.fingerprint.json"))
}

fn write_fingerprint(
    location: &Path,
    snapshot: &str,
    fingerprint: &IndexFingerprint,
) -> Result<(), PdfChatError> {
    let payload = serde_json::to_string_pretty(fingerprint)
        .map_err(|e| PdfChatError::Database(format!("Failed to serialize fingerprint: {e}")))?;
    fs::write(fingerprint_path(location, snapshot), payload)?;
    Ok(())
}

fn read_fingerprint(location: &Path, snapshot: &str) -> Result<IndexFingerprint, PdfChatError> {
    let path = fingerprint_path(location, snapshot);
    if !path.exists() {
        return Err(PdfChatError::IndexNotBuilt);
    }

    let payload = fs::read_to_string(&path)?;
    serde_json::from_str(&payload)
        .map_err(|e| PdfChatError::Snapshot(format!("unreadable fingerprint: {e}")))
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchHit>, PdfChatError> {
    let texts = string_column(batch, "text")?;
    let source_names = string_column(batch, "source")?;

    let ordinals = batch
        .column_by_name("ordinal")
        .ok_or_else(|| PdfChatError::Database("Missing ordinal column".to_string()))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| PdfChatError::Database("Invalid ordinal column type".to_string()))?;

    let distances = batch
        .column_by_name("_distance")
        .map(|col| col.as_any().downcast_ref::<Float32Array>());

    let mut hits = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let distance = distances.flatten().map_or(0.0, |d| d.value(row));

        hits.push(SearchHit {
            text: texts.value(row).to_string(),
            source: source_names.value(row).to_string(),
            ordinal: ordinals.value(row),
            score: 1.0 - distance,
        });
    }

    Ok(hits)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, PdfChatError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| PdfChatError::Database(format!("Missing {name} column")))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| PdfChatError::Database(format!("Invalid {name} column type")))
}
