//! LanceDB-backed `VectorStore`.
//!
//! The store is synchronous from the caller's point of view; every LanceDB
//! call is driven to completion on a private tokio runtime.
use anyhow::Result;
use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, Int32Array, RecordBatch, RecordBatchIterator, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType, Table};
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use tutor_core::error::Error;
use tutor_core::traits::VectorStore;
use tutor_core::types::{DocumentMeta, DocumentRecord, Neighbor};

use crate::schema::{build_arrow_schema, vector_dim};

fn store_err(e: impl std::fmt::Display) -> Error { Error::Store(e.to_string()) }

pub struct LanceStore { runtime: Runtime, db: Connection, table_name: String }

impl LanceStore {
	pub fn open(db_path: &Path, table_name: &str) -> Result<Self> {
		let runtime = Runtime::new()?;
		let uri = db_path.to_string_lossy().to_string();
		let db = runtime.block_on(async { connect(&uri).execute().await }).map_err(store_err)?;
		info!(path = %uri, table = table_name, "opened vector store");
		Ok(Self { runtime, db, table_name: table_name.to_string() })
	}

	pub fn table_name(&self) -> &str { &self.table_name }

	async fn open_table(&self) -> Result<Option<Table>> {
		let names = self.db.table_names().execute().await.map_err(store_err)?;
		if !names.contains(&self.table_name) { return Ok(None); }
		Ok(Some(self.db.open_table(&self.table_name).execute().await.map_err(store_err)?))
	}

	async fn row_count(&self) -> Result<usize> {
		match self.open_table().await? {
			Some(table) => Ok(table.count_rows(None).await.map_err(store_err)?),
			None => Ok(0),
		}
	}

	fn to_record_batch(records: &[DocumentRecord], embeddings: &[Vec<f32>], dim: i32, first_row: usize) -> Result<RecordBatch> {
		let mut ids = Vec::with_capacity(records.len()); let mut contents = Vec::with_capacity(records.len());
		let mut filenames = Vec::with_capacity(records.len()); let mut filepaths = Vec::with_capacity(records.len());
		let mut filetypes = Vec::with_capacity(records.len()); let mut pages = Vec::with_capacity(records.len());
		let mut chunk_ids = Vec::with_capacity(records.len()); let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(records.len());
		for (i, (rec, emb)) in records.iter().zip(embeddings).enumerate() {
			if i32::try_from(emb.len()).ok() != Some(dim) {
				return Err(Error::Store(format!("embedding {} has dim {} but table expects {}", i, emb.len(), dim)).into());
			}
			ids.push(rec.meta.identifier.clone().unwrap_or_else(|| format!("doc_{}", first_row + i)));
			contents.push(rec.content.clone());
			filenames.push(rec.meta.filename.clone());
			filepaths.push(rec.meta.filepath.clone());
			filetypes.push(rec.meta.filetype.clone());
			pages.push(i32::try_from(rec.meta.page_number).map_err(store_err)?);
			chunk_ids.push(i32::try_from(rec.meta.chunk_id).map_err(store_err)?);
			vectors.push(Some(emb.iter().map(|&x| Some(x)).collect()));
		}
		let batch = RecordBatch::try_new(build_arrow_schema(dim), vec![
			Arc::new(StringArray::from(ids)),
			Arc::new(StringArray::from(contents)),
			Arc::new(StringArray::from(filenames)),
			Arc::new(StringArray::from(filepaths)),
			Arc::new(StringArray::from(filetypes)),
			Arc::new(Int32Array::from(pages)),
			Arc::new(Int32Array::from(chunk_ids)),
			Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors.into_iter(), dim)),
		]).map_err(store_err)?;
		Ok(batch)
	}

	async fn insert_async(&self, records: &[DocumentRecord], embeddings: &[Vec<f32>]) -> Result<()> {
		let dim = i32::try_from(embeddings[0].len()).map_err(store_err)?;
		let table = self.open_table().await?;
		if let Some(t) = &table {
			let schema = t.schema().await.map_err(store_err)?;
			if let Some(existing) = vector_dim(&schema) {
				if existing != dim {
					return Err(Error::Store(format!("table '{}' stores {}-dim vectors, got {}", self.table_name, existing, dim)).into());
				}
			}
		}
		let first_row = match &table { Some(t) => t.count_rows(None).await.map_err(store_err)?, None => 0 };
		let batch = Self::to_record_batch(records, embeddings, dim, first_row)?;
		let schema = batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
		match table {
			Some(t) => { t.add(reader).execute().await.map_err(store_err)?; }
			None => { self.db.create_table(&self.table_name, reader).execute().await.map_err(store_err)?; }
		}
		debug!(table = %self.table_name, rows = records.len(), "inserted rows");
		Ok(())
	}

	async fn nearest_async(&self, query_vec: &[f32], k: usize) -> Result<Vec<Neighbor>> {
		let Some(table) = self.open_table().await? else { return Ok(vec![]) };
		if table.count_rows(None).await.map_err(store_err)? == 0 { return Ok(vec![]); }
		let mut stream = table.vector_search(query_vec.to_vec()).map_err(store_err)?
			.distance_type(DistanceType::Cosine)
			.limit(k)
			.execute().await.map_err(store_err)?;
		let mut out = Vec::new();
		while let Some(batch) = stream.try_next().await.map_err(store_err)? {
			let distances = column::<Float32Array>(&batch, "_distance")?;
			for (i, record) in rows_to_records(&batch)?.into_iter().enumerate() {
				out.push(Neighbor { record, distance: distances.value(i) });
			}
		}
		out.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
		Ok(out)
	}

	async fn all_documents_async(&self) -> Result<Vec<DocumentRecord>> {
		let Some(table) = self.open_table().await? else { return Ok(vec![]) };
		let rows = table.count_rows(None).await.map_err(store_err)?;
		if rows == 0 { return Ok(vec![]); }
		let mut stream = table.query().limit(rows).execute().await.map_err(store_err)?;
		let mut out = Vec::with_capacity(rows);
		while let Some(batch) = stream.try_next().await.map_err(store_err)? {
			out.extend(rows_to_records(&batch)?);
		}
		Ok(out)
	}
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T, Error> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<T>())
		.ok_or_else(|| Error::Store(format!("column '{}' missing or mistyped", name)))
}

fn rows_to_records(batch: &RecordBatch) -> Result<Vec<DocumentRecord>, Error> {
	let ids = column::<StringArray>(batch, "id")?;
	let contents = column::<StringArray>(batch, "content")?;
	let filenames = column::<StringArray>(batch, "filename")?;
	let filepaths = column::<StringArray>(batch, "filepath")?;
	let filetypes = column::<StringArray>(batch, "filetype")?;
	let pages = column::<Int32Array>(batch, "page_number")?;
	let chunk_ids = column::<Int32Array>(batch, "chunk_id")?;
	Ok((0..batch.num_rows())
		.map(|i| DocumentRecord {
			content: contents.value(i).to_string(),
			meta: DocumentMeta {
				identifier: Some(ids.value(i).to_string()),
				filename: filenames.value(i).to_string(),
				filepath: filepaths.value(i).to_string(),
				filetype: filetypes.value(i).to_string(),
				page_number: u32::try_from(pages.value(i)).unwrap_or_default(),
				chunk_id: u32::try_from(chunk_ids.value(i)).unwrap_or_default(),
			},
		})
		.collect())
}

impl VectorStore for LanceStore {
	fn insert(&self, records: &[DocumentRecord], embeddings: &[Vec<f32>]) -> Result<()> {
		if records.len() != embeddings.len() {
			return Err(Error::Store(format!("{} records but {} embeddings", records.len(), embeddings.len())).into());
		}
		if records.is_empty() { return Ok(()); }
		self.runtime.block_on(self.insert_async(records, embeddings))
	}

	fn nearest(&self, query_vec: &[f32], k: usize) -> Result<Vec<Neighbor>> {
		if k == 0 { return Ok(vec![]); }
		self.runtime.block_on(self.nearest_async(query_vec, k))
	}

	fn all_documents(&self) -> Result<Vec<DocumentRecord>> {
		self.runtime.block_on(self.all_documents_async())
	}

	fn count(&self) -> Result<usize> {
		self.runtime.block_on(self.row_count())
	}

	fn clear(&self) -> Result<()> {
		self.runtime.block_on(async {
			if let Some(table) = self.open_table().await? {
				table.delete("true").await.map_err(store_err)?;
				info!(table = %self.table_name, "cleared vector store");
			}
			Ok(())
		})
	}
}
