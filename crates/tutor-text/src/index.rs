use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::tokenizer::TextAnalyzer;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term};
use tracing::{debug, info};

use tutor_core::config::LexicalSettings;
use tutor_core::error::{Error, Result};
use tutor_core::types::{DocumentRecord, Origin, ScoredResult};

use crate::tantivy_utils::{build_analyzer, build_schema, register_tokenizer, tokenize};

fn index_err(e: tantivy::TantivyError) -> Error { Error::Operation(format!("lexical index: {}", e)) }

/// BM25 over an immutable corpus snapshot held in a RAM tantivy index.
///
/// Built once; a rebuild constructs a new value rather than mutating this one.
#[derive(Clone)]
pub struct LexicalIndex {
	documents: Vec<DocumentRecord>,
	reader: IndexReader,
	text_field: Field,
	ord_field: Field,
	analyzer: TextAnalyzer,
}

impl LexicalIndex {
	/// Tokenize and index `documents`; records with blank content are excluded.
	pub fn build(documents: &[DocumentRecord], settings: &LexicalSettings) -> Result<Self> {
		settings.validate()?;
		let documents: Vec<DocumentRecord> = documents.iter().filter(|d| !d.content.trim().is_empty()).cloned().collect();

		let schema = build_schema();
		let index = Index::create_in_ram(schema.clone());
		register_tokenizer(&index);
		let text_field = schema.get_field("text").map_err(index_err)?;
		let ord_field = schema.get_field("ord").map_err(index_err)?;

		// one indexing thread keeps doc ids in corpus order within the segment
		let mut writer: IndexWriter = index.writer_with_num_threads(1, settings.writer_memory_bytes).map_err(index_err)?;
		for (ord, d) in documents.iter().enumerate() {
			writer.add_document(doc!(text_field => d.content.clone(), ord_field => ord as u64)).map_err(index_err)?;
		}
		writer.commit().map_err(index_err)?;
		let reader: IndexReader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into().map_err(index_err)?;

		info!(documents = documents.len(), "built lexical index");
		Ok(Self { documents, reader, text_field, ord_field, analyzer: build_analyzer() })
	}

	pub fn len(&self) -> usize { self.documents.len() }

	pub fn is_empty(&self) -> bool { self.documents.is_empty() }

	/// Identifiers of the indexed documents, in corpus order.
	pub fn doc_ids(&self) -> Vec<&str> {
		self.documents.iter().map(DocumentRecord::identifier).collect()
	}

	/// One `Should` clause per analyzed query token; repeated tokens count repeatedly.
	fn build_query(&self, query: &str) -> Option<BooleanQuery> {
		let mut analyzer = self.analyzer.clone();
		let tokens = tokenize(&mut analyzer, query);
		if tokens.is_empty() {
			return None;
		}
		let clauses: Vec<(Occur, Box<dyn Query>)> = tokens
			.iter()
			.map(|t| {
				let term = Term::from_field_text(self.text_field, t);
				(Occur::Should, Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)) as Box<dyn Query>)
			})
			.collect();
		Some(BooleanQuery::new(clauses))
	}

	/// Top `limit` `(corpus position, score)` pairs with a positive score,
	/// best first, equal scores in corpus order.
	fn ranked(&self, query: &str, limit: usize) -> Result<Vec<(usize, f32)>> {
		if limit == 0 || self.documents.is_empty() {
			return Ok(Vec::new());
		}
		let Some(q) = self.build_query(query) else { return Ok(Vec::new()) };
		let searcher: Searcher = self.reader.searcher();
		let top_docs = searcher.search(&q, &TopDocs::with_limit(limit)).map_err(index_err)?;

		let mut ranked = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			if score <= 0.0 {
				continue;
			}
			let stored: TantivyDocument = searcher.doc(addr).map_err(index_err)?;
			let ord = stored
				.get_first(self.ord_field)
				.and_then(|v| v.as_u64())
				.and_then(|o| usize::try_from(o).ok())
				.filter(|&o| o < self.documents.len())
				.ok_or_else(|| Error::Operation("lexical hit without a corpus position".into()))?;
			ranked.push((ord, score));
		}
		ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
		Ok(ranked)
	}

	/// Per-document relevance in corpus order; zero where nothing matched.
	pub fn scores(&self, query: &str) -> Result<Vec<f32>> {
		let mut scores = vec![0.0f32; self.documents.len()];
		for (ord, score) in self.ranked(query, self.documents.len())? {
			scores[ord] = score;
		}
		Ok(scores)
	}

	/// At most `top_k` documents with a strictly positive score, best first.
	/// Equal scores keep corpus order.
	pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredResult>> {
		let ranked = self.ranked(query, top_k)?;
		debug!(query, hits = ranked.len(), "lexical search");
		Ok(ranked
			.into_iter()
			.map(|(ord, score)| ScoredResult::from_record(&self.documents[ord], score, Origin::Lexical))
			.collect())
	}
}

impl std::fmt::Debug for LexicalIndex {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LexicalIndex")
			.field("documents", &self.documents.len())
			.field("segments", &self.reader.searcher().segment_readers().len())
			.finish()
	}
}
