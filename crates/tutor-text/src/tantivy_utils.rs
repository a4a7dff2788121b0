//! Analyzer pipeline shared by corpus and query tokenization.

use std::sync::{Arc, LazyLock};

use jieba_rs::Jieba;
use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED};
use tantivy::tokenizer::{LowerCaser, StopWordFilter, TextAnalyzer, Token, TokenStream, Tokenizer};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "jieba";

static JIEBA: LazyLock<Arc<Jieba>> = LazyLock::new(|| Arc::new(Jieba::new()));

const STOP_WORDS: &[&str] = &[
	"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
];

/// Dictionary word segmentation: CJK words stay whole, alphabetic runs are words.
///
/// Pieces without any alphanumeric character (spaces, punctuation) are skipped.
#[derive(Clone)]
pub struct JiebaTokenizer {
	jieba: Arc<Jieba>,
}

impl JiebaTokenizer {
	pub fn new() -> Self {
		Self { jieba: Arc::clone(&JIEBA) }
	}
}

impl Default for JiebaTokenizer {
	fn default() -> Self { Self::new() }
}

pub struct JiebaTokenStream {
	tokens: Vec<Token>,
	index: usize,
}

impl TokenStream for JiebaTokenStream {
	fn advance(&mut self) -> bool {
		if self.index < self.tokens.len() {
			self.index += 1;
			true
		} else {
			false
		}
	}

	fn token(&self) -> &Token { &self.tokens[self.index - 1] }

	fn token_mut(&mut self) -> &mut Token { &mut self.tokens[self.index - 1] }
}

impl Tokenizer for JiebaTokenizer {
	type TokenStream<'a> = JiebaTokenStream;

	fn token_stream<'a>(&'a mut self, text: &'a str) -> JiebaTokenStream {
		let mut tokens = Vec::new();
		let mut offset = 0usize;
		for piece in self.jieba.cut(text, true) {
			let from = offset;
			offset += piece.len();
			if !piece.chars().any(char::is_alphanumeric) {
				continue;
			}
			tokens.push(Token {
				offset_from: from,
				offset_to: offset,
				position: tokens.len(),
				text: piece.to_string(),
				position_length: 1,
			});
		}
		JiebaTokenStream { tokens, index: 0 }
	}
}

pub fn build_analyzer() -> TextAnalyzer {
	TextAnalyzer::builder(JiebaTokenizer::new())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| s.to_string())))
		.build()
}

/// `text` is segmented with the jieba analyzer and keeps term frequencies
/// and field norms for BM25; `ord` maps a hit back to its corpus position.
pub fn build_schema() -> Schema {
	let mut builder = Schema::builder();
	let indexing = TextFieldIndexing::default()
		.set_tokenizer(TOKENIZER_NAME)
		.set_index_option(IndexRecordOption::WithFreqs);
	builder.add_text_field("text", TextOptions::default().set_indexing_options(indexing));
	builder.add_u64_field("ord", STORED);
	builder.build()
}

pub fn register_tokenizer(index: &Index) {
	index.tokenizers().register(TOKENIZER_NAME, build_analyzer());
}

/// Run `text` through `analyzer`, keeping duplicates in order.
pub fn tokenize(analyzer: &mut TextAnalyzer, text: &str) -> Vec<String> {
	let mut stream = analyzer.token_stream(text);
	let mut out = Vec::new();
	while stream.advance() {
		out.push(stream.token().text.clone());
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn chinese_words_are_atomic() {
		let mut analyzer = build_analyzer();
		let tokens = tokenize(&mut analyzer, "线性代数介绍 矩阵乘法");
		assert!(tokens.iter().any(|t| t == "矩阵"), "tokens: {tokens:?}");
		assert!(!tokens.iter().any(|t| t == "矩"), "tokens: {tokens:?}");
		assert!(!tokens.iter().any(|t| t.trim().is_empty()));
	}

	#[test]
	fn latin_words_are_lowercased_and_filtered() {
		let mut analyzer = build_analyzer();
		let tokens = tokenize(&mut analyzer, "The Matrix, and Vectors!");
		assert_eq!(tokens, vec!["matrix".to_string(), "vectors".to_string()]);
	}

	#[test]
	fn empty_text_has_no_tokens() {
		let mut analyzer = build_analyzer();
		assert!(tokenize(&mut analyzer, "").is_empty());
		assert!(tokenize(&mut analyzer, "  ，。 ").is_empty());
	}
}
