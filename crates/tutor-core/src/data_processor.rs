//! Plain-text loading and fixed-window chunking with sentence-aware cut points.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::ChunkingSettings;
use crate::types::{DocumentMeta, DocumentRecord};

const SENTENCE_TERMINATORS: [char; 6] = ['。', '！', '？', '.', '!', '?'];
const TEXT_EXTENSIONS: [&str; 2] = ["txt", "md"];

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// `chunk_overlap` is clamped below `chunk_size` so the cursor always advances.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self { chunk_size, chunk_overlap: chunk_overlap.min(chunk_size - 1) }
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Self {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    /// Split `text` into windows of at most `chunk_size + 1` characters.
    ///
    /// A window ends right after the last sentence terminator or blank line
    /// found in its back half, else at the hard limit. A terminator sitting
    /// exactly at the limit is kept, which makes that window one longer.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < len {
            let end = start + self.chunk_size;
            if end >= len {
                push_non_blank(&mut chunks, &chars[start..]);
                break;
            }

            let search_start = start.max(end - self.chunk_size / 2);
            let boundary = (search_start + 1..=end)
                .rev()
                .find(|&i| {
                    SENTENCE_TERMINATORS.contains(&chars[i]) || (i > 0 && chars[i - 1] == '\n' && chars[i] == '\n')
                })
                .map_or(end, |i| i + 1);

            push_non_blank(&mut chunks, &chars[start..boundary]);
            start = (start + 1).max(boundary.saturating_sub(self.chunk_overlap));
        }
        chunks
    }

    /// Paginated pages (`page_number > 0`) are kept whole; everything else is windowed.
    pub fn split_documents(&self, pages: &[DocumentRecord]) -> Vec<DocumentRecord> {
        let mut out = Vec::new();
        for page in pages {
            if page.content.trim().is_empty() {
                continue;
            }
            if page.meta.page_number > 0 {
                out.push(assign_identifier(page.content.clone(), &page.meta, 0));
                continue;
            }
            for (i, chunk) in self.split_text(&page.content).into_iter().enumerate() {
                out.push(assign_identifier(chunk, &page.meta, i as u32));
            }
        }
        info!(pages = pages.len(), chunks = out.len(), "split documents");
        out
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::from_settings(&ChunkingSettings::default())
    }
}

fn push_non_blank(chunks: &mut Vec<String>, window: &[char]) {
    let chunk: String = window.iter().collect();
    if !chunk.trim().is_empty() {
        chunks.push(chunk);
    }
}

fn assign_identifier(content: String, meta: &DocumentMeta, chunk_id: u32) -> DocumentRecord {
    let mut meta = meta.clone();
    meta.chunk_id = chunk_id;
    meta.identifier = Some(format!("{}:{}:{}", meta.filepath, meta.page_number, chunk_id));
    DocumentRecord { content, meta }
}

#[derive(Default)]
pub struct DataProcessor {
    splitter: TextSplitter,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_splitter(splitter: TextSplitter) -> Self { Self { splitter } }

    /// Load every text file under `data_dir` and chunk it.
    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<DocumentRecord>> {
        let pages = load_text_directory(data_dir)?;
        Ok(self.splitter.split_documents(&pages))
    }

    pub fn process_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<DocumentRecord>> {
        let mut pages = load_text_directory(data_dir)?;
        if pages.len() > limit {
            pages.truncate(limit);
            info!(limit, "limited to first files");
        }
        Ok(self.splitter.split_documents(&pages))
    }
}

/// One unpaginated record per `.txt`/`.md` file under `root`, in path order.
pub fn load_text_directory(root: &Path) -> Result<Vec<DocumentRecord>> {
    let files = list_text_files(root);
    if files.is_empty() {
        info!(dir = %root.display(), "no text files found");
        return Ok(vec![]);
    }
    let mut pages = Vec::with_capacity(files.len());
    for (file_index, file_path) in files.iter().enumerate() {
        debug!(file = %file_path.display(), "loading {}/{}", file_index + 1, files.len());
        let content = read_file_content(file_path)?;
        let filetype = file_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let filename = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        pages.push(DocumentRecord {
            content,
            meta: DocumentMeta {
                identifier: None,
                filename,
                filepath: file_path.to_string_lossy().to_string(),
                filetype,
                page_number: 0,
                chunk_id: 0,
            },
        });
    }
    Ok(pages)
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
    }
}

fn list_text_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()).is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext)))
        .collect();
    files.sort();
    files
}
