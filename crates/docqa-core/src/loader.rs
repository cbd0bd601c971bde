//! Plain-text extraction collaborator.
//!
//! Reads `.txt`/`.text`/`.md` files. Form feeds (`\x0c`, the page break that
//! PDF-to-text tools emit) delimit pages; blank pages are dropped and the rest
//! are joined with a blank line.
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::traits::TextExtractor;
use crate::types::Document;
use crate::{Error, Result};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "text", "md"];
const PAGE_BREAK: char = '\x0c';

#[derive(Debug, Clone, Default)]
pub struct TextLoader;

impl TextLoader {
    pub fn new() -> Self { Self }

    pub fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// Load every supported file under `dir` (sorted, recursive), at most
    /// `limit` of them. Files that fail extraction are skipped with a warning.
    pub fn load_directory(&self, dir: &Path, limit: Option<usize>) -> Result<Vec<Document>> {
        if !dir.is_dir() {
            return Err(Error::SourceNotFound(dir.display().to_string()));
        }
        let mut files = self.list_files(dir);
        if let Some(limit) = limit {
            if files.len() > limit {
                files.truncate(limit);
                info!(limit, "limited to first files");
            }
        }
        let mut documents = Vec::with_capacity(files.len());
        for (file_index, path) in files.iter().enumerate() {
            info!(file = %path.display(), "loading file {}/{}", file_index + 1, files.len());
            match self.extract(path) {
                Ok(document) => documents.push(document),
                Err(e) => warn!(file = %path.display(), error = %e, "skipping file"),
            }
        }
        info!(files = files.len(), documents = documents.len(), "loaded directory");
        Ok(documents)
    }

    pub fn list_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && Self::is_supported(e.path()))
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        files
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }
}

impl TextExtractor for TextLoader {
    fn extract(&self, source: &Path) -> Result<Document> {
        if !Self::is_supported(source) {
            let ext = source.extension().and_then(|s| s.to_str()).unwrap_or("");
            return Err(Error::UnsupportedFormat(format!(
                "'.{}' ({}); supported types: {}",
                ext,
                source.display(),
                SUPPORTED_EXTENSIONS.iter().map(|e| format!(".{e}")).collect::<Vec<_>>().join(", ")
            )));
        }
        if !source.is_file() {
            return Err(Error::SourceNotFound(source.display().to_string()));
        }
        let content = self.read_file_content(source)?;
        let mut pages = Vec::new();
        let mut num_pages: usize = 0;
        for (page_number, page) in content.split(PAGE_BREAK).enumerate() {
            num_pages += 1;
            if page.trim().is_empty() {
                warn!(file = %source.display(), page = page_number + 1, "page contains no text");
            } else {
                pages.push(page);
            }
        }
        if pages.is_empty() {
            return Err(Error::NoExtractableText(source.display().to_string()));
        }
        let filename = source.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        info!(file = %filename, pages = pages.len(), "extracted text");
        Ok(Document::new(pages.join("\n\n"))
            .with_metadata("filename", filename)
            .with_metadata("source", source.to_string_lossy().to_string())
            .with_metadata("num_pages", num_pages)
            .with_metadata("pages_with_text", pages.len()))
    }
}
