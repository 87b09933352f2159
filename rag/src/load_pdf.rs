use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use lopdf::Document;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{RagError, Result};

/// Where a policy document comes from.
#[derive(Clone)]
pub enum PdfSource {
    Path(PathBuf),
    /// Bytes handed over by the user, with the file name they were uploaded under.
    Upload { name: String, bytes: Vec<u8> },
}

impl PdfSource {
    pub fn upload(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Upload { name: name.into(), bytes }
    }

    /// Short label for status lines.
    pub fn display_name(&self) -> String {
        match self {
            Self::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string_lossy().to_string()),
            Self::Upload { name, .. } => name.clone(),
        }
    }
}

impl fmt::Debug for PdfSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Upload { name, bytes } => f
                .debug_struct("Upload")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub text: String,
}

pub fn load_pages(source: &PdfSource) -> Result<Vec<Page>> {
    match source {
        PdfSource::Path(path) => load_pages_from_path(path),
        PdfSource::Upload { name, bytes } => {
            if !is_pdf_name(name) {
                return Err(RagError::SourceUnreadable(format!("{} is not a .pdf file", name)));
            }
            let tmp = write_temp_pdf(bytes)?;
            debug!(path = %tmp.path().display(), bytes = bytes.len(), "staged upload");
            // `tmp` is removed when it drops, on success and on every error path.
            load_pages_from_path(tmp.path())
        }
    }
}

pub fn is_pdf_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

fn write_temp_pdf(bytes: &[u8]) -> Result<NamedTempFile> {
    let mut tmp = tempfile::Builder::new()
        .prefix("polisense-upload-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| RagError::SourceUnreadable(format!("cannot stage upload: {}", e)))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| RagError::SourceUnreadable(format!("cannot stage upload: {}", e)))?;
    Ok(tmp)
}

fn load_pages_from_path(path: &Path) -> Result<Vec<Page>> {
    let doc = Document::load(path)
        .map_err(|e| RagError::SourceUnreadable(format!("{}: {}", path.display(), e)))?;

    let mut pages = Vec::new();
    for number in doc.get_pages().into_keys() {
        let text = doc.extract_text(&[number]).map_err(|e| {
            RagError::SourceUnreadable(format!("{} page {}: {}", path.display(), number, e))
        })?;
        if text.trim().is_empty() {
            continue;
        }
        pages.push(Page { number, text });
    }

    if pages.is_empty() {
        return Err(RagError::SourceUnreadable(format!(
            "{}: no extractable text",
            path.display()
        )));
    }
    info!(path = %path.display(), pages = pages.len(), "loaded pdf");
    Ok(pages)
}
