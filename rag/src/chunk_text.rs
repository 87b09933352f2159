use crate::error::{RagError, Result};
use crate::load_pdf::Page;

/// Window geometry for splitting page text. `overlap < size` always holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkConfig {
    size: usize,
    overlap: usize,
}

impl ChunkConfig {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(RagError::Configuration("chunk size must be at least 1".to_string()));
        }
        if overlap >= size {
            return Err(RagError::Configuration(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, size
            )));
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between the starts of two consecutive windows.
    pub fn step(&self) -> usize {
        self.size - self.overlap
    }

    /// Number of windows produced for `len` characters of non-blank text.
    pub fn expected_chunks(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        len.saturating_sub(self.overlap).div_ceil(self.step()).max(1)
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self { size: 800, overlap: 150 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based PDF page the chunk was cut from.
    pub page: u32,
    /// Position of the chunk within the whole document.
    pub index: usize,
    pub text: String,
}

pub fn chunk_pages(pages: &[Page], cfg: &ChunkConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for page in pages {
        for text in chunk_text(&page.text, cfg) {
            chunks.push(Chunk {
                page: page.number,
                index: chunks.len(),
                text,
            });
        }
    }
    chunks
}

pub fn chunk_text(text: &str, cfg: &ChunkConfig) -> Vec<String> {
    let size = cfg.size;
    let step = cfg.step();

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let chars: Vec<char> = text.chars().collect();
    let len_chars = chars.len();

    while start < len_chars {
        let end = (start + size).min(len_chars);
        let chunk_str: String = chars[start..end].iter().collect();
        let trimmed = chunk_str.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        if end == len_chars {
            break;
        }
        start += step;
    }

    chunks
}
