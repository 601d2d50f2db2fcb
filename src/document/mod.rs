//! The archive document kept entries are written to.
//!
//! An [`ArchiveDocument`] holds one header block followed by one block per kept
//! entry. [`ArchiveDocument::save`] serializes the whole document to its path
//! as a `.docx` file, replacing the previous save atomically.

mod docx;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::entry::Entry;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to write document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode document: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to encode JSON export: {0}")]
    Json(#[from] serde_json::Error),
    #[error("document header was already added")]
    HeaderAlreadyAdded,
    #[error("document header must be added before entries")]
    HeaderMissing,
}

/// Font sizes (points) and colors (hex RGB) of each paragraph kind.
#[derive(Debug, Clone)]
struct DocumentStyle {
    title_size: u32,
    title_color: &'static str,
    subject_size: u32,
    subject_color: &'static str,
    subtitle_size: u32,
    subtitle_color: &'static str,
    entry_title_size: u32,
    entry_title_color: &'static str,
    entry_size: u32,
    entry_color: &'static str,
    entry_author_size: u32,
    entry_author_color: &'static str,
}

impl Default for DocumentStyle {
    fn default() -> Self {
        Self {
            title_size: 36,
            title_color: "81C14B",
            subject_size: 18,
            subject_color: "000000",
            subtitle_size: 18,
            subtitle_color: "81C14B",
            entry_title_size: 16,
            entry_title_color: "000000",
            entry_size: 12,
            entry_color: "000000",
            entry_author_size: 12,
            entry_author_color: "81C14B",
        }
    }
}

/// A run of text inside a paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Run {
    Text {
        text: String,
        size_pt: u32,
        color: String,
    },
    Link {
        text: String,
        url: String,
    },
}

/// A paragraph; no runs renders a blank line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

impl Paragraph {
    fn text(text: &str, size_pt: u32, color: &str) -> Self {
        Self {
            runs: vec![Run::Text {
                text: text.to_string(),
                size_pt,
                color: color.to_string(),
            }],
        }
    }

    fn link(text: &str, url: &str) -> Self {
        Self {
            runs: vec![Run::Link {
                text: text.to_string(),
                url: url.to_string(),
            }],
        }
    }

    fn blank() -> Self {
        Self::default()
    }
}

/// A rendered unit of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Header(Vec<Paragraph>),
    Entry {
        entry: Entry,
        paragraphs: Vec<Paragraph>,
    },
}

impl Block {
    #[must_use]
    pub fn paragraphs(&self) -> &[Paragraph] {
        match self {
            Self::Header(paragraphs) | Self::Entry { paragraphs, .. } => paragraphs,
        }
    }
}

/// The kept entries as a JSON document.
#[derive(Debug, Serialize)]
pub struct JsonExport<'a> {
    pub name: &'a str,
    pub subject: &'a str,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<&'a Entry>,
}

/// Accumulating output document of one curation session.
#[derive(Debug)]
pub struct ArchiveDocument {
    path: PathBuf,
    title: String,
    style: DocumentStyle,
    blocks: Vec<Block>,
    created: DateTime<Utc>,
}

impl ArchiveDocument {
    /// An empty document that will be saved to `path`.
    #[must_use]
    pub fn new(path: PathBuf, title: &str) -> Self {
        Self {
            path,
            title: title.to_string(),
            style: DocumentStyle::default(),
            blocks: Vec::new(),
            created: Utc::now(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn has_header(&self) -> bool {
        matches!(self.blocks.first(), Some(Block::Header(_)))
    }

    /// Number of entry blocks (the header is not counted).
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::Entry { .. }))
            .count()
    }

    /// The appended entries, in append order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Entry { entry, .. } => Some(entry),
            Block::Header(_) => None,
        })
    }

    /// Permalinks of the appended entries, in append order.
    pub fn entry_urls(&self) -> impl Iterator<Item = &str> {
        self.entries().map(|entry| entry.url.as_str())
    }

    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Append the header naming `subject`. Allowed once, before any entry.
    ///
    /// # Errors
    ///
    /// Returns an error if any block was already added.
    pub fn add_header(&mut self, subject: &str) -> Result<(), DocumentError> {
        if !self.blocks.is_empty() {
            return Err(DocumentError::HeaderAlreadyAdded);
        }
        let s = &self.style;
        self.blocks.push(Block::Header(vec![
            Paragraph::text(&self.title, s.title_size, s.title_color),
            Paragraph::text(subject, s.subject_size, s.subject_color),
            Paragraph::text("favorite entries archive", s.subtitle_size, s.subtitle_color),
            Paragraph::blank(),
            Paragraph::blank(),
        ]));
        Ok(())
    }

    /// Append one entry block.
    ///
    /// # Errors
    ///
    /// Returns an error if the header has not been added yet.
    pub fn add_entry(&mut self, entry: &Entry) -> Result<(), DocumentError> {
        if !self.has_header() {
            return Err(DocumentError::HeaderMissing);
        }
        let s = &self.style;
        let mut paragraphs = vec![
            Paragraph::text(&entry.title, s.entry_title_size, s.entry_title_color),
            Paragraph::text(&entry.content, s.entry_size, s.entry_color),
        ];
        paragraphs.extend(
            entry
                .image_urls
                .iter()
                .map(|image| Paragraph::link(image, image)),
        );
        paragraphs.push(Paragraph::text(
            &entry.author,
            s.entry_author_size,
            s.entry_author_color,
        ));
        paragraphs.push(Paragraph::link(&entry.date, &entry.url));
        paragraphs.push(Paragraph::blank());
        paragraphs.push(Paragraph::blank());

        self.blocks.push(Block::Entry {
            entry: entry.clone(),
            paragraphs,
        });
        Ok(())
    }

    /// Remove the most recently appended entry block, if the last block is one.
    pub fn remove_last_entry(&mut self) -> Option<Block> {
        match self.blocks.last() {
            Some(Block::Entry { .. }) => self.blocks.pop(),
            _ => None,
        }
    }

    /// Encode the document as `.docx` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn render(&self) -> Result<Vec<u8>, DocumentError> {
        Ok(docx::write_docx(&self.title, &self.blocks, self.created)?)
    }

    /// Encode the kept entries as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self, subject: &str) -> Result<Vec<u8>, DocumentError> {
        let export = JsonExport {
            name: &self.title,
            subject,
            created_at: self.created,
            entries: self.entries().collect(),
        };
        Ok(serde_json::to_vec_pretty(&export)?)
    }

    /// Write the document to its path.
    ///
    /// The bytes go to a temporary sibling first and are renamed over the
    /// target, so a failed save never leaves a truncated document behind.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn save(&self) -> Result<(), DocumentError> {
        let bytes = self.render()?;
        let tmp_path = self.path.with_extension("docx.tmp");
        let io_err = |source| DocumentError::Io {
            path: self.path.clone(),
            source,
        };

        std::fs::write(&tmp_path, &bytes).map_err(io_err)?;
        if let Err(e) = std::fs::rename(&tmp_path, &self.path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(io_err(e));
        }

        debug!(
            path = %self.path.display(),
            entries = self.entry_count(),
            bytes = bytes.len(),
            "Saved archive document"
        );
        Ok(())
    }
}
