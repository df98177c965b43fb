//! Document renderer: explanation text to a paginated, downloadable PDF.

mod layout;
mod metrics;
mod pdf;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use layout::{Document, Page, PageConfig, TextCell, layout_document, wrap_line};
pub use metrics::FontStyle;

pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const DEFAULT_FILE_NAME: &str = "finance_ai_knowledge.pdf";

pub(crate) const MM_PER_PT: f32 = 25.4 / 72.0;
pub(crate) const PT_PER_MM: f32 = 72.0 / 25.4;

/// Errors that abort rendering. No bytes are produced when one is returned.
#[derive(Debug)]
pub enum RenderError {
    /// A single word (or the title) is wider than the text area.
    TokenTooWide {
        token: String,
        width_mm: f32,
        available_mm: f32,
    },
    /// The page configuration cannot hold any text.
    InvalidConfig(String),
    /// `lopdf` failed to encode a content stream.
    Pdf(lopdf::Error),
    /// Writing the finished bytes failed.
    Io(io::Error),
}

impl From<lopdf::Error> for RenderError {
    fn from(err: lopdf::Error) -> Self {
        Self::Pdf(err)
    }
}

impl From<io::Error> for RenderError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TokenTooWide {
                token,
                width_mm,
                available_mm,
            } => {
                let preview: String = token.chars().take(40).collect();
                let ellipsis = if token.chars().count() > 40 { "..." } else { "" };
                write!(
                    f,
                    "'{preview}{ellipsis}' is {width_mm:.1}mm wide but a line holds only {available_mm:.1}mm"
                )
            }
            Self::InvalidConfig(message) => write!(f, "invalid page configuration: {message}"),
            Self::Pdf(err) => write!(f, "failed to encode PDF: {err}"),
            Self::Io(err) => write!(f, "failed to write PDF: {err}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pdf(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::TokenTooWide { .. } | Self::InvalidConfig(_) => None,
        }
    }
}

/// Renders `text` with the default A4 configuration.
pub fn render_document(text: &str) -> Result<Vec<u8>, RenderError> {
    render_document_with(text, &PageConfig::default())
}

pub fn render_document_with(text: &str, cfg: &PageConfig) -> Result<Vec<u8>, RenderError> {
    let document = layout_document(text, cfg)?;
    let bytes = pdf::write_pdf(&document)?;
    debug!(
        pages = document.page_count(),
        bytes = bytes.len(),
        "rendered document"
    );
    Ok(bytes)
}

/// A finished PDF offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl PdfArtifact {
    pub fn render(text: &str, file_name: impl Into<String>) -> Result<Self, RenderError> {
        Ok(Self {
            file_name: file_name.into(),
            bytes: render_document(text)?,
        })
    }

    pub fn mime_type(&self) -> &'static str {
        PDF_MIME_TYPE
    }

    /// Writes the artifact to `path` through a sibling temporary file, so a
    /// failed write never leaves a truncated PDF behind.
    pub fn write_to(&self, path: &Path) -> Result<(), RenderError> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let partial = partial_path(path);
        if let Err(err) = fs::write(&partial, &self.bytes).and_then(|()| fs::rename(&partial, path))
        {
            let _ = fs::remove_file(&partial);
            return Err(err.into());
        }
        info!(
            path = %path.display(),
            file_name = %self.file_name,
            bytes = self.bytes.len(),
            "wrote pdf artifact"
        );
        Ok(())
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| DEFAULT_FILE_NAME.into());
    name.push(".part");
    path.with_file_name(name)
}
