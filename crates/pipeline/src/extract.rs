//! Plain-text extraction for uploaded files.
//!
//! PDFs go through `pdf-extract`; anything else must already be UTF-8 text.

use std::fs;
use std::path::Path;

use thiserror::Error;

const TEXT_EXTENSIONS: [&str; 4] = ["txt", "text", "md", "markdown"];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not valid UTF-8 text")]
    NotUtf8 { path: String },
    #[error("PDF extraction failed for {path}: {message}")]
    Pdf { path: String, message: String },
    #[error("extraction task did not complete: {0}")]
    Task(String),
}

pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

#[derive(Debug, Clone, Default)]
pub struct FileExtractor;

impl TextExtractor for FileExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let display = path.display().to_string();
        let bytes = fs::read(path).map_err(|source| ExtractError::Io {
            path: display.clone(),
            source,
        })?;

        if is_pdf(path) {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|err| ExtractError::Pdf {
                path: display,
                message: err.to_string(),
            })
        } else {
            String::from_utf8(bytes).map_err(|_| ExtractError::NotUtf8 { path: display })
        }
    }
}

pub fn is_supported(path: &Path) -> bool {
    is_pdf(path) || extension(path).is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.as_str()))
}

fn is_pdf(path: &Path) -> bool {
    extension(path).as_deref() == Some("pdf")
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn scratch_file(name: &str, bytes: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lectern-extract-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn reads_utf8_text_files() {
        let path = scratch_file("notes.md", "# Cells\n\nMitochondria.".as_bytes());
        assert_eq!(
            FileExtractor.extract(&path).unwrap(),
            "# Cells\n\nMitochondria."
        );
    }

    #[test]
    fn rejects_binary_text_files() {
        let path = scratch_file("broken.txt", &[0xff, 0xfe, 0x00, 0x80]);
        assert!(matches!(
            FileExtractor.extract(&path),
            Err(ExtractError::NotUtf8 { .. })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("lectern-definitely-missing.txt");
        assert!(matches!(
            FileExtractor.extract(&path),
            Err(ExtractError::Io { .. })
        ));
    }

    #[test]
    fn supported_extensions() {
        assert!(is_supported(Path::new("a/lecture.PDF")));
        assert!(is_supported(Path::new("notes.md")));
        assert!(!is_supported(Path::new("slides.pptx")));
        assert!(!is_supported(Path::new("README")));
    }
}
