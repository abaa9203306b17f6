//! PDF decoding helpers.
//!
//! A [`PdfFile`] wraps a parsed document and exposes the two views the
//! extractors need: embedded raster images grouped by physical page number,
//! and the page-ordered prose text. Both operate on in-memory bytes; nothing
//! is staged on disk.

use lopdf::{Document, Object};
use thiserror::Error;

/// Errors raised while decoding a PDF.
#[derive(Debug, Error)]
pub enum PdfError {
    /// The document structure could not be parsed.
    #[error("Failed to parse PDF: {0}")]
    Parse(#[from] lopdf::Error),
    /// Text content could not be extracted from the document.
    #[error("Failed to extract text: {0}")]
    Text(String),
}

/// One embedded raster image together with its physical page number (1-based).
#[derive(Debug, Clone)]
pub struct PageImage {
    /// Physical page number the image appears on, starting at 1.
    pub page_number: u32,
    /// Raw encoded image bytes as stored in the document.
    pub data: Vec<u8>,
}

/// A parsed PDF document.
pub struct PdfFile {
    document: Document,
}

impl PdfFile {
    /// Parse a PDF from raw bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, PdfError> {
        let document = Document::load_mem(bytes)?;
        Ok(Self { document })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Enumerate every embedded raster image, page by page.
    ///
    /// Pages whose resource tree is malformed are skipped; a damaged page
    /// must not hide images on the remaining pages.
    pub fn page_images(&self) -> Vec<PageImage> {
        let mut images = Vec::new();
        for (page_number, page_id) in self.document.get_pages() {
            match self.images_on_page(page_id) {
                Ok(page_images) => {
                    for data in page_images {
                        images.push(PageImage { page_number, data });
                    }
                }
                Err(error) => {
                    tracing::debug!(page = page_number, error = %error, "Skipping unreadable page resources");
                }
            }
        }
        images
    }

    fn images_on_page(&self, page_id: (u32, u16)) -> Result<Vec<Vec<u8>>, lopdf::Error> {
        let page = self.document.get_dictionary(page_id)?;
        let Ok(resources) = page.get(b"Resources") else {
            return Ok(Vec::new());
        };
        let resources = self.resolve(resources)?.as_dict()?;
        let Ok(xobjects) = resources.get(b"XObject") else {
            return Ok(Vec::new());
        };
        let xobjects = self.resolve(xobjects)?.as_dict()?;

        let mut found = Vec::new();
        for (_name, object) in xobjects.iter() {
            let Ok(stream) = self.resolve(object).and_then(Object::as_stream) else {
                continue;
            };
            let is_image = stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .map(|name| name == b"Image")
                .unwrap_or(false);
            if is_image {
                found.push(stream.content.clone());
            }
        }
        Ok(found)
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> Result<&'a Object, lopdf::Error> {
        let mut current = object;
        while let Object::Reference(id) = current {
            current = self.document.get_object(*id)?;
        }
        Ok(current)
    }
}

/// Extract the full page-ordered text content of a PDF.
pub fn extract_prose(bytes: &[u8]) -> Result<String, PdfError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|error| PdfError::Text(error.to_string()))
}
