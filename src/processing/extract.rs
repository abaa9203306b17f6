//! The three extractors turning one source file into [`ExtractedUnit`]s.
//!
//! Each extractor is an independent failure domain: table and prose
//! extraction report their errors to the caller (which logs and moves on to
//! the next extractor), while image description absorbs per-image failures
//! itself since one bad image must not cost the rest of the file.

use crate::layout::{LayoutClient, LayoutTable};
use crate::pdf::{self, PageImage};
use crate::processing::types::{ExtractError, ExtractedUnit, SourceFile, UnitKind};
use crate::vision::VisionClient;
use std::collections::BTreeMap;

/// Extracts tabular content via the layout-analysis service.
pub struct TableExtractor<'a> {
    layout: &'a LayoutClient,
}

impl<'a> TableExtractor<'a> {
    /// Build an extractor over the given layout client.
    pub fn new(layout: &'a LayoutClient) -> Self {
        Self { layout }
    }

    /// Analyze the file and emit one unit per detected table.
    ///
    /// The emptiness check runs before any per-table work so documents
    /// without tables cost a single analysis and nothing more.
    pub async fn extract(&self, file: &SourceFile) -> Result<Vec<ExtractedUnit>, ExtractError> {
        let result = self.layout.analyze(&file.content).await?;
        if result.tables.is_empty() {
            tracing::debug!(file = %file.name, "No tables detected");
            return Ok(Vec::new());
        }

        tracing::info!(file = %file.name, tables = result.tables.len(), "Tables found; extracting");
        Ok(result
            .tables
            .iter()
            .enumerate()
            .map(|(ordinal, table)| ExtractedUnit {
                kind: UnitKind::Table,
                sub_index: ordinal as u32,
                text: table_text(table),
            })
            .collect())
    }
}

/// Join a table's cells row-major: cells comma-separated within a row,
/// rows newline-separated.
fn table_text(table: &LayoutTable) -> String {
    let mut rows: BTreeMap<u32, BTreeMap<u32, &str>> = BTreeMap::new();
    for cell in &table.cells {
        rows.entry(cell.row_index)
            .or_default()
            .insert(cell.column_index, cell.content.as_str());
    }

    rows.values()
        .map(|row| row.values().copied().collect::<Vec<_>>().join(", "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Describes embedded images via the vision service.
pub struct ImageExtractor<'a> {
    vision: &'a VisionClient,
}

impl<'a> ImageExtractor<'a> {
    /// Build an extractor over the given vision client.
    pub fn new(vision: &'a VisionClient) -> Self {
        Self { vision }
    }

    /// Describe every embedded image, skipping the ones the service cannot
    /// handle. Never fails the file.
    pub async fn extract(&self, file_name: &str, images: &[PageImage]) -> Vec<ExtractedUnit> {
        let mut units = Vec::new();
        for image in images {
            tracing::info!(
                file = file_name,
                page = image.page_number,
                "Analyzing embedded image"
            );
            match self.vision.describe(&image.data).await {
                Ok(description) if !description.trim().is_empty() => {
                    units.push(ExtractedUnit {
                        kind: UnitKind::Image,
                        sub_index: image.page_number,
                        text: description,
                    });
                }
                Ok(_) => {
                    tracing::warn!(
                        file = file_name,
                        page = image.page_number,
                        "Vision service returned an empty description; skipping image"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        file = file_name,
                        page = image.page_number,
                        error = %error,
                        "Vision call failed; skipping image"
                    );
                }
            }
        }
        units
    }
}

/// Extracts the document's prose body.
pub struct ProseExtractor;

impl ProseExtractor {
    /// Emit the page-ordered text of the document as a single unit.
    pub fn extract(&self, file: &SourceFile) -> Result<Vec<ExtractedUnit>, ExtractError> {
        let text = pdf::extract_prose(&file.content)?;
        if text.trim().is_empty() {
            tracing::debug!(file = %file.name, "Document has no extractable text");
            return Ok(Vec::new());
        }

        Ok(vec![ExtractedUnit {
            kind: UnitKind::Prose,
            sub_index: 0,
            text,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutCell;
    use httpmock::{Method::GET, Method::POST, MockServer};
    use serde_json::json;

    #[test]
    fn table_text_joins_cells_row_major() {
        let table = LayoutTable {
            row_count: 2,
            column_count: 2,
            cells: vec![
                LayoutCell {
                    row_index: 1,
                    column_index: 0,
                    content: "10".to_string(),
                },
                LayoutCell {
                    row_index: 0,
                    column_index: 0,
                    content: "name".to_string(),
                },
                LayoutCell {
                    row_index: 0,
                    column_index: 1,
                    content: "count".to_string(),
                },
                LayoutCell {
                    row_index: 1,
                    column_index: 1,
                    content: "widgets".to_string(),
                },
            ],
        };

        assert_eq!(table_text(&table), "name, count\n10, widgets");
    }

    #[tokio::test]
    async fn zero_tables_short_circuits_per_table_work() {
        let server = MockServer::start_async().await;
        let submit = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/formrecognizer/documentModels/prebuilt-layout:analyze");
                then.status(202)
                    .header("Operation-Location", server.url("/operations/1"));
            })
            .await;
        let poll = server
            .mock_async(|when, then| {
                when.method(GET).path("/operations/1");
                then.status(200)
                    .json_body(json!({ "status": "succeeded", "analyzeResult": { "tables": [] } }));
            })
            .await;

        let layout = LayoutClient::new(&server.base_url(), "key", 5).expect("client");
        let file = SourceFile {
            name: "report.pdf".to_string(),
            content: b"%PDF-1.4".to_vec(),
        };
        let units = TableExtractor::new(&layout)
            .extract(&file)
            .await
            .expect("extract");

        assert!(units.is_empty());
        submit.assert_hits(1);
        poll.assert_hits(1);
    }

    #[tokio::test]
    async fn failed_vision_calls_skip_the_image_only() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .body_contains(STANDARD_FIRST_IMAGE);
                then.status(400).body("unsupported image");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .body_contains(STANDARD_SECOND_IMAGE);
                then.status(200).json_body(json!({
                    "choices": [ { "message": { "content": "A legend describing pump states." } } ]
                }));
            })
            .await;

        let vision =
            VisionClient::new(&server.url("/chat/completions"), "key", 5).expect("client");
        let images = vec![
            PageImage {
                page_number: 1,
                data: FIRST_IMAGE.to_vec(),
            },
            PageImage {
                page_number: 2,
                data: SECOND_IMAGE.to_vec(),
            },
        ];

        let units = ImageExtractor::new(&vision)
            .extract("report.pdf", &images)
            .await;

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].kind, UnitKind::Image);
        assert_eq!(units[0].sub_index, 2);
        assert_eq!(units[0].text, "A legend describing pump states.");
    }

    const FIRST_IMAGE: &[u8] = &[0xFF, 0xD8, 0x01];
    const SECOND_IMAGE: &[u8] = &[0xFF, 0xD8, 0x02];
    // Base64 of the fixture bytes above, as they appear inside the data URL.
    const STANDARD_FIRST_IMAGE: &str = "/9gB";
    const STANDARD_SECOND_IMAGE: &str = "/9gC";
}
