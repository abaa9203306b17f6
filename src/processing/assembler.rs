//! Turns one source file into an ordered set of index-ready records.

use crate::embedding::EmbeddingClient;
use crate::layout::LayoutClient;
use crate::pdf::PdfFile;
use crate::processing::chunking::Chunker;
use crate::processing::extract::{ImageExtractor, ProseExtractor, TableExtractor};
use crate::processing::types::{ExtractedUnit, ProcessingError, SourceFile, UnitKind};
use crate::search::{IndexAction, IndexRecord};
use crate::vision::VisionClient;

/// Drives the extractors over one file, chunks their output, embeds every
/// chunk, and assembles uniquely-keyed index records.
pub struct DocumentAssembler<'a> {
    layout: &'a LayoutClient,
    vision: &'a VisionClient,
    embedder: &'a dyn EmbeddingClient,
    chunker: &'a Chunker,
}

impl<'a> DocumentAssembler<'a> {
    /// Build an assembler over the given collaborators.
    pub fn new(
        layout: &'a LayoutClient,
        vision: &'a VisionClient,
        embedder: &'a dyn EmbeddingClient,
        chunker: &'a Chunker,
    ) -> Self {
        Self {
            layout,
            vision,
            embedder,
            chunker,
        }
    }

    /// Assemble all index records for one file.
    ///
    /// Extractors run in a fixed order (table, image, prose); each runs even
    /// when an earlier one failed. A file contributing zero chunks yields
    /// zero records, which the driver treats as nothing to upload.
    pub async fn assemble(
        &self,
        file: &SourceFile,
        file_ordinal: usize,
    ) -> Result<Vec<IndexRecord>, ProcessingError> {
        let pdf = PdfFile::parse(&file.content)?;
        let mut units: Vec<ExtractedUnit> = Vec::new();

        match TableExtractor::new(self.layout).extract(file).await {
            Ok(table_units) => units.extend(table_units),
            Err(error) => {
                tracing::error!(file = %file.name, error = %error, "Table extraction failed; other extractors continue");
            }
        }

        let images = pdf.page_images();
        units.extend(
            ImageExtractor::new(self.vision)
                .extract(&file.name, &images)
                .await,
        );

        match ProseExtractor.extract(file) {
            Ok(prose_units) => units.extend(prose_units),
            Err(error) => {
                tracing::error!(file = %file.name, error = %error, "Prose extraction failed; other extractors continue");
            }
        }

        let mut records = Vec::new();
        for unit in &units {
            let chunks = self.chunker.chunk(&unit.text);
            for (chunk_ordinal, chunk) in chunks.into_iter().enumerate() {
                let vector = self.embedder.embed(&chunk).await?;
                tracing::debug!(
                    file = %file.name,
                    kind = %unit.kind,
                    sub_index = unit.sub_index,
                    chunk = chunk_ordinal,
                    "Generated embedding for chunk"
                );
                records.push(IndexRecord {
                    id: record_id(file_ordinal, unit.kind, unit.sub_index, chunk_ordinal),
                    filepath: file.name.clone(),
                    content: chunk,
                    metadata: file.name.clone(),
                    content_vector: vector,
                    action: IndexAction::Upload,
                });
            }
        }

        tracing::info!(
            file = %file.name,
            units = units.len(),
            records = records.len(),
            "Assembled document"
        );
        Ok(records)
    }
}

/// Record identifiers carry the same four segments for every kind:
/// file ordinal, kind label, sub-index, chunk ordinal. The file ordinal is
/// the 1-based position of the file in the run's new-file list, so ids are
/// deterministic and collision-free within a run.
fn record_id(file_ordinal: usize, kind: UnitKind, sub_index: u32, chunk_ordinal: usize) -> String {
    format!("{file_ordinal}_{kind}_{sub_index}_{chunk_ordinal}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_ids_follow_the_uniform_scheme() {
        assert_eq!(record_id(1, UnitKind::Table, 0, 2), "1_table_0_2");
        assert_eq!(record_id(3, UnitKind::Image, 2, 0), "3_image_2_0");
        assert_eq!(record_id(2, UnitKind::Prose, 0, 0), "2_prose_0_0");
    }

    #[test]
    fn record_ids_are_distinct_across_kinds_and_ordinals() {
        let mut seen = std::collections::BTreeSet::new();
        for kind in [UnitKind::Table, UnitKind::Image, UnitKind::Prose] {
            for sub_index in 0..3 {
                for chunk in 0..3 {
                    assert!(seen.insert(record_id(1, kind, sub_index, chunk)));
                }
            }
        }
        assert_eq!(seen.len(), 27);
    }
}
