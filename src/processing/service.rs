//! Ingestion service coordinating the upload operation end to end.

use crate::blob::BlobStore;
use crate::config::IngestSettings;
use crate::embedding::{EmbeddingClient, RemoteEmbeddings};
use crate::layout::LayoutClient;
use crate::processing::assembler::DocumentAssembler;
use crate::processing::chunking::Chunker;
use crate::processing::types::{ProcessingError, SourceFile, UploadOutcome};
use crate::queue::QueueNotifier;
use crate::search::{IndexRecord, IndexWriter, SearchIndexClient};
use crate::vision::VisionClient;

/// Coordinates the full upload pipeline: discovery, extraction, chunking,
/// embedding, index writes, and queue notification.
///
/// The service owns long-lived handles to every collaborator; construct it
/// once per operation from explicit settings.
pub struct IngestionService {
    blob: BlobStore,
    queue: QueueNotifier,
    layout: LayoutClient,
    vision: VisionClient,
    embedder: Box<dyn EmbeddingClient>,
    writer: IndexWriter,
    chunker: Chunker,
    vector_dimension: usize,
}

impl IngestionService {
    /// Build the service from settings, an index name, and a container name.
    pub fn new(
        settings: &IngestSettings,
        index_name: &str,
        container_name: &str,
    ) -> Result<Self, ProcessingError> {
        let timeout = settings.search.http_timeout_secs;
        let blob =
            BlobStore::from_connection_string(&settings.blob_connection_string, container_name, timeout)?;
        let queue = QueueNotifier::from_connection_string(
            &settings.queue_connection_string,
            &settings.queue_name,
            timeout,
        )?;
        let layout = LayoutClient::new(&settings.layout_endpoint, &settings.layout_api_key, timeout)?;
        let vision = VisionClient::new(&settings.vision_endpoint, &settings.vision_api_key, timeout)?;
        let embedder = RemoteEmbeddings::new(
            &settings.embedding_endpoint,
            &settings.embedding_api_key,
            &settings.embedding_deployment,
            &settings.embedding_api_version,
            settings.search.vector_dimension,
            timeout,
        )?;
        let search_client = SearchIndexClient::new(
            &settings.search.search_endpoint,
            &settings.search.search_admin_key,
            index_name,
            timeout,
        )?;
        let writer = IndexWriter::new(search_client, settings.search.upload_batch_size);
        let chunker = Chunker::new(settings.chunk_size, settings.chunk_overlap)?;

        Ok(Self {
            blob,
            queue,
            layout,
            vision,
            embedder: Box::new(embedder),
            writer,
            chunker,
            vector_dimension: settings.search.vector_dimension,
        })
    }

    /// Index every new PDF in the container.
    ///
    /// Files already present in the index (by filepath) are skipped. Each
    /// file is processed in isolation: a failing file is logged and skipped
    /// while the rest of the run continues. Queue notification is best-effort
    /// and happens only after the index upload succeeded.
    pub async fn upload(&self) -> Result<UploadOutcome, ProcessingError> {
        self.blob.ensure_container().await?;
        self.writer.ensure_index(self.vector_dimension).await?;

        let existing = self.writer.list_existing_files().await?;
        let all_files = self.blob.list_pdf_names().await?;
        let files_discovered = all_files.len();
        let new_files: Vec<String> = all_files
            .into_iter()
            .filter(|name| !existing.contains(name))
            .collect();

        if new_files.is_empty() {
            tracing::info!(files_discovered, "No new files to index");
            return Ok(UploadOutcome {
                files_discovered,
                ..UploadOutcome::default()
            });
        }

        let assembler =
            DocumentAssembler::new(&self.layout, &self.vision, self.embedder.as_ref(), &self.chunker);

        let mut records: Vec<IndexRecord> = Vec::new();
        let mut indexed_files: Vec<String> = Vec::new();
        let mut files_failed = 0usize;

        for (position, name) in new_files.into_iter().enumerate() {
            tracing::info!(file = %name, "Processing file");
            match self.process_file(&assembler, &name, position + 1).await {
                Ok(file_records) => {
                    records.extend(file_records);
                    indexed_files.push(name);
                }
                Err(error) => {
                    tracing::error!(file = %name, error = %error, "Failed to process file; skipping");
                    files_failed += 1;
                }
            }
        }

        if records.is_empty() {
            tracing::info!("No new documents to upload");
            return Ok(UploadOutcome {
                files_discovered,
                files_indexed: indexed_files.len(),
                files_failed,
                records_uploaded: 0,
            });
        }

        let summary = self.writer.upload(&records).await?;

        for name in &indexed_files {
            if let Err(error) = self.queue.notify_indexed(name).await {
                tracing::warn!(file = %name, error = %error, "Queue notification failed; upload is unaffected");
            }
        }

        Ok(UploadOutcome {
            files_discovered,
            files_indexed: indexed_files.len(),
            files_failed,
            records_uploaded: summary.documents,
        })
    }

    /// Download and assemble one file. The downloaded buffer is scoped to
    /// this call and released on every exit path.
    async fn process_file(
        &self,
        assembler: &DocumentAssembler<'_>,
        name: &str,
        file_ordinal: usize,
    ) -> Result<Vec<IndexRecord>, ProcessingError> {
        let content = self.blob.download(name).await?;
        let file = SourceFile {
            name: name.to_string(),
            content,
        };
        assembler.assemble(&file, file_ordinal).await
    }
}
