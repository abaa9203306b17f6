use anyhow::Context;
use clap::{Parser, Subcommand};
use docdex::config::{IngestSettings, SearchSettings};
use docdex::processing::IngestionService;
use docdex::search::{IndexWriter, SearchIndexClient};

/// Ingest PDF documents into a hybrid keyword/vector search index.
#[derive(Parser)]
#[command(name = "docdex", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index every new PDF found in the blob container.
    Upload {
        /// Index name the documents are written to.
        user_id: String,
        /// Blob storage container holding the PDFs.
        container_name: String,
    },
    /// Delete previously indexed documents by blob name.
    Delete {
        /// Index name the documents are removed from.
        user_id: String,
        /// Blob storage container the documents came from.
        container_name: String,
        /// Blob names whose records should be removed.
        #[arg(long = "blob-names", num_args = 1.., required = true)]
        blob_names: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    docdex::logging::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Upload {
            user_id,
            container_name,
        } => {
            let settings = IngestSettings::from_env().context("loading upload configuration")?;
            let service = IngestionService::new(&settings, &user_id, &container_name)?;
            tracing::info!(index = %user_id, container = %container_name, "Starting upload operation");
            let outcome = service.upload().await?;
            tracing::info!(
                files_discovered = outcome.files_discovered,
                files_indexed = outcome.files_indexed,
                files_failed = outcome.files_failed,
                records_uploaded = outcome.records_uploaded,
                "Upload operation finished"
            );
            if outcome.files_failed > 0 {
                anyhow::bail!(
                    "{} of {} file(s) failed to process; re-run upload to retry them",
                    outcome.files_failed,
                    outcome.files_discovered
                );
            }
        }
        Command::Delete {
            user_id,
            container_name,
            blob_names,
        } => {
            let settings = SearchSettings::from_env().context("loading delete configuration")?;
            tracing::debug!(container = %container_name, "Delete operates on the search index only");
            let client = SearchIndexClient::new(
                &settings.search_endpoint,
                &settings.search_admin_key,
                &user_id,
                settings.http_timeout_secs,
            )?;
            let writer = IndexWriter::new(client, settings.upload_batch_size);
            let deleted = writer.delete_files(&blob_names).await?;
            tracing::info!(index = %user_id, deleted, "Delete operation finished");
        }
    }

    Ok(())
}
