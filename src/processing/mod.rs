//! Document processing pipeline: chunking, extraction, and assembly.

pub mod assembler;
pub mod chunking;
pub mod extract;
pub mod service;
pub mod types;

pub use assembler::DocumentAssembler;
pub use chunking::{Chunker, ChunkingError};
pub use extract::{ImageExtractor, ProseExtractor, TableExtractor};
pub use service::IngestionService;
pub use types::{ExtractError, ExtractedUnit, ProcessingError, SourceFile, UnitKind, UploadOutcome};
