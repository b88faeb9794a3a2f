//! Document ingestion pipeline: chunking, embedding and indexing

mod chunker;
mod ingestor;

pub use chunker::TextChunker;
pub use ingestor::DocumentIngestor;
