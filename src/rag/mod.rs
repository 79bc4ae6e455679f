//! Retrieval-augmented generation over a single uploaded document.
//!
//! - `DocumentPipeline`: loads, splits and embeds a text file into a `VectorIndex`
//! - `IndexHandle`: holds the most recently ingested index
//! - `AnswerChain`: retrieves relevant chunks and asks the model to answer from them

pub mod chain;
pub mod chunker;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod retriever;

pub use chain::AnswerChain;
pub use chunker::{split_text, TextChunk};
pub use error::RagError;
pub use index::{DocumentChunk, IndexHandle, IndexSummary, VectorIndex};
pub use pipeline::DocumentPipeline;
pub use retriever::{RetrievedChunk, Retriever};
