//! Semantic retrieval: the `VectorRetriever` wrapping an injected
//! `VectorStore`, plus an in-memory reference store used by tests and
//! the CLI.

pub mod retriever;
pub mod store;

pub use retriever::VectorRetriever;
pub use store::MemoryVectorStore;
