//! # Codescope Vector Store
//!
//! Cosine similarity and ranked, thresholded search over in-memory
//! embedding vectors. Vectors of unequal dimension are never compared:
//! [`cosine_similarity`] returns [`VectorStoreError::DimensionMismatch`] and
//! [`search`] skips such candidates.
//!
//! ## Example
//!
//! ```
//! use codescope_vector_store::search;
//!
//! let stored = vec![("a.rs", vec![1.0, 0.0]), ("b.rs", vec![0.0, 1.0])];
//! let hits = search(&[1.0, 0.1], stored.iter().map(|(k, v)| (*k, v.as_slice())), 5, 0.7);
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].key, "a.rs");
//! ```

mod error;
mod similarity;

pub use error::Result;
pub use error::VectorStoreError;
pub use similarity::SimilarityResult;
pub use similarity::cosine_similarity;
pub use similarity::search;
