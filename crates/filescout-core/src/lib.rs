//! # FileScout Core
//!
//! Retrieval-and-filtering logic for FileScout: the record model, query
//! splitting, constraint building, the similarity index abstraction, result
//! refinement, summaries, and the two search entry points.
//!
//! This crate contains no filesystem, HTTP, or CLI code. Applications build
//! a [`SimilarityIndex`](index::SimilarityIndex) once at startup and pass it
//! to [`search`] functions for every request.

pub mod embedding;
pub mod filter;
pub mod index;
pub mod models;
pub mod refine;
pub mod search;
pub mod split;
pub mod summary;
