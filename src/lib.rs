//! # FileScout
//!
//! File and link retrieval for conversational agents.
//!
//! FileScout loads a corpus of file metadata (source, type, size, dates) and
//! LLM-generated insights from CSV, embeds the insights into an in-memory
//! similarity index, and answers two kinds of requests: "find files like
//! this, under these constraints" and "find the latest link for this".
//! Ranking is semantic; every metadata constraint and the creation-date
//! window are then re-applied exactly before results are returned.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌────────────────┐
//! │   CSV    │──▶│   Embedder   │──▶│ InMemoryIndex  │
//! │  corpus  │   │ hashing/OAI  │   │ (core crate)   │
//! └──────────┘   └──────────────┘   └───────┬────────┘
//!                                           │
//!                 split → filter → query → refine → summarize
//!                                           │
//!                      ┌────────────────────┤
//!                      ▼                    ▼
//!                 ┌──────────┐        ┌──────────┐
//!                 │   CLI    │        │   HTTP   │
//!                 │ (scout)  │        │  tools   │
//!                 └──────────┘        └──────────┘
//! ```
//!
//! The retrieval pipeline itself lives in `filescout-core`; this crate adds
//! configuration, ingestion, the OpenAI embedder and the outer surfaces.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`ingest`] | CSV loading and index construction |
//! | [`embedding`] | Embedder selection and the OpenAI backend |
//! | [`search`] | `search`, `links` and `list` commands |
//! | [`stats`] | Corpus statistics |
//! | [`tools`] | Agent tool trait, registry and declarations |
//! | [`server`] | HTTP tool server |

pub mod config;
pub mod embedding;
pub mod ingest;
pub mod search;
pub mod server;
pub mod stats;
pub mod tools;
