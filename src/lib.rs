//! # Edu PDF Store
//!
//! Catalog and file storage backend for educational PDFs (syllabi and past
//! papers), organized as `type/grade/subject[/medium]` folders on disk.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (categories, PDFs, listings)
//! - **normalize**: Name to slug normalization and filename sanitizing
//! - **storage**: Storage paths, errors and JSONL table I/O
//! - **catalog**: Grade, subject, medium and PDF rows behind a backend trait
//! - **folders**: The folder tree under the storage root
//! - **reconcile**: Listings that merge catalog rows with folders on disk
//! - **library**: Upload, retrieval and deletion flows
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod catalog;
pub mod config;
pub mod folders;
pub mod library;
pub mod models;
pub mod normalize;
pub mod reconcile;
pub mod storage;

pub use models::*;
