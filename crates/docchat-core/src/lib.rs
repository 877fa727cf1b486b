//! # docchat core
//!
//! Retrieval-augmented generation core for document-aware chat: sliding-window
//! chunking, batched embedding, a versioned index cache, cosine-similarity
//! retrieval, and citation handling (page/heading lookup and rewriting of
//! `[CHUNK n]` markers in model output).
//!
//! This crate performs no network or filesystem I/O. Embedding, completion and
//! text extraction are consumed through the [`embedding::Embedder`],
//! [`completion::Completer`] and [`source::TextSource`] traits; concrete
//! implementations live in the `docchat` application crate.
//!
//! ## Data flow
//!
//! ```text
//! text ─▶ chunk ─▶ embed ─▶ IndexCache ─▶ retrieve ─▶ excerpts + locate
//!                                                        │
//!                       answer ◀─ rewrite ◀─ complete ◀──┘
//! ```

pub mod cache;
pub mod chat;
pub mod chunk;
pub mod citation;
pub mod completion;
pub mod context;
pub mod embedding;
pub mod error;
pub mod locate;
pub mod models;
pub mod retrieve;
pub mod source;

pub use error::{Capability, RagError};
