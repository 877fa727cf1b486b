//! # docchat
//!
//! Chat with a single document, grounded in its freshest content.
//!
//! `docchat` loads a document through a text source, splits it into
//! overlapping chunks, embeds them, and keeps the resulting index in a
//! process-wide cache keyed by `(document id, content version)`. Each question
//! retrieves the most similar excerpts, hands them to a chat model as numbered
//! `[CHUNK n]` blocks, and rewrites the model's citation markers into page or
//! heading labels.
//!
//! The retrieval pipeline itself lives in [`docchat_core`]; this crate provides
//! the concrete capabilities around it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌─────────────┐
//! │ FsTextSource │──▶│  IndexCache   │──▶│  Retriever  │
//! │ PDF/OOXML/md │   │ chunk + embed │   │  top-K      │
//! └──────────────┘   └──────────────┘   └──────┬──────┘
//!                                              ▼
//!                    ┌──────────────┐   ┌─────────────┐
//!                    │  Citation    │◀──│  Completer  │
//!                    │  rewriter    │   │ OpenAI/Olla │
//!                    └──────────────┘   └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docchat chunks handbook.pdf
//! docchat retrieve handbook.pdf "refund window" --k 5
//! docchat ask handbook.pdf "How long do refunds take?" --mode page
//! docchat rewrite "Free [CHUNK 1]." --meta '{"1": {"page": 3}}'
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`docref`] | Document ids and shareable links |
//! | [`source`] | Filesystem text source |
//! | [`extract`] | PDF / DOCX / PPTX / XLSX text extraction |
//! | [`embedding`] | Embedding providers |
//! | [`completion`] | Chat completion providers |
//! | [`app`] | Config → providers → chat engine wiring |

pub mod app;
pub mod ask;
pub mod chunks_cmd;
pub mod completion;
pub mod config;
pub mod docref;
pub mod embedding;
pub mod extract;
mod http;
pub mod retrieve_cmd;
pub mod rewrite_cmd;
pub mod source;
