//! # briefbot
//!
//! A once-daily briefing pipeline over a government bulletin board: fetch
//! the newest daily report, rebuild a single-report retrieval index from
//! it, answer one fixed analytical question with retrieval-augmented
//! generation, and post the answer to a chat webhook.
//!
//! ```text
//! ┌─────────┐   ┌─────────┐   ┌──────────┐   ┌──────────┐
//! │ Fetcher │──▶│ Indexer │──▶│ Answerer │──▶│ Notifier │
//! │ PDF→text│   │ SQLite  │   │ RAG(LLM) │   │ webhook  │
//! └─────────┘   └─────────┘   └──────────┘   └──────────┘
//! ```
//!
//! Control flow is strictly linear and one report wide: every run replaces
//! the previous index by an atomic directory swap, so queries only ever
//! see the newest report. An external scheduler triggers one run per day;
//! every stage fails with a classified error so the scheduler can decide
//! what to retry.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Classified stage failures |
//! | [`fetch`] | Board discovery, PDF download and text extraction |
//! | [`chunk`] | Deterministic overlapping text splitter |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Index build, atomic swap, and read access |
//! | [`generate`] | Generation provider abstraction |
//! | [`answer`] | Retrieval + generation for the daily question |
//! | [`notify`] | Webhook delivery |
//! | [`pipeline`] | End-to-end orchestration |

pub mod answer;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod fetch;
pub mod generate;
pub mod index;
pub mod models;
pub mod notify;
pub mod pipeline;
