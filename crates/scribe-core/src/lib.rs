//! Conversation core library.
//!
//! Answers natural-language questions about a specific screenplay by
//! combining pre-computed retrieval context with dynamic, tool-mediated
//! access to the manuscript. See SPEC_FULL.md for the full contract.

pub mod agent_loop;
pub mod background;
pub mod config;
pub mod context_builder;
pub mod conversation_service;
pub mod db;
pub mod embedding_client;
pub mod error;
pub mod evidence;
pub mod exchange;
pub mod llm;
pub mod retrieval;
pub mod router;
pub mod schema;
pub mod token;
pub mod tools;

pub use config::Config;
pub use db::Db;
pub use error::CoreError;
