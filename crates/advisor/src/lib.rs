//! Advice generation for sustainability suggestions.
//!
//! The remote model is only ever a source of free-form advice. Every failure
//! (transport, status, unparsable text, open circuit) degrades to the fixed
//! per-domain catalog, so callers always receive a usable list.

pub mod breaker;
pub mod catalog;
pub mod llm;
pub mod strategy;

pub use breaker::CircuitBreaker;
pub use catalog::{fallback_suggestions, FALLBACK_CATALOG_VERSION};
pub use llm::{AdvisorError, HttpLlmClient, LlmClient};
pub use strategy::{extract_suggestions, SuggestionStrategy};
