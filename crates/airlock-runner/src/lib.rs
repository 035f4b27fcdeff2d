//! LLM-backed decision oracle for the Airlock simulation.
//!
//! [`oracle::LlmOracle`] implements the core's decision oracle on top of
//! two HTTP protocols (`OpenAI`-compatible chat completions and the
//! Anthropic Messages API). Prompts are `minijinja` templates, agent memory
//! is read from the core's round-indexed log store, and free-text answers
//! are parsed leniently into legal decisions.

pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod oracle;
pub mod parse;
pub mod prompt;
