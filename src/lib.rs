//! Prompt quality analysis: score a prompt across ten categories, or compare
//! several prompts side by side and pick the strongest one.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod export;
pub mod flow;
pub mod models;
pub mod notify;
pub mod output;
pub mod scoring;
pub mod slots;
