//! Reasoning backends for codewright.
//!
//! All backends implement `codewright_core::Reasoner`. The router builds the
//! configured one.

pub mod openai_compat;
pub mod prompt;
pub mod router;

pub use openai_compat::OpenAiCompatReasoner;
pub use router::build_from_config;
