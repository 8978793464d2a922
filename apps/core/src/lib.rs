//! CareerGPT core: keyword intent routing, canned responses and
//! retrieval-augmented answers behind an actor-based supervisor.

pub mod actors;
pub mod brain;
pub mod config;
pub mod error;
pub mod models;
pub mod repl;

#[cfg(test)]
mod tests;
