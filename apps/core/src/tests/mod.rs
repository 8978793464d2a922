//! Test Module
//!
//! Cross-module test suite for the CareerGPT core.
//!
//! ## Test Categories
//! - `brain_tests`: Routing laws for classification, composition and the router
//! - `supervisor_tests`: Supervisor orchestration with mock actors
//! - `integration_tests`: Full conversation flows against a mock completion server
