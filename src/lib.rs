// SPDX-License-Identifier: MIT OR Apache-2.0

//! coba - call graph extraction for C/C++ projects
//!
//! Source files are parsed by one of two backends (tree-sitter syntax trees or
//! libclang translation units) and normalized into [`model::CallRecord`]s.

pub mod analysis;
pub mod config;
pub mod errors;
pub mod language;
pub mod model;
pub mod output;
pub mod parser;
pub mod project;
pub mod session;
