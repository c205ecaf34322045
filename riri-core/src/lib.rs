//! Core compiler pipeline for RiriLang.
//!
//! The pipeline is:
//!
//!   source .rr
//!     -> lexer       (tokens)
//!     -> parser      (AST)
//!     -> resolver    (imports spliced in, one program)
//!     -> codegen_cpp (C++20 text, prefixed by the runtime prelude)
//!
//! The CLI drives this crate and hands the C++ to a host compiler.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod lexer;
pub mod parser;
pub mod ast;

// ---------------------------------------------------------------------
// Module loading
// ---------------------------------------------------------------------

pub mod source;
pub mod resolver;

// ---------------------------------------------------------------------
// Back-end: C++ emission and compiler orchestration
// ---------------------------------------------------------------------

pub mod builtins;
pub mod receiver;
pub mod prelude;
pub mod codegen_cpp;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use codegen_cpp::{EmitOptions, emit};
pub use compiler::{CompilationArtifact, compile_file, compile_source};
pub use diagnostic::{Diagnostic, DiagnosticSink};
pub use error::CoreError;
pub use lexer::tokenize;
pub use parser::{parse, parse_source};
pub use resolver::{ImportResolver, resolve_imports};
