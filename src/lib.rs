//! Resource graph → Starlark orchestration script compiler.
//!
//! Pipeline: parse → validate → lower → IR validate → codegen → state trailer.

pub mod codegen;
pub mod compile;
pub mod error;
pub mod ir;
pub mod lower;
pub mod parse;
pub mod state;
pub mod validate;
pub mod wasm;

pub use compile::{CompileOptions, CompileOutput, compile, compile_with_prior_script};
pub use error::{CompileError, LoadError};
