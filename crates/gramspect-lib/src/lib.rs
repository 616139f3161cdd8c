//! gramspect: ANTLR4 grammar analysis engine.
//!
//! # Example
//!
//! ```
//! use gramspect_lib::{Engine, Request};
//!
//! let engine = Engine::with_defaults();
//! let report = engine
//!     .parse_sample(
//!         "grammar Hello; greeting : 'hello' ID ; ID : [a-z]+ ; WS : [ ]+ -> skip ;",
//!         "hello world",
//!         Some("greeting"),
//!         &mut Request::default(),
//!     )
//!     .expect("valid grammar");
//! assert!(report.success);
//! ```
//!
//! The crate wires the front end (`gramspect-syntax`), the ATN builder
//! (`gramspect-atn`), and the interpreter (`gramspect-vm`) behind an
//! [`Engine`] façade, and adds the static analyses, renderers, the
//! content-addressed cache, the codegen contract, and test-input
//! generation.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod analysis;
pub mod cache;
pub mod codegen;
pub mod engine;
pub mod gen_inputs;
pub mod render;

pub use engine::{CompiledGrammar, Engine, EngineError, EngineResult, Request};

pub use gramspect_core::{CancelToken, EngineConfig, ErrorDetail, ErrorKind, Severity, reports};
