//! XSLT 1.0 template interpreter.
//!
//! Stylesheets are interpreted directly from their parsed tree: each node is
//! classified as a [`Directive`] and executed against an evaluation
//! [`Context`], writing into a fragment of a caller-supplied output document.

pub mod avt;
pub mod config;
pub mod context;
mod copy;
pub mod directive;
pub mod error;
mod interpreter;
pub mod matcher;
pub mod processor;
pub mod sort;

pub use config::ExecutionConfig;
pub use context::{Context, Value};
pub use directive::Directive;
pub use error::XsltError;
pub use processor::{XsltProcessor, xslt_process};
pub use sort::{SortOrder, SortSpec, SortType};
