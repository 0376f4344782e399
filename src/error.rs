// src/error.rs
use thiserror::Error;
use weft_dom::DomError;
use weft_xslt::XsltError;

/// Everything that can go wrong between input text and output text.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parsing failed: {0}")]
    Parse(#[from] DomError),

    #[error("Transform failed: {0}")]
    Transform(#[from] XsltError),
}
