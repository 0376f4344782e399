//! An XSLT 1.0 template interpreter.
//!
//! Parse the source and stylesheet with [`Document::parse`], load the stylesheet
//! into an [`XsltProcessor`] and transform into a fragment of any output
//! [`Document`]. [`transform_str`] does all of that for text in, text out.

pub mod error;

pub use error::Error;
pub use weft_dom as dom;
pub use weft_dom::{Document, NodeKind, SerializeOptions, XmlNode, xml_text, xml_value};
pub use weft_xpath1 as xpath;
pub use weft_xslt as xslt;
pub use weft_xslt::{ExecutionConfig, Value, XsltError, XsltProcessor, xslt_process};

/// Transforms `xml` with `xslt` and serializes the result.
pub fn transform_str(xml: &str, xslt: &str) -> Result<String, Error> {
    transform_str_with(xml, xslt, ExecutionConfig::default())
}

/// [`transform_str`] with an explicit configuration.
pub fn transform_str_with(xml: &str, xslt: &str, config: ExecutionConfig) -> Result<String, Error> {
    let source = Document::parse(xml)?;
    let stylesheet = Document::parse(xslt)?;

    let mut processor = XsltProcessor::with_config(config);
    processor.import_stylesheet(stylesheet.root());
    let output = Document::new();
    let fragment = processor.transform_to_fragment(source.root(), &output)?;
    log::debug!("Serializing {} output nodes", output.node_count());
    Ok(xml_text(fragment, &SerializeOptions::default()))
}
