use thiserror::Error;
use weft_dom::DomError;
use weft_xpath1::XPathError;

#[derive(Error, Debug)]
pub enum XsltError {
    #[error("Not implemented: xsl:{0}")]
    NotImplemented(String),

    #[error("xsl:{0} is only valid inside its owning instruction")]
    Misplaced(String),

    #[error("Unsupported sort data-type '{0}'")]
    UnsupportedSortType(String),

    #[error("Cannot set attribute '{name}' on a {kind} node")]
    NotAnElement { name: String, kind: String },

    #[error("No XSL stylesheet was given")]
    NoStylesheet,

    #[error("Call to unknown named template '{0}'")]
    UnknownTemplate(String),

    #[error("XPath evaluation error: {0}")]
    XPath(#[from] XPathError),

    #[error("Output tree error: {0}")]
    Dom(#[from] DomError),
}
