use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomError {
    #[error("XML parse error: {0}")]
    Parse(#[from] roxmltree::Error),

    #[error("Node belongs to a different document")]
    WrongDocument,

    #[error("Cannot set attribute '{name}' on a {kind} node")]
    NotAnElement { name: String, kind: String },

    #[error("Cannot append a {child} node to a {parent} node")]
    InvalidChild { parent: String, child: String },
}
