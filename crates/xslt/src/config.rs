/// Configuration for a transform run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// If true, a reference to a variable bound in no scope is an error
    /// instead of an empty node-set.
    pub strict: bool,
}
