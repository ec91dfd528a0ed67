/// Errors from identifier parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The string does not match the record identifier grammar.
    #[error("malformed record identifier {input:?}: {reason}")]
    Malformed { input: String, reason: String },
}
