use crate::stack::StackError;

/// Errors raised while analyzing a process chain.
///
/// None of these are recovered internally; a failed analysis should be rerun
/// with different inputs.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// More than one process produces an item and nothing picked one.
    #[error("ambiguous production of '{item}': candidates {candidates:?} and no priority selector chose one")]
    AmbiguousProduction { item: String, candidates: Vec<String> },

    /// An item is required but nothing produces it and it is not imported.
    #[error("unresolved item '{item}' (required by {})", requester(.requested_by))]
    UnresolvedItem {
        item: String,
        requested_by: Option<String>,
    },

    /// The balance system has no consistent non-negative solution.
    #[error("unsatisfiable network: {reason}")]
    Unsatisfiable { reason: String },

    /// A pass was run on input that an earlier pass should have prepared.
    #[error("{pass} requires {requirement}")]
    MissingPrecondition {
        pass: &'static str,
        requirement: String,
    },

    /// No factory can run a process's group.
    #[error("no factory for process '{process}' in group '{group}'")]
    NoFactory { process: String, group: String },

    #[error("unknown process: {0}")]
    UnknownProcess(String),

    #[error("duplicate process: {0}")]
    DuplicateProcess(String),

    #[error(transparent)]
    Stack(#[from] StackError),
}

fn requester(requested_by: &Option<String>) -> &str {
    requested_by.as_deref().unwrap_or("target")
}
