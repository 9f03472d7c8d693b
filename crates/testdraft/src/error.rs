use crate::types::ModuleName;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Any failure surfaced by the draft engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Reduce(#[from] ReduceError),

    #[error(transparent)]
    Nav(#[from] NavError),
}

/// A command envelope that names a known kind but cannot be decoded.
///
/// Unknown kinds are not errors; see [`ParsedCommand::Ignored`](crate::v1::ParsedCommand::Ignored).
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("malformed command envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("command kind `{kind}` requires a tag")]
    MissingTag { kind: String },

    #[error("unknown tag `{tag}` for command kind `{kind}`")]
    UnknownTag { kind: String, tag: String },

    #[error("invalid payload for `{kind}/{tag}`: {source}")]
    Payload {
        kind: String,
        tag: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A transition that would leave the draft inconsistent with what the
/// caller displayed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReduceError {
    #[error("no argument slot `{argument}` in sub-function `{sub_function_name}`")]
    SlotNotFound {
        sub_function_name: String,
        argument: String,
    },

    #[error("no active function loaded; its parameter structure is required")]
    MissingFunction,

    #[error("module `{0}` is not enabled")]
    ModuleDisabled(ModuleName),
}

/// Nested editor failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavError {
    #[error("no editor frame labelled `{0}`")]
    UnknownFrame(String),

    #[error("frame `{label}` has no live parent `{parent}`")]
    OrphanFrame { label: String, parent: String },

    #[error("`{0}` does not hold an object or array value")]
    NotComposite(String),

    #[error("field `{key}` does not exist in frame `{label}`")]
    MissingField { label: String, key: String },

    #[error(transparent)]
    Reduce(#[from] ReduceError),
}
