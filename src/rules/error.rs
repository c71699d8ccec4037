use thiserror::Error;

/// Everything that can go wrong while turning rule text into an `AccessRule`.
///
/// `spot` is the name of the entrance / location / event the rule belongs to
/// (`<no spot>` for free-standing rules) and `ast` the offending node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("syntax error in `{text}` at offset {offset}: {message}")]
    Syntax { text: String, offset: usize, message: String },

    #[error("{spot}: `{name}` expects {expected} argument(s), got {found} in `{ast}`")]
    Arity { spot: String, name: String, expected: usize, found: usize, ast: String },

    #[error("{spot}: malformed count tuple ({reason}) in `{ast}`")]
    CountTuple { spot: String, reason: String, ast: String },

    #[error("{spot}: unknown identifier `{name}` in `{ast}`")]
    UnknownName { spot: String, name: String, ast: String },

    #[error("{spot}: unknown function `{name}` in `{ast}`")]
    UnknownFunction { spot: String, name: String, ast: String },

    #[error("{spot}: bad arguments to `{name}` ({reason}) in `{ast}`")]
    InvalidArgument { spot: String, name: String, reason: String, ast: String },

    #[error("{spot}: {message} in `{ast}`")]
    Unsupported { spot: String, message: String, ast: String },

    #[error("{spot}: helper expansion deeper than {limit} levels in `{ast}`")]
    RecursionLimit { spot: String, limit: usize, ast: String },

    #[error("{spot}: unknown region `{region}`")]
    UnknownRegion { spot: String, region: String },

    #[error("invalid helper signature `{0}`")]
    HelperSignature(String),
}
