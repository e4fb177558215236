use thiserror::Error;

use crate::token::TokenKind;

/// Errors produced while reading or writing CQL.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CqlError {
    /// No expected token kind matched the remaining input.
    #[error("grammar error at offset {offset}: in parsing [{text}], expected one of: {}", kind_list(.expected))]
    Grammar {
        offset: usize,
        text: String,
        expected: Vec<TokenKind>,
    },
    /// A structural invariant was violated while building the filter tree.
    #[error("parse error: {0}")]
    Parse(String),
    #[error("unsupported filter function: {0}")]
    UnsupportedFilterFunction(String),
    /// The tree was built but disconnected expressions remain.
    #[error("malformed expression: {remaining} unconsumed operand(s) after the filter")]
    TrailingTokens { remaining: usize },
    #[error("can't encode: {0}")]
    UnencodableValue(String),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CqlError>;

fn kind_list(kinds: &[TokenKind]) -> String {
    kinds
        .iter()
        .map(|kind| kind.name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[macro_export]
macro_rules! parse_error {
    ($($args:tt)*) => {
        $crate::error::CqlError::Parse(format!($($args)*))
    };
}

#[macro_export]
macro_rules! unencodable {
    ($($args:tt)*) => {
        $crate::error::CqlError::UnencodableValue(format!($($args)*))
    };
}
