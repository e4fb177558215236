//! CQL (Common Query Language) 过滤表达式引擎
//!
//! 文本 → token → 过滤树 → 化简 → 文本:
//!
//! ```
//! use cql_engine::{read, simplify, write};
//!
//! let filter = read(r#"("a" = 1 OR "b" = 2) OR "c" = 3"#).unwrap();
//! let text = write(&simplify(&filter)).unwrap();
//! assert_eq!(text, r#"("a" = 1) OR ("b" = 2) OR ("c" = 3)"#);
//! ```

pub mod ast;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod simplify;
pub mod temporal;
pub mod token;
pub mod writer;

pub use ast::{
    BinaryOperator, BoundingBox, Comparison, Filter, FilterFunction, Geometry, Literal, Logical,
    LogicalOperator, Operand, Predicate, Spatial, SpatialOperator, SpatialPredicate, Subject,
    Temporal, TemporalPredicate,
};
pub use config::{FunctionRegistry, ReaderConfig};
pub use error::{CqlError, Result};
pub use lexer::{tokenize, Lexer};
pub use parser::{build_ast, build_ast_with, read, read_with};
pub use simplify::simplify;
pub use token::{Span, Token, TokenKind};
pub use writer::write;
