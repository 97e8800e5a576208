//! Syntax layer for graphex.
//!
//! This crate provides:
//! - `token`: Token kinds and token structures
//! - `lexer`: Tokenization
//! - `ast`: Executable document syntax tree
//! - `parser`: Recursive descent parser
//! - `document`: Operation extraction and the (caching) document parser

pub mod ast;
pub mod document;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::*;
pub use document::{
    parse_document, CachingDocumentParser, DocumentParser, Fragments, Operation, ParseError,
};
pub use lexer::Lexer;
pub use parser::{parse, ParseResult};
pub use token::{Token, TokenKind};
