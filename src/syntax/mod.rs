//! Lexer, AST, and parser for the guest expression language that `e`,
//! `x`, and `r` command payloads are written in.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{Expression, Statement};
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Token, TokenType};
