//! Turns source text into values: a logos lexer feeding a recursive descent reader

pub mod lexer;
pub mod parser;

pub use parser::{read_all, read_str};
