pub mod ast;
pub mod corpus;
pub mod instantiate;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod problem;
pub mod shape;
pub mod template;
pub mod token;
