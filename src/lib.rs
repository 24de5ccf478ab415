pub mod aliases;
pub mod analyze;
pub mod ast;
pub mod classify;
pub mod cli;
pub mod config;
pub mod graph;
pub mod model;
pub mod normalize;
pub mod parse;
pub mod project;
pub mod resolve;
pub mod scan;
pub mod symbols;
pub mod util;
