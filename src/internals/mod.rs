pub mod blocks;
pub mod builtin;
pub mod compiler;
pub mod console;
pub mod debug;
pub mod files;
pub mod float;
pub mod general;
pub mod inner;
pub mod numbers;
pub mod parse;
pub mod signals;
pub mod terminal;
