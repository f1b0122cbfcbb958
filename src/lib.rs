//! A tiny 8-bit byte-code machine and the assembler for its `.s8` source format.

pub mod config;
pub mod machine;
pub mod memory;
pub mod processor;
pub mod program;
pub mod registers;
