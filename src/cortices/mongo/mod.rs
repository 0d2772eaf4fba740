pub mod cortex;
pub mod error;
pub mod ops;
pub mod parser;
