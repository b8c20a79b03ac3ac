pub mod aggregator;
pub mod assembler;
pub mod breakdown;
pub mod file_loader;
pub mod normalizer;
pub mod reader;
pub mod segmenter;
pub mod store;
pub mod validator;
