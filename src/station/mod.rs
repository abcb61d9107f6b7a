pub mod assembler;
pub mod decoder;
pub mod device;
pub mod engine;
