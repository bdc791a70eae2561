pub mod alu;
pub mod cpu;
pub mod error;
pub mod isa;
pub mod loader;
pub mod memory;
