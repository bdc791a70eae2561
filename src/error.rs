//! Error types shared by the loader and the execution engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A bounds violation on memory or on the register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The address is outside the 256-cell memory.
    #[error("memory address {address:#04X} out of bounds")]
    Memory { address: usize },
    /// The register index is outside R0..R7.
    #[error("register index {index} out of bounds")]
    Register { index: usize },
}

/// A condition that terminates the run loop without a HLT.
#[derive(Debug, Error)]
pub enum Fault {
    #[error(transparent)]
    Access(#[from] AccessError),
    /// The byte at `pc` did not decode to any known opcode.
    #[error("{opcode} is an unknown instruction!")]
    UnknownOpcode { opcode: u8, pc: usize },
    /// Writing PRN output failed.
    #[error("output error: {0}")]
    Output(#[from] io::Error),
}

/// Failure to turn a program image into bytes.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{} not found", path.display())]
    FileNotFound { path: PathBuf },
    /// A non-blank, non-comment line is not an 8-bit binary literal.
    #[error("line {line}: malformed binary literal {text:?}")]
    MalformedLiteral { line: usize, text: String },
    /// The image does not fit in memory.
    #[error("program is {len} bytes, memory holds 256")]
    TooLarge { len: usize },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_opcode_message_names_the_byte() {
        let fault = Fault::UnknownOpcode { opcode: 255, pc: 4 };
        assert_eq!(fault.to_string(), "255 is an unknown instruction!");
    }

    #[test]
    fn access_error_converts_to_fault() {
        let fault: Fault = AccessError::Memory { address: 0x100 }.into();
        assert!(matches!(
            fault,
            Fault::Access(AccessError::Memory { address: 0x100 })
        ));
        assert_eq!(fault.to_string(), "memory address 0x100 out of bounds");
    }
}
