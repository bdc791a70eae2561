use crate::error::AccessError;

/// Number of addressable memory cells (0x00..=0xFF).
pub const MEMORY_SIZE: usize = 256;

/// Number of general-purpose registers.
pub const REGISTER_COUNT: usize = 8;

/// Register slot used as the stack pointer. It stays an ordinary register:
/// LDI, PRN, CMP and friends may name it directly.
pub const SP: usize = 7;

/// Flat byte-addressed memory. Addresses past the end are errors, never
/// wrapped.
#[derive(Clone)]
pub struct Memory {
    cells: [u8; MEMORY_SIZE],
}

impl Memory {
    pub fn new() -> Self {
        Self {
            cells: [0; MEMORY_SIZE],
        }
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn read(&self, address: usize) -> Result<u8, AccessError> {
        self.cells
            .get(address)
            .copied()
            .ok_or(AccessError::Memory { address })
    }

    pub fn write(&mut self, address: usize, value: u8) -> Result<(), AccessError> {
        let cell = self
            .cells
            .get_mut(address)
            .ok_or(AccessError::Memory { address })?;
        *cell = value;
        Ok(())
    }

    /// Speculative read for operand pre-fetch: out-of-range addresses read 0.
    pub fn peek(&self, address: usize) -> u8 {
        self.cells.get(address).copied().unwrap_or(0)
    }

    /// Copy `image` to the start of memory.
    pub fn load(&mut self, image: &[u8]) -> Result<(), AccessError> {
        if image.len() > self.size() {
            return Err(AccessError::Memory {
                address: self.size(),
            });
        }
        self.cells[..image.len()].copy_from_slice(image);
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.cells.iter().filter(|&&b| b != 0).count();
        f.debug_struct("Memory")
            .field("size", &self.size())
            .field("nonzero", &used)
            .finish()
    }
}

/// The eight general-purpose registers R0..R7.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registers {
    regs: [u8; REGISTER_COUNT],
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> Result<u8, AccessError> {
        self.regs
            .get(index)
            .copied()
            .ok_or(AccessError::Register { index })
    }

    pub fn set(&mut self, index: usize, value: u8) -> Result<(), AccessError> {
        let reg = self
            .regs
            .get_mut(index)
            .ok_or(AccessError::Register { index })?;
        *reg = value;
        Ok(())
    }

    pub fn sp(&self) -> u8 {
        self.regs[SP]
    }

    pub fn set_sp(&mut self, value: u8) {
        self.regs[SP] = value;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.regs
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn in_range_writes_read_back(address in 0usize..MEMORY_SIZE, value in any::<u8>()) {
            let mut m = Memory::new();
            m.write(address, value).unwrap();
            prop_assert_eq!(m.read(address), Ok(value));
            prop_assert_eq!(m.peek(address), value);
        }

        #[test]
        fn out_of_range_never_panics(address in MEMORY_SIZE..usize::MAX) {
            let mut m = Memory::new();
            prop_assert!(m.read(address).is_err());
            prop_assert!(m.write(address, 1).is_err());
            prop_assert_eq!(m.peek(address), 0);
        }
    }
}
