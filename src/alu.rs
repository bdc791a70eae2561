use bitflags::bitflags;

bitflags! {
    /// The flags register. Only the low three bits are used; after a
    /// comparison exactly one of them is set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flags: u8 {
        const EQUAL = 1 << 0;
        const GREATER = 1 << 1;
        const LESS = 1 << 2;
    }
}

/// Operations carried out by the arithmetic/logic unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Cmp,
    Add,
    Sub,
    Mul,
}

/// What an [`AluOp`] produces: new flags, or a value for the first operand's
/// register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluResult {
    Flags(Flags),
    Value(u8),
}

/// Unsigned comparison of two register values.
pub fn compare(a: u8, b: u8) -> Flags {
    match a.cmp(&b) {
        std::cmp::Ordering::Equal => Flags::EQUAL,
        std::cmp::Ordering::Less => Flags::LESS,
        std::cmp::Ordering::Greater => Flags::GREATER,
    }
}

/// Arithmetic wraps modulo 256.
pub fn execute(op: AluOp, a: u8, b: u8) -> AluResult {
    match op {
        AluOp::Cmp => AluResult::Flags(compare(a, b)),
        AluOp::Add => AluResult::Value(a.wrapping_add(b)),
        AluOp::Sub => AluResult::Value(a.wrapping_sub(b)),
        AluOp::Mul => AluResult::Value(a.wrapping_mul(b)),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn exactly_one_flag(a in any::<u8>(), b in any::<u8>()) {
            let flags = compare(a, b);
            prop_assert_eq!(flags.bits().count_ones(), 1);
            prop_assert_eq!(flags.bits() & !0b111, 0);
            prop_assert_eq!(flags.contains(Flags::EQUAL), a == b);
            prop_assert_eq!(flags.contains(Flags::LESS), a < b);
            prop_assert_eq!(flags.contains(Flags::GREATER), a > b);
        }
    }
}
