use derive_more::{Add, AddAssign};

/// `Sequence` number newtype.
///
/// Assigned per probe within a session, starting at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Add, AddAssign)]
pub struct Sequence(pub u16);

/// `SessionId` newtype.
///
/// A random 16-bit tag embedded in every probe to distinguish this session's
/// echoes from other ICMP traffic sharing the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd)]
pub struct SessionId(pub u16);

/// `PayloadSize` newtype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd)]
pub struct PayloadSize(pub u16);

/// `PayloadPattern` newtype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd)]
pub struct PayloadPattern(pub u8);

impl From<Sequence> for usize {
    fn from(sequence: Sequence) -> Self {
        Self::from(sequence.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_arithmetic() {
        let mut sequence = Sequence(0);
        sequence += Sequence(1);
        assert_eq!(Sequence(1), sequence);
        assert_eq!(Sequence(3), sequence + Sequence(2));
        assert_eq!(1_usize, usize::from(sequence));
    }
}
