use std::fmt;

pub type BitResult<T> = Result<T, BitError>;

/// Failure of a single bit-level read or write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitError {
    /// A read needed more bits than the buffer has left.
    EndOfBuffer { requested: usize, available: usize },
    /// Width outside what the operation supports.
    InvalidBitCount { bits: usize, max_bits: usize },
    /// `value` has bits set above the requested width.
    ValueOutOfRange { value: u64, bits: usize },
}

impl fmt::Display for BitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndOfBuffer {
                requested,
                available,
            } => write!(f, "buffer exhausted: need {requested} bits, have {available}"),
            Self::InvalidBitCount { bits, max_bits } => {
                write!(f, "bit width {bits} exceeds limit of {max_bits}")
            }
            Self::ValueOutOfRange { value, bits } => {
                write!(f, "{value} does not fit in {bits} bits")
            }
        }
    }
}

impl std::error::Error for BitError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_numbers() {
        let cases = [
            (
                BitError::EndOfBuffer {
                    requested: 8,
                    available: 3,
                },
                "buffer exhausted: need 8 bits, have 3",
            ),
            (
                BitError::InvalidBitCount {
                    bits: 70,
                    max_bits: 64,
                },
                "bit width 70 exceeds limit of 64",
            ),
            (
                BitError::ValueOutOfRange { value: 300, bits: 8 },
                "300 does not fit in 8 bits",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn boxes_as_std_error() {
        let boxed: Box<dyn std::error::Error> = Box::new(BitError::EndOfBuffer {
            requested: 1,
            available: 0,
        });
        assert!(boxed.source().is_none());
    }
}
