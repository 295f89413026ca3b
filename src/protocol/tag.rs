//! Type tag registry
//!
//! Layout of one wire value:
//! ┌──────────┬──────────────────────────────────────────────┐
//! │ tag (1B) │ payload (fixed width, length-prefixed, or    │
//! │          │ a run of values closed by ListEnd)           │
//! └──────────┴──────────────────────────────────────────────┘
//!
//! All multi-byte integers on the wire are big-endian.

/// First raw code of the application-defined type range.
pub const CUSTOM_CODE_MIN: u8 = 50;
/// Last raw code of the application-defined type range.
pub const CUSTOM_CODE_MAX: u8 = 200;

/// Wire type of a TypedBytes value
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// Length-prefixed raw bytes (also every custom code 50..=200)
    ByteSequence = 0,
    /// One signed byte
    Byte = 1,
    /// One byte, 0 or 1
    Boolean = 2,
    /// 32-bit signed integer
    Integer = 3,
    /// 64-bit signed integer
    Long = 4,
    /// IEEE-754 single
    Float = 5,
    /// IEEE-754 double
    Double = 6,
    /// Length-prefixed raw bytes, not NUL terminated
    String = 7,
    /// Count-prefixed sequence of values
    Vector = 8,
    /// Values closed by [`TypeTag::ListEnd`]
    List = 9,
    /// Count-prefixed sequence of key/value pairs
    Map = 10,
    /// Sentinel for end of stream or an unmapped code; never written
    TypeError = 254,
    /// List terminator
    ListEnd = 255,
}

impl TypeTag {
    /// Classify a raw code. Custom codes collapse to `ByteSequence`,
    /// anything unmapped becomes `TypeError`.
    #[inline(always)]
    pub fn from_u8(code: u8) -> Self {
        match code {
            0 => Self::ByteSequence,
            1 => Self::Byte,
            2 => Self::Boolean,
            3 => Self::Integer,
            4 => Self::Long,
            5 => Self::Float,
            6 => Self::Double,
            7 => Self::String,
            8 => Self::Vector,
            9 => Self::List,
            10 => Self::Map,
            255 => Self::ListEnd,
            c if is_custom_code(c) => Self::ByteSequence,
            _ => Self::TypeError,
        }
    }

    /// Raw code written for this tag.
    #[inline(always)]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Payload width of fixed-size kinds.
    #[inline(always)]
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            Self::Byte | Self::Boolean => Some(1),
            Self::Integer | Self::Float => Some(4),
            Self::Long | Self::Double => Some(8),
            _ => None,
        }
    }

    /// Tags whose payload can be widened to `f64`.
    #[inline(always)]
    pub fn can_be_double(self) -> bool {
        matches!(
            self,
            Self::Byte | Self::Boolean | Self::Integer | Self::Long | Self::Float | Self::Double
        )
    }

    /// String and ByteSequence carry a byte-length prefix.
    #[inline(always)]
    pub fn is_bytes(self) -> bool {
        matches!(self, Self::String | Self::ByteSequence)
    }
}

/// Whether `code` lies in the reserved application range.
#[inline(always)]
pub fn is_custom_code(code: u8) -> bool {
    (CUSTOM_CODE_MIN..=CUSTOM_CODE_MAX).contains(&code)
}
