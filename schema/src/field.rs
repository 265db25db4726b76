//! Field codec, shape, and visibility definitions.

use crate::BitIndex;

/// The encoding for a field (representation only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FieldCodec {
    /// Boolean (1 bit).
    Bool,

    /// Unsigned integer with fixed bit width.
    #[cfg_attr(feature = "serde", serde(rename = "uint"))]
    UInt { bits: u8 },

    /// Signed integer with fixed bit width (two's complement, truncated).
    #[cfg_attr(feature = "serde", serde(rename = "sint"))]
    SInt { bits: u8 },

    /// IEEE-754 single precision float (32 bits).
    F32,

    /// Entity reference, packed as a presence byte plus its non-zero bytes.
    Guid,

    /// Length-prefixed UTF-8 identifier (at most 255 bytes).
    Str,
}

impl FieldCodec {
    /// Creates a boolean field codec.
    #[must_use]
    pub const fn bool() -> Self {
        Self::Bool
    }

    /// Creates an unsigned integer field codec.
    #[must_use]
    pub const fn uint(bits: u8) -> Self {
        Self::UInt { bits }
    }

    /// Creates a signed integer field codec.
    #[must_use]
    pub const fn sint(bits: u8) -> Self {
        Self::SInt { bits }
    }

    /// Creates a float field codec.
    #[must_use]
    pub const fn f32() -> Self {
        Self::F32
    }

    /// Creates a packed entity reference codec.
    #[must_use]
    pub const fn guid() -> Self {
        Self::Guid
    }

    /// Creates a length-prefixed string codec.
    #[must_use]
    pub const fn string() -> Self {
        Self::Str
    }

    /// Short human-readable name, used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::UInt { .. } => "uint",
            Self::SInt { .. } => "sint",
            Self::F32 => "f32",
            Self::Guid => "guid",
            Self::Str => "str",
        }
    }
}

/// Whether a field is a single value or an indexed array of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FieldShape {
    /// One value at the field's bit.
    #[default]
    Scalar,

    /// `len` values at bits `bit + 1 ..= bit + len`; `bit` itself is the
    /// array's any-element-dirty bit and carries no value.
    Array {
        len: u16,
        /// Optional scalar `UInt` field holding the array's logical size.
        size_bit: Option<BitIndex>,
    },
}

/// Visibility flags.
///
/// On a field, the set of recipient relationships allowed to see it (empty
/// means public). On a recipient, the relationships it holds with the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct VisibilityFlags(u8);

impl VisibilityFlags {
    /// No relationship; on a field this means "visible to everyone".
    pub const NONE: Self = Self(0);

    /// The recipient owns the entity.
    pub const OWNER: Self = Self(1 << 0);

    /// The recipient is grouped with the entity's owner.
    pub const PARTY_MEMBER: Self = Self(1 << 1);

    /// The recipient has a special insight into the entity.
    pub const EMPATH: Self = Self(1 << 2);

    /// Every flag this version understands.
    pub const KNOWN: Self = Self(0b111);

    /// Number of distinct known flag combinations.
    pub const CLASS_COUNT: usize = 1 << 3;

    /// Creates flags from a raw value. Unknown bits are preserved.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// Returns the raw flag bits.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Returns `true` if no flag is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every flag in `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if `self` and `other` share at least one flag.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns the union of both flag sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns only the bits this version understands.
    #[must_use]
    pub const fn known(self) -> Self {
        Self(self.0 & Self::KNOWN.0)
    }

    /// Returns the bits this version does not understand.
    #[must_use]
    pub const fn unknown_bits(self) -> u8 {
        self.0 & !Self::KNOWN.0
    }
}

impl std::ops::BitOr for VisibilityFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Field definition within a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldDef {
    pub bit: BitIndex,
    pub codec: FieldCodec,
    #[cfg_attr(feature = "serde", serde(default))]
    pub shape: FieldShape,
    #[cfg_attr(feature = "serde", serde(default))]
    pub visibility: VisibilityFlags,
}

impl FieldDef {
    /// Creates a public scalar field.
    #[must_use]
    pub const fn new(bit: BitIndex, codec: FieldCodec) -> Self {
        Self {
            bit,
            codec,
            shape: FieldShape::Scalar,
            visibility: VisibilityFlags::NONE,
        }
    }

    /// Creates a public array field of `len` elements.
    #[must_use]
    pub const fn array(bit: BitIndex, len: u16, codec: FieldCodec) -> Self {
        Self {
            bit,
            codec,
            shape: FieldShape::Array {
                len,
                size_bit: None,
            },
            visibility: VisibilityFlags::NONE,
        }
    }

    /// Restricts the field to recipients holding any of `visibility`.
    #[must_use]
    pub const fn visibility(mut self, visibility: VisibilityFlags) -> Self {
        self.visibility = visibility;
        self
    }

    /// Links an array to the scalar field holding its logical size.
    ///
    /// Has no effect on scalar fields.
    #[must_use]
    pub const fn sized_by(mut self, size_bit: BitIndex) -> Self {
        if let FieldShape::Array { len, .. } = self.shape {
            self.shape = FieldShape::Array {
                len,
                size_bit: Some(size_bit),
            };
        }
        self
    }

    /// Number of mask bits the field occupies.
    #[must_use]
    pub const fn bits_used(&self) -> usize {
        match self.shape {
            FieldShape::Scalar => 1,
            FieldShape::Array { len, .. } => 1 + len as usize,
        }
    }
}
