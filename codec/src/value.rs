//! Field values and the Rust types that map onto them.

use std::fmt;

use schema::FieldCodec;

/// An entity reference.
///
/// Zero means "no entity". On the wire only the non-zero bytes are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Guid(u64);

impl Guid {
    /// The empty reference.
    pub const EMPTY: Self = Self(0);

    /// Creates a guid from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw guid value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is the empty reference.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Guid {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

/// A field value in dynamic form.
///
/// Equality is bitwise for floats, so `NaN == NaN` when the payloads match
/// and `0.0 != -0.0`. Writes compare with this equality to decide whether
/// a field becomes dirty.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Bool(bool),
    UInt(u64),
    SInt(i64),
    F32(f32),
    Guid(Guid),
    Str(String),
}

impl FieldValue {
    /// The neutral value for a codec: zero, false, empty reference, empty string.
    #[must_use]
    pub fn neutral(codec: FieldCodec) -> Self {
        match codec {
            FieldCodec::Bool => Self::Bool(false),
            FieldCodec::UInt { .. } => Self::UInt(0),
            FieldCodec::SInt { .. } => Self::SInt(0),
            FieldCodec::F32 => Self::F32(0.0),
            FieldCodec::Guid => Self::Guid(Guid::EMPTY),
            FieldCodec::Str => Self::Str(String::new()),
        }
    }

    /// Returns `true` if the value's variant is the one `codec` stores.
    #[must_use]
    pub const fn matches_codec(&self, codec: FieldCodec) -> bool {
        matches!(
            (self, codec),
            (Self::Bool(_), FieldCodec::Bool)
                | (Self::UInt(_), FieldCodec::UInt { .. })
                | (Self::SInt(_), FieldCodec::SInt { .. })
                | (Self::F32(_), FieldCodec::F32)
                | (Self::Guid(_), FieldCodec::Guid)
                | (Self::Str(_), FieldCodec::Str)
        )
    }

    /// Short name of the variant, used in diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::UInt(_) => "uint",
            Self::SInt(_) => "sint",
            Self::F32(_) => "f32",
            Self::Guid(_) => "guid",
            Self::Str(_) => "str",
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::UInt(a), Self::UInt(b)) => a == b,
            (Self::SInt(a), Self::SInt(b)) => a == b,
            (Self::F32(a), Self::F32(b)) => a.to_bits() == b.to_bits(),
            (Self::Guid(a), Self::Guid(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

/// A Rust type that can be stored in a tracked field.
pub trait FieldType: Sized {
    /// Type name, used in diagnostics.
    const NAME: &'static str;

    /// Returns `true` if every value `codec` can carry converts back into
    /// this type.
    fn accepts(codec: FieldCodec) -> bool;

    /// Converts into the dynamic form.
    fn into_value(self) -> FieldValue;

    /// Converts back from the dynamic form.
    fn from_value(value: &FieldValue) -> Option<Self>;
}

impl FieldType for bool {
    const NAME: &'static str = "bool";

    fn accepts(codec: FieldCodec) -> bool {
        matches!(codec, FieldCodec::Bool)
    }

    fn into_value(self) -> FieldValue {
        FieldValue::Bool(self)
    }

    fn from_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

macro_rules! impl_unsigned_field {
    ($($ty:ty),*) => {
        $(
            impl FieldType for $ty {
                const NAME: &'static str = stringify!($ty);

                fn accepts(codec: FieldCodec) -> bool {
                    matches!(codec, FieldCodec::UInt { bits } if u32::from(bits) <= <$ty>::BITS)
                }

                fn into_value(self) -> FieldValue {
                    FieldValue::UInt(u64::from(self))
                }

                fn from_value(value: &FieldValue) -> Option<Self> {
                    match value {
                        FieldValue::UInt(v) => <$ty>::try_from(*v).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

macro_rules! impl_signed_field {
    ($($ty:ty),*) => {
        $(
            impl FieldType for $ty {
                const NAME: &'static str = stringify!($ty);

                fn accepts(codec: FieldCodec) -> bool {
                    matches!(codec, FieldCodec::SInt { bits } if u32::from(bits) <= <$ty>::BITS)
                }

                fn into_value(self) -> FieldValue {
                    FieldValue::SInt(i64::from(self))
                }

                fn from_value(value: &FieldValue) -> Option<Self> {
                    match value {
                        FieldValue::SInt(v) => <$ty>::try_from(*v).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_unsigned_field!(u8, u16, u32, u64);
impl_signed_field!(i8, i16, i32, i64);

impl FieldType for f32 {
    const NAME: &'static str = "f32";

    fn accepts(codec: FieldCodec) -> bool {
        matches!(codec, FieldCodec::F32)
    }

    fn into_value(self) -> FieldValue {
        FieldValue::F32(self)
    }

    fn from_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::F32(v) => Some(*v),
            _ => None,
        }
    }
}

impl FieldType for Guid {
    const NAME: &'static str = "Guid";

    fn accepts(codec: FieldCodec) -> bool {
        matches!(codec, FieldCodec::Guid)
    }

    fn into_value(self) -> FieldValue {
        FieldValue::Guid(self)
    }

    fn from_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Guid(v) => Some(*v),
            _ => None,
        }
    }
}

impl FieldType for String {
    const NAME: &'static str = "String";

    fn accepts(codec: FieldCodec) -> bool {
        matches!(codec, FieldCodec::Str)
    }

    fn into_value(self) -> FieldValue {
        FieldValue::Str(self)
    }

    fn from_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Str(v) => Some(v.clone()),
            _ => None,
        }
    }
}
