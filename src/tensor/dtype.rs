//! Element data types.

use std::fmt;

/// Scalar element type of a buffer.
///
/// Complex types are listed so callers can name them, but every constructor
/// rejects them.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[rkyv(derive(Debug))]
#[repr(u8)]
pub enum DType {
    /// IEEE-754 half precision.
    F16 = 0,
    /// bfloat16.
    BF16 = 1,
    /// IEEE-754 single precision.
    F32 = 2,
    /// IEEE-754 double precision.
    F64 = 3,
    /// Signed 8-bit integer.
    I8 = 4,
    /// Signed 16-bit integer.
    I16 = 5,
    /// Signed 32-bit integer.
    I32 = 6,
    /// Signed 64-bit integer.
    I64 = 7,
    /// Unsigned 8-bit integer.
    U8 = 8,
    /// Unsigned 16-bit integer.
    U16 = 9,
    /// Unsigned 32-bit integer.
    U32 = 10,
    /// Unsigned 64-bit integer.
    U64 = 11,
    /// Boolean stored as one byte, 0 or 1.
    Bool = 12,
    /// Complex number of two f32 (not supported for storage).
    Complex64 = 13,
    /// Complex number of two f64 (not supported for storage).
    Complex128 = 14,
}

impl DType {
    /// Every dtype, in tag order.
    pub const ALL: [DType; 15] = [
        DType::F16,
        DType::BF16,
        DType::F32,
        DType::F64,
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::U8,
        DType::U16,
        DType::U32,
        DType::U64,
        DType::Bool,
        DType::Complex64,
        DType::Complex128,
    ];

    /// Width of one element in bits.
    pub fn bits(self) -> usize {
        match self {
            DType::Bool | DType::I8 | DType::U8 => 8,
            DType::F16 | DType::BF16 | DType::I16 | DType::U16 => 16,
            DType::F32 | DType::I32 | DType::U32 => 32,
            DType::F64 | DType::I64 | DType::U64 | DType::Complex64 => 64,
            DType::Complex128 => 128,
        }
    }

    /// Number of bytes required per element.
    pub fn size_in_bytes(self) -> usize {
        self.bits() / 8
    }

    /// Returns `true` for F16, BF16, F32 and F64.
    pub fn is_floating_point(self) -> bool {
        matches!(self, DType::F16 | DType::BF16 | DType::F32 | DType::F64)
    }

    /// Returns `true` for signed and unsigned integers (not Bool).
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            DType::I8
                | DType::I16
                | DType::I32
                | DType::I64
                | DType::U8
                | DType::U16
                | DType::U32
                | DType::U64
        )
    }

    /// Returns `true` for types that can represent negative values.
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            DType::I8 | DType::I16 | DType::I32 | DType::I64
        ) || self.is_floating_point()
            || self.is_complex()
    }

    /// Returns `true` for complex-valued types.
    pub fn is_complex(self) -> bool {
        matches!(self, DType::Complex64 | DType::Complex128)
    }

    /// Whether buffers of this type can be created.
    pub fn is_supported(self) -> bool {
        !self.is_complex()
    }

    /// Native-endian bytes of the value one in this type.
    ///
    /// For complex types this is `1 + 0i`.
    pub fn one_bytes(self) -> Vec<u8> {
        match self {
            DType::F16 => half::f16::ONE.to_ne_bytes().to_vec(),
            DType::BF16 => half::bf16::ONE.to_ne_bytes().to_vec(),
            DType::F32 => 1f32.to_ne_bytes().to_vec(),
            DType::F64 => 1f64.to_ne_bytes().to_vec(),
            DType::I8 => 1i8.to_ne_bytes().to_vec(),
            DType::I16 => 1i16.to_ne_bytes().to_vec(),
            DType::I32 => 1i32.to_ne_bytes().to_vec(),
            DType::I64 => 1i64.to_ne_bytes().to_vec(),
            DType::U8 | DType::Bool => vec![1],
            DType::U16 => 1u16.to_ne_bytes().to_vec(),
            DType::U32 => 1u32.to_ne_bytes().to_vec(),
            DType::U64 => 1u64.to_ne_bytes().to_vec(),
            DType::Complex64 => [1f32.to_ne_bytes(), 0f32.to_ne_bytes()].concat(),
            DType::Complex128 => [1f64.to_ne_bytes(), 0f64.to_ne_bytes()].concat(),
        }
    }

    /// Stable tag used when a dtype crosses a process boundary.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Inverse of [`tag`](Self::tag).
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    /// Lower-case name, e.g. `"float32"`.
    pub fn name(self) -> &'static str {
        match self {
            DType::F16 => "float16",
            DType::BF16 => "bfloat16",
            DType::F32 => "float32",
            DType::F64 => "float64",
            DType::I8 => "int8",
            DType::I16 => "int16",
            DType::I32 => "int32",
            DType::I64 => "int64",
            DType::U8 => "uint8",
            DType::U16 => "uint16",
            DType::U32 => "uint32",
            DType::U64 => "uint64",
            DType::Bool => "bool",
            DType::Complex64 => "complex64",
            DType::Complex128 => "complex128",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
