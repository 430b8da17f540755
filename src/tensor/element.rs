//! Rust scalar types that can be read from and written to buffers.

use super::DType;
use crate::error::{Error, Result};
use half::{bf16, f16};

mod sealed {
    pub trait Sealed {}
}

/// A Rust type whose values are stored as [`Element::DTYPE`].
///
/// Implemented for `f32`, `f64`, [`half::f16`], [`half::bf16`], the fixed-width
/// integers and `bool`. Sealed: the byte reinterpretation rules live here.
pub trait Element:
    Copy + PartialEq + std::fmt::Debug + Send + Sync + 'static + sealed::Sealed
{
    /// The dtype matching this Rust type.
    const DTYPE: DType;

    /// Reinterpret raw bytes as elements.
    fn from_bytes(bytes: &[u8]) -> Result<&[Self]>;

    /// Reinterpret raw bytes as mutable elements.
    fn from_bytes_mut(bytes: &mut [u8]) -> Result<&mut [Self]>;

    /// View elements as raw bytes.
    fn to_bytes(values: &[Self]) -> &[u8];

    /// Copy elements out of bytes with no alignment requirement.
    fn read_vec(bytes: &[u8]) -> Result<Vec<Self>>;
}

fn check_len<T: Element>(bytes: &[u8]) -> Result<()> {
    let width = T::DTYPE.size_in_bytes();
    if bytes.len() % width != 0 {
        return Err(Error::InvalidBytes(format!(
            "{} bytes is not a whole number of {} elements",
            bytes.len(),
            T::DTYPE
        )));
    }
    Ok(())
}

fn cast_error<T: Element>(err: bytemuck::PodCastError) -> Error {
    Error::InvalidBytes(format!("cannot view bytes as {}: {err:?}", T::DTYPE))
}

macro_rules! impl_pod_element {
    ($($ty:ty => $dtype:expr),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Element for $ty {
                const DTYPE: DType = $dtype;

                fn from_bytes(bytes: &[u8]) -> Result<&[Self]> {
                    if bytes.is_empty() {
                        return Ok(&[]);
                    }
                    bytemuck::try_cast_slice(bytes).map_err(cast_error::<Self>)
                }

                fn from_bytes_mut(bytes: &mut [u8]) -> Result<&mut [Self]> {
                    if bytes.is_empty() {
                        return Ok(&mut []);
                    }
                    bytemuck::try_cast_slice_mut(bytes).map_err(cast_error::<Self>)
                }

                fn to_bytes(values: &[Self]) -> &[u8] {
                    bytemuck::cast_slice(values)
                }

                fn read_vec(bytes: &[u8]) -> Result<Vec<Self>> {
                    check_len::<Self>(bytes)?;
                    Ok(bytemuck::pod_collect_to_vec(bytes))
                }
            }
        )*
    };
}

impl_pod_element! {
    f16 => DType::F16,
    bf16 => DType::BF16,
    f32 => DType::F32,
    f64 => DType::F64,
    i8 => DType::I8,
    i16 => DType::I16,
    i32 => DType::I32,
    i64 => DType::I64,
    u8 => DType::U8,
    u16 => DType::U16,
    u32 => DType::U32,
    u64 => DType::U64,
}

fn check_bool_bytes(bytes: &[u8]) -> Result<()> {
    match bytes.iter().position(|&b| b > 1) {
        Some(index) => Err(Error::InvalidBytes(format!(
            "byte {index} holds {} which is not a valid bool",
            bytes[index]
        ))),
        None => Ok(()),
    }
}

impl sealed::Sealed for bool {}

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    fn from_bytes(bytes: &[u8]) -> Result<&[Self]> {
        check_bool_bytes(bytes)?;
        // SAFETY: bool has size and alignment 1 and every byte is 0 or 1.
        Ok(unsafe { std::slice::from_raw_parts(bytes.as_ptr().cast::<bool>(), bytes.len()) })
    }

    fn from_bytes_mut(bytes: &mut [u8]) -> Result<&mut [Self]> {
        check_bool_bytes(bytes)?;
        // SAFETY: as above; writes through `&mut bool` keep every byte 0 or 1.
        Ok(unsafe {
            std::slice::from_raw_parts_mut(bytes.as_mut_ptr().cast::<bool>(), bytes.len())
        })
    }

    fn to_bytes(values: &[Self]) -> &[u8] {
        // SAFETY: every bool is a valid u8.
        unsafe { std::slice::from_raw_parts(values.as_ptr().cast::<u8>(), values.len()) }
    }

    fn read_vec(bytes: &[u8]) -> Result<Vec<Self>> {
        check_bool_bytes(bytes)?;
        Ok(bytes.iter().map(|&b| b == 1).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_mapping() {
        assert_eq!(<f32 as Element>::DTYPE, DType::F32);
        assert_eq!(<f16 as Element>::DTYPE, DType::F16);
        assert_eq!(<bool as Element>::DTYPE, DType::Bool);
        assert_eq!(<u64 as Element>::DTYPE, DType::U64);
    }

    #[test]
    fn test_pod_bytes() {
        let values = [1.0f32, 2.5];
        let bytes = f32::to_bytes(&values);
        assert_eq!(bytes.len(), 8);
        assert_eq!(f32::from_bytes(bytes).unwrap(), &values);
    }

    #[test]
    fn test_empty_bytes() {
        assert!(f64::from_bytes(&[]).unwrap().is_empty());
        assert!(bool::from_bytes(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_length_fails() {
        assert!(f32::from_bytes(&[0u8; 3]).is_err());
    }

    #[test]
    fn test_read_vec_unaligned() {
        let bytes = [0u8, 0, 0, 128, 63];
        assert_eq!(f32::read_vec(&bytes[1..]).unwrap(), vec![1.0f32]);
        assert!(f32::read_vec(&bytes[..3]).is_err());
        assert_eq!(bool::read_vec(&[1, 0]).unwrap(), vec![true, false]);
    }

    #[test]
    fn test_bool_validation() {
        assert_eq!(bool::from_bytes(&[0, 1, 1]).unwrap(), &[false, true, true]);
        assert!(bool::from_bytes(&[0, 2]).is_err());

        let mut bytes = [0u8, 1];
        bool::from_bytes_mut(&mut bytes).unwrap()[0] = true;
        assert_eq!(bytes, [1, 1]);
        assert_eq!(bool::to_bytes(&[true, false]), &[1, 0]);
    }
}
