// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Supported tensor element data types.

use std::fmt;

/// Enumerates the numeric types a [`crate::Tensor`] can hold.
///
/// Kernels check `DType` at configure time; typed access through
/// [`Element`] checks it again on every read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DType {
    /// 8-bit unsigned integer (images).
    U8,
    /// 32-bit signed integer (gradients).
    I32,
    /// 32-bit IEEE 754 floating point.
    F32,
}

impl DType {
    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::U8 => 1,
            DType::I32 | DType::F32 => 4,
        }
    }

    /// Returns a human-readable label for this data type.
    pub fn as_str(self) -> &'static str {
        match self {
            DType::U8 => "u8",
            DType::I32 => "i32",
            DType::F32 => "f32",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Rust type that is the element type of some [`DType`].
pub trait Element: Copy + Default + PartialOrd + fmt::Debug + Send + Sync + 'static {
    const DTYPE: DType;

    /// Decodes one element from exactly `DTYPE.size_bytes()` native-endian bytes.
    fn from_ne_slice(bytes: &[u8]) -> Self;

    /// Encodes into exactly `DTYPE.size_bytes()` bytes.
    fn write_ne_slice(self, out: &mut [u8]);

    /// Converts a border constant into this element type.
    fn from_u8(value: u8) -> Self;
}

macro_rules! impl_element {
    ($ty:ty, $dtype:expr) => {
        impl Element for $ty {
            const DTYPE: DType = $dtype;

            fn from_ne_slice(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                <$ty>::from_ne_bytes(raw)
            }

            fn write_ne_slice(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_ne_bytes());
            }

            fn from_u8(value: u8) -> Self {
                value as $ty
            }
        }
    };
}

impl_element!(u8, DType::U8);
impl_element!(i32, DType::I32);
impl_element!(f32, DType::F32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_dtypes_match_sizes() {
        assert_eq!(u8::DTYPE.size_bytes(), std::mem::size_of::<u8>());
        assert_eq!(i32::DTYPE.size_bytes(), std::mem::size_of::<i32>());
        assert_eq!(f32::DTYPE.size_bytes(), std::mem::size_of::<f32>());
    }

    #[test]
    fn test_element_bytes() {
        let mut buf = [0u8; 4];
        (-7i32).write_ne_slice(&mut buf);
        assert_eq!(i32::from_ne_slice(&buf), -7);
        1.5f32.write_ne_slice(&mut buf);
        assert_eq!(f32::from_ne_slice(&buf), 1.5);
        assert_eq!(f32::from_u8(200), 200.0);
    }
}
