// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Border sizes and border handling modes.

use std::fmt;

/// Elements of padding (or of kernel reach) on each side of a 2-D plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BorderSize {
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
    pub left: usize,
}

impl BorderSize {
    /// The same border on every side.
    pub const fn uniform(size: usize) -> Self {
        Self {
            top: size,
            right: size,
            bottom: size,
            left: size,
        }
    }

    pub const fn new(top: usize, right: usize, bottom: usize, left: usize) -> Self {
        Self { top, right, bottom, left }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Side-wise maximum.
    pub fn max(self, other: BorderSize) -> BorderSize {
        BorderSize {
            top: self.top.max(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
            left: self.left.max(other.left),
        }
    }

    /// Returns `true` if `self` is at least `other` on every side.
    pub fn covers(&self, other: &BorderSize) -> bool {
        self.top >= other.top && self.right >= other.right && self.bottom >= other.bottom && self.left >= other.left
    }
}

impl fmt::Display for BorderSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.top, self.right, self.bottom, self.left)
    }
}

/// How reads outside the valid region are answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderMode {
    /// No border handling: results whose window leaves the image are 0.
    #[default]
    Undefined,
    /// The border is filled with a constant.
    Constant(u8),
    /// The border repeats the nearest edge element.
    Replicate,
}

impl BorderMode {
    /// Whether results near the edge are meaningful under this mode.
    pub fn is_defined(self) -> bool {
        !matches!(self, BorderMode::Undefined)
    }
}

impl fmt::Display for BorderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BorderMode::Undefined => write!(f, "undefined"),
            BorderMode::Constant(v) => write!(f, "constant({v})"),
            BorderMode::Replicate => write!(f, "replicate"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_border_max_and_covers() {
        let a = BorderSize::new(1, 2, 3, 4);
        let b = BorderSize::uniform(2);
        let m = a.max(b);
        assert_eq!(m, BorderSize::new(2, 2, 3, 4));
        assert!(m.covers(&a) && m.covers(&b));
        assert!(!a.covers(&b));
        assert!(BorderSize::default().is_empty());
    }

    #[test]
    fn test_border_mode_display() {
        assert_eq!(BorderMode::Constant(7).to_string(), "constant(7)");
        assert!(!BorderMode::Undefined.is_defined());
        assert!(BorderMode::Replicate.is_defined());
    }
}
