// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stencil state: operations, compare functions, color write masks, and the
//! [`StencilConfig`] that keys configured materials.
//!
//! The stencil buffer is assumed to be 8 bits wide. Each enclosing mask claims
//! one bit, so at most [`MAX_STENCIL_DEPTH`] masks can nest.

/// Number of stencil bits available for nested masks.
pub const MAX_STENCIL_DEPTH: u32 = 8;

/// Bits claimed by a node at `depth` and all of its enclosing masks: `(1 << depth) - 1`.
///
/// A depth of `0` claims nothing. Each additional level adds exactly one bit.
///
/// Depths above [`MAX_STENCIL_DEPTH`] do not fit in the stencil buffer. This is a
/// caller bug; debug builds panic and release builds clamp to all bits.
///
/// ```
/// use understory_inverse_mask::buffer_mask;
/// assert_eq!(buffer_mask(0), 0);
/// assert_eq!(buffer_mask(1), 0b1);
/// assert_eq!(buffer_mask(3), 0b111);
/// assert_eq!(buffer_mask(8), 0xFF);
/// ```
pub fn buffer_mask(depth: u32) -> u8 {
    debug_assert!(
        depth <= MAX_STENCIL_DEPTH,
        "stencil depth {depth} exceeds the {MAX_STENCIL_DEPTH}-bit stencil buffer"
    );
    let depth = depth.min(MAX_STENCIL_DEPTH);
    u8::MAX.checked_shr(MAX_STENCIL_DEPTH - depth).unwrap_or(0)
}

/// What happens to the stored stencil value when the stencil test passes.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum StencilOp {
    /// Leave the stored value unchanged.
    #[default]
    Keep,
    /// Set the stored value to zero.
    Zero,
    /// Replace the stored value with the reference value.
    Replace,
    /// Increment, clamping at the maximum value.
    IncrementSaturate,
    /// Decrement, clamping at zero.
    DecrementSaturate,
    /// Bitwise invert.
    Invert,
    /// Increment, wrapping to zero.
    IncrementWrap,
    /// Decrement, wrapping to the maximum value.
    DecrementWrap,
}

impl StencilOp {
    /// Apply the operation to `stored`, ignoring any write mask.
    pub fn apply(self, stored: u8, reference: u8) -> u8 {
        match self {
            Self::Keep => stored,
            Self::Zero => 0,
            Self::Replace => reference,
            Self::IncrementSaturate => stored.saturating_add(1),
            Self::DecrementSaturate => stored.saturating_sub(1),
            Self::Invert => !stored,
            Self::IncrementWrap => stored.wrapping_add(1),
            Self::DecrementWrap => stored.wrapping_sub(1),
        }
    }
}

/// Comparison between the (masked) reference value and the (masked) stored value.
///
/// The reference value is the left-hand operand: `Less` passes when
/// `reference & read_mask < stored & read_mask`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum CompareFunction {
    /// Never pass.
    Never,
    /// Pass when the reference is less than the stored value.
    Less,
    /// Pass when equal.
    Equal,
    /// Pass when the reference is less than or equal to the stored value.
    LessEqual,
    /// Pass when the reference is greater than the stored value.
    Greater,
    /// Pass when not equal.
    NotEqual,
    /// Pass when the reference is greater than or equal to the stored value.
    GreaterEqual,
    /// Always pass.
    #[default]
    Always,
}

impl CompareFunction {
    /// Evaluate the comparison on already masked operands.
    pub fn test(self, reference: u8, stored: u8) -> bool {
        match self {
            Self::Never => false,
            Self::Less => reference < stored,
            Self::Equal => reference == stored,
            Self::LessEqual => reference <= stored,
            Self::Greater => reference > stored,
            Self::NotEqual => reference != stored,
            Self::GreaterEqual => reference >= stored,
            Self::Always => true,
        }
    }
}

bitflags::bitflags! {
    /// Color channels a material is allowed to write.
    ///
    /// An empty mask disables color output entirely; the draw then only affects
    /// the stencil buffer.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ColorWriteMask: u8 {
        /// Red channel.
        const RED   = 0b0000_0001;
        /// Green channel.
        const GREEN = 0b0000_0010;
        /// Blue channel.
        const BLUE  = 0b0000_0100;
        /// Alpha channel.
        const ALPHA = 0b0000_1000;
        /// All channels.
        const ALL   = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits() | Self::ALPHA.bits();
    }
}

impl Default for ColorWriteMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Complete stencil state of a configured material.
///
/// Two configurations are equal iff every field matches. Together with the base
/// material this forms the key of a [`StencilMaterialCache`](crate::StencilMaterialCache)
/// entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct StencilConfig {
    /// Bits the operation is allowed to modify.
    pub write_mask: u8,
    /// Operation applied to the stored value when the test passes.
    pub op: StencilOp,
    /// Test applied to decide whether the fragment passes.
    pub compare: CompareFunction,
    /// Color channels written by fragments that pass.
    pub color_write_mask: ColorWriteMask,
    /// Bits of both operands considered by the test.
    pub read_mask: u8,
    /// Reference value used by the test and by [`StencilOp::Replace`].
    pub reference: u8,
}

impl Default for StencilConfig {
    /// Stencil disabled: always pass, never write.
    fn default() -> Self {
        Self {
            write_mask: 0,
            op: StencilOp::Keep,
            compare: CompareFunction::Always,
            color_write_mask: ColorWriteMask::ALL,
            read_mask: 0xFF,
            reference: 0,
        }
    }
}

impl StencilConfig {
    /// Whether a fragment over a pixel holding `stored` passes the stencil test.
    pub fn passes(&self, stored: u8) -> bool {
        self.compare
            .test(self.reference & self.read_mask, stored & self.read_mask)
    }

    /// The value left in the stencil buffer after a passing fragment over `stored`.
    ///
    /// Only bits in [`write_mask`](Self::write_mask) change.
    pub fn resolve(&self, stored: u8) -> u8 {
        let written = self.op.apply(stored, self.reference);
        (stored & !self.write_mask) | (written & self.write_mask)
    }

    /// Whether passing fragments produce any color output.
    pub fn writes_color(&self) -> bool {
        !self.color_write_mask.is_empty()
    }
}
