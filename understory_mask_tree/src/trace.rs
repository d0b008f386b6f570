// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software stencil evaluation of a draw list at a single point.

use alloc::vec::Vec;

use kurbo::Point;

use crate::render::{DrawCommand, DrawPass};
use crate::types::NodeId;

/// Replay of a draw list over one pixel.
///
/// Useful for checking compositing without a GPU: which graphics would have
/// produced color at a point, and what the stencil buffer holds at the end.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StencilTrace {
    /// Final stencil value.
    pub stencil: u8,
    /// Nodes whose graphic wrote color, in draw order.
    pub painted: Vec<NodeId>,
}

impl StencilTrace {
    /// Replay `commands` at a world-space point, starting from a cleared stencil.
    ///
    /// Draws that miss the point are skipped; a failing stencil test keeps the
    /// stored value.
    pub fn at(commands: &[DrawCommand], world_point: Point) -> Self {
        let mut trace = Self::default();
        for command in commands.iter().filter(|c| c.covers(world_point)) {
            let stencil = command.material.effective_stencil();
            if !stencil.passes(trace.stencil) {
                continue;
            }
            trace.stencil = stencil.resolve(trace.stencil);
            if command.pass == DrawPass::Graphic && stencil.writes_color() {
                trace.painted.push(command.node);
            }
        }
        trace
    }

    /// Whether `node`'s graphic produced color.
    pub fn painted(&self, node: NodeId) -> bool {
        self.painted.contains(&node)
    }

    /// The last node to produce color, which ends up on top.
    pub fn top(&self) -> Option<NodeId> {
        self.painted.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TreeMaterial;
    use kurbo::{Affine, Rect};
    use understory_inverse_mask::{CompareFunction, StencilConfig, StencilOp};

    fn draw(node: u32, pass: DrawPass, stencil: Option<StencilConfig>) -> DrawCommand {
        DrawCommand {
            node: NodeId::new(node, 1),
            pass,
            material: TreeMaterial {
                shader: "ui",
                stencil,
            },
            transform: Affine::IDENTITY,
            shape: Rect::new(0.0, 0.0, 10.0, 10.0),
        }
    }

    #[test]
    fn failing_test_keeps_stencil_and_color() {
        let write_two = StencilConfig {
            write_mask: 0xFF,
            op: StencilOp::Replace,
            reference: 2,
            ..StencilConfig::default()
        };
        let needs_one = StencilConfig {
            compare: CompareFunction::Equal,
            reference: 1,
            ..StencilConfig::default()
        };
        let draws = [
            draw(0, DrawPass::Graphic, Some(write_two)),
            draw(1, DrawPass::Graphic, Some(needs_one)),
            draw(2, DrawPass::Graphic, None),
        ];
        let trace = StencilTrace::at(&draws, Point::new(5.0, 5.0));
        assert_eq!(trace.stencil, 2);
        assert_eq!(trace.painted, [NodeId::new(0, 1), NodeId::new(2, 1)]);
        assert_eq!(trace.top(), Some(NodeId::new(2, 1)));

        let miss = StencilTrace::at(&draws, Point::new(50.0, 5.0));
        assert_eq!(miss, StencilTrace::default());
    }

    #[test]
    fn pop_passes_never_paint() {
        let draws = [draw(0, DrawPass::Pop, None)];
        let trace = StencilTrace::at(&draws, Point::new(1.0, 1.0));
        assert!(trace.painted.is_empty());
    }
}
