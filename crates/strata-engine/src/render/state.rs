/// How fragments combine with the framebuffer.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum BlendMode {
    /// Draw behind existing content: `src * (1 - dst_alpha) + dst`.
    ///
    /// Layers are painted top-down, so this is the default.
    #[default]
    Back,
    /// Draw over existing content: `src + dst * (1 - src_alpha)`.
    Front,
}

impl BlendMode {
    pub(crate) fn to_wgpu(self) -> wgpu::BlendState {
        let component = match self {
            Self::Back => wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::OneMinusDstAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            Self::Front => wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
        };
        wgpu::BlendState {
            color: component,
            alpha: component,
        }
    }
}

/// Stencil configuration baked into a pipeline.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StencilMode {
    /// Stencil ignored.
    Disabled,
    /// Pass where `stencil & 0x80 == reference & 0x80`.
    Test,
    /// Unconditionally replace the stencil with the reference (clip masks).
    Write,
}

impl StencilMode {
    /// Bit marking the drawable region of the current tile.
    pub const CLIP_BIT: u32 = 0x80;

    pub(crate) fn to_wgpu(self) -> wgpu::StencilState {
        let (compare, pass_op, read_mask, write_mask) = match self {
            Self::Disabled => (wgpu::CompareFunction::Always, wgpu::StencilOperation::Keep, 0, 0),
            Self::Test => (
                wgpu::CompareFunction::Equal,
                wgpu::StencilOperation::Keep,
                Self::CLIP_BIT,
                0,
            ),
            Self::Write => (
                wgpu::CompareFunction::Always,
                wgpu::StencilOperation::Replace,
                0xFF,
                0xFF,
            ),
        };
        let face = wgpu::StencilFaceState {
            compare,
            fail_op: wgpu::StencilOperation::Keep,
            depth_fail_op: wgpu::StencilOperation::Keep,
            pass_op,
        };
        wgpu::StencilState {
            front: face,
            back: face,
            read_mask,
            write_mask,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Primitive {
    TriangleList,
    TriangleStrip,
    PointList,
}

impl Primitive {
    pub(crate) fn to_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            Self::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            Self::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
            Self::PointList => wgpu::PrimitiveTopology::PointList,
        }
    }
}

/// Pixel rectangle of the framebuffer that draws map to.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub const fn square(size: u32) -> Self {
        Self::new(0, 0, size, size)
    }

    /// Intersection with a `width` x `height` attachment, `None` if empty.
    pub fn clamp_to(self, width: u32, height: u32) -> Option<Self> {
        let x0 = self.x.min(width);
        let y0 = self.y.min(height);
        let x1 = self.x.saturating_add(self.width).min(width);
        let y1 = self.y.saturating_add(self.height).min(height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self::new(x0, y0, x1 - x0, y1 - y0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_clamps_to_attachment() {
        let v = Viewport::new(0, 0, 1600, 1200);
        assert_eq!(v.clamp_to(544, 544), Some(Viewport::square(544)));
        assert_eq!(Viewport::new(600, 0, 10, 10).clamp_to(544, 544), None);
    }

    #[test]
    fn test_mode_reads_only_the_clip_bit() {
        let s = StencilMode::Test.to_wgpu();
        assert_eq!(s.read_mask, 0x80);
        assert_eq!(s.write_mask, 0);
        let s = StencilMode::Write.to_wgpu();
        assert_eq!(s.front.pass_op, wgpu::StencilOperation::Replace);
    }
}
