//! Axis-aligned rectangles in frame coordinates.

/// An axis-aligned bounding rectangle in pixel coordinates.
///
/// Coordinates are relative to whatever image the box was produced for;
/// adapters are responsible for rescaling boxes back to original-frame
/// coordinates before anything is cropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl BoundingBox {
    /// Creates a new bounding box.
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area in pixels.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether the box covers no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Rescales the box by `factor` (detector boxes come back in resized
    /// frame coordinates; dividing out the scale maps them to the original
    /// frame).
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let scale = |v: u32| -> u32 { (v as f32 * factor).round().max(0.0) as u32 };
        Self {
            x: scale(self.x),
            y: scale(self.y),
            width: scale(self.width),
            height: scale(self.height),
        }
    }

    /// Expands the box by `margin` of its own size on each side, clamped to
    /// a `bounds_width` x `bounds_height` parent.
    #[must_use]
    pub fn expanded(&self, margin: f32, bounds_width: u32, bounds_height: u32) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mx = (self.width as f32 * margin).round() as u32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let my = (self.height as f32 * margin).round() as u32;

        let x = self.x.saturating_sub(mx);
        let y = self.y.saturating_sub(my);
        let right = (self.x + self.width + mx).min(bounds_width);
        let bottom = (self.y + self.height + my).min(bounds_height);

        Self {
            x,
            y,
            width: right.saturating_sub(x),
            height: bottom.saturating_sub(y),
        }
    }

    /// Builds a box from fractional extents of a `width` x `height` parent.
    ///
    /// Fractions are clamped to `[0, 1]`; an inverted range yields an empty
    /// box rather than a panic.
    #[must_use]
    pub fn from_fractions(
        width: u32,
        height: u32,
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
    ) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let to_px = |frac: f32, extent: u32| -> u32 {
            (frac.clamp(0.0, 1.0) * extent as f32).round() as u32
        };
        let x0 = to_px(left, width);
        let x1 = to_px(right, width);
        let y0 = to_px(top, height);
        let y1 = to_px(bottom, height);

        Self {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }

    /// Clamps the box so it fits within a `width` x `height` parent.
    #[must_use]
    pub fn clamped(&self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self {
            x,
            y,
            width: self.width.min(width.saturating_sub(x)),
            height: self.height.min(height.saturating_sub(y)),
        }
    }
}
