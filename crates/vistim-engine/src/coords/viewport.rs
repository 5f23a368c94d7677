/// Drawable area in logical pixels.
///
/// Shaders convert logical positions to NDC against this size.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Logical viewport of a surface of `width`×`height` physical pixels.
    pub fn from_physical(width: u32, height: u32, scale_factor: f64) -> Self {
        let scale = if scale_factor > 0.0 { scale_factor } else { 1.0 };
        Self::new((width as f64 / scale) as f32, (height as f64 / scale) as f32)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    #[inline]
    pub fn bounds(self) -> super::Rect {
        super::Rect::new(0.0, 0.0, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_size_divides_by_scale() {
        let vp = Viewport::from_physical(1600, 1200, 2.0);
        assert_eq!(vp, Viewport::new(800.0, 600.0));
        assert!(vp.is_valid());
    }

    #[test]
    fn zero_scale_is_treated_as_one() {
        assert_eq!(Viewport::from_physical(10, 20, 0.0), Viewport::new(10.0, 20.0));
    }

    #[test]
    fn minimized_surface_is_invalid() {
        assert!(!Viewport::from_physical(0, 0, 1.0).is_valid());
    }
}
