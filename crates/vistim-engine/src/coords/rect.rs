use super::Vec2;

/// Axis-aligned rectangle, `origin` at its top-left corner.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { origin: Vec2::new(x, y), size: Vec2::new(w, h) }
    }

    /// Full texture in unit coordinates.
    pub const UNIT: Rect = Rect::new(0.0, 0.0, 1.0, 1.0);

    #[inline]
    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self { origin: min, size: max - min }
    }

    /// Rectangle of `size` centered on `center`.
    #[inline]
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        Self { origin: center - size * 0.5, size }
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        self.origin + self.size
    }

    #[inline]
    pub fn center(self) -> Vec2 {
        self.origin + self.size * 0.5
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.origin.is_finite() && self.size.is_finite()
    }

    pub fn translate(self, by: Vec2) -> Rect {
        Rect { origin: self.origin + by, size: self.size }
    }

    /// Largest rectangle with the aspect ratio of `content` that fits inside
    /// `self`, centered. Used to letterbox images and video frames.
    pub fn fit(self, content: Vec2) -> Rect {
        if self.is_empty() || content.x <= 0.0 || content.y <= 0.0 {
            return Rect { origin: self.center(), size: Vec2::zero() };
        }
        let scale = (self.size.x / content.x).min(self.size.y / content.y);
        Rect::centered(self.center(), content * scale)
    }

    /// Maps a sub-rectangle given in texels to unit texture coordinates.
    pub fn to_unit(self, texture: Vec2) -> Rect {
        if texture.x <= 0.0 || texture.y <= 0.0 {
            return Rect::UNIT;
        }
        let inv = Vec2::new(1.0 / texture.x, 1.0 / texture.y);
        Rect { origin: self.origin.scale(inv), size: self.size.scale(inv) }
    }

    pub fn intersect(self, other: Rect) -> Option<Rect> {
        let min = Vec2::new(self.origin.x.max(other.origin.x), self.origin.y.max(other.origin.y));
        let (a, b) = (self.max(), other.max());
        let max = Vec2::new(a.x.min(b.x), a.y.min(b.y));
        let r = Rect::from_min_max(min, max);
        (!r.is_empty()).then_some(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── fit ───────────────────────────────────────────────────────────────

    #[test]
    fn fit_letterboxes_wide_content() {
        let frame = Rect::new(0.0, 0.0, 400.0, 400.0);
        let r = frame.fit(Vec2::new(320.0, 240.0));
        assert_eq!(r.size, Vec2::new(400.0, 300.0));
        assert_eq!(r.origin, Vec2::new(0.0, 50.0));
    }

    #[test]
    fn fit_pillarboxes_tall_content() {
        let frame = Rect::new(10.0, 10.0, 200.0, 100.0);
        let r = frame.fit(Vec2::new(50.0, 100.0));
        assert_eq!(r.size, Vec2::new(50.0, 100.0));
        assert_eq!(r.center(), frame.center());
    }

    #[test]
    fn fit_degenerate_content_is_empty() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0).fit(Vec2::zero());
        assert!(r.is_empty());
    }

    // ── to_unit ───────────────────────────────────────────────────────────

    #[test]
    fn to_unit_scales_by_texture_size() {
        let r = Rect::new(64.0, 0.0, 64.0, 128.0).to_unit(Vec2::new(256.0, 256.0));
        assert_eq!(r, Rect::new(0.25, 0.0, 0.25, 0.5));
    }

    #[test]
    fn to_unit_of_empty_texture_is_full_range() {
        assert_eq!(Rect::new(1.0, 1.0, 1.0, 1.0).to_unit(Vec2::zero()), Rect::UNIT);
    }

    // ── intersect ─────────────────────────────────────────────────────────

    #[test]
    fn intersect_overlapping() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.intersect(b), Some(Rect::new(5.0, 5.0, 5.0, 5.0)));
    }

    #[test]
    fn intersect_touching_edge_is_none() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(a.intersect(b).is_none());
    }
}
