/// RGBA color with premultiplied alpha.
///
/// `r`, `g` and `b` are already multiplied by `a`. The surface blends with
/// `One, OneMinusSrcAlpha`, so colors must stay in this form all the way to
/// the shader.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color::from_premul(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn from_premul(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color; premultiplied and straight forms coincide.
    #[inline]
    pub const fn opaque(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Converts straight-alpha components, clamping each to `[0, 1]`.
    pub fn from_straight(r: f32, g: f32, b: f32, a: f32) -> Self {
        let a = a.clamp(0.0, 1.0);
        Self {
            r: r.clamp(0.0, 1.0) * a,
            g: g.clamp(0.0, 1.0) * a,
            b: b.clamp(0.0, 1.0) * a,
            a,
        }
    }

    #[inline]
    pub fn from_rgba_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::from_straight(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0)
    }

    /// Straight-alpha components; fully transparent colors return zeros.
    pub fn to_straight(self) -> [f32; 4] {
        if self.a <= 0.0 {
            return [0.0; 4];
        }
        let inv = 1.0 / self.a;
        [self.r * inv, self.g * inv, self.b * inv, self.a]
    }

    /// Same hue with a new opacity.
    pub fn with_alpha(self, a: f32) -> Self {
        let [r, g, b, _] = self.to_straight();
        if self.a <= 0.0 {
            return Self::TRANSPARENT;
        }
        Self::from_straight(r, g, b, a)
    }

    /// Premultiplied components in shader order.
    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// `wgpu` clear color. Clear values are written verbatim, so they are
    /// passed premultiplied as well.
    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color { r: self.r as f64, g: self.g as f64, b: self.b as f64, a: self.a as f64 }
    }

    #[inline]
    pub fn is_opaque(self) -> bool {
        self.a >= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_input_is_premultiplied() {
        let c = Color::from_straight(1.0, 0.5, 0.0, 0.5);
        assert_eq!(c.to_array(), [0.5, 0.25, 0.0, 0.5]);
        assert_eq!(c.to_straight(), [1.0, 0.5, 0.0, 0.5]);
    }

    #[test]
    fn out_of_range_components_are_clamped() {
        let c = Color::from_straight(2.0, -1.0, 0.5, 3.0);
        assert_eq!(c.to_array(), [1.0, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn with_alpha_keeps_hue() {
        let c = Color::opaque(0.2, 0.4, 0.6).with_alpha(0.5);
        let [r, g, b, a] = c.to_straight();
        assert!((r - 0.2).abs() < 1e-6 && (g - 0.4).abs() < 1e-6 && (b - 0.6).abs() < 1e-6);
        assert_eq!(a, 0.5);
    }

    #[test]
    fn transparent_stays_transparent() {
        assert_eq!(Color::TRANSPARENT.with_alpha(1.0), Color::TRANSPARENT);
    }
}
