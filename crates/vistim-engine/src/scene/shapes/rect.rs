use crate::coords::Rect;
use crate::paint::Color;
use crate::scene::{DrawCmd, DrawList, ZIndex};

/// Solid rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct RectCmd {
    pub rect: Rect,
    pub color: Color,
}

impl DrawList {
    pub fn push_solid_rect(&mut self, z: ZIndex, rect: Rect, color: Color) {
        self.push(z, DrawCmd::Rect(RectCmd { rect, color }));
    }

    /// Rectangle outline of `width` logical pixels drawn inside `rect`.
    pub fn push_rect_outline(&mut self, z: ZIndex, rect: Rect, width: f32, color: Color) {
        let w = width.min(rect.size.x * 0.5).min(rect.size.y * 0.5);
        if w <= 0.0 {
            return;
        }
        let (x, y) = (rect.origin.x, rect.origin.y);
        let (rw, rh) = (rect.size.x, rect.size.y);
        self.push_solid_rect(z, Rect::new(x, y, rw, w), color);
        self.push_solid_rect(z, Rect::new(x, y + rh - w, rw, w), color);
        self.push_solid_rect(z, Rect::new(x, y + w, w, rh - 2.0 * w), color);
        self.push_solid_rect(z, Rect::new(x + rw - w, y + w, w, rh - 2.0 * w), color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::palette::basic;

    #[test]
    fn outline_is_four_bands() {
        let mut list = DrawList::new();
        list.push_rect_outline(ZIndex(0), Rect::new(0.0, 0.0, 10.0, 20.0), 2.0, basic::RED);
        let rects: Vec<Rect> = list
            .items()
            .iter()
            .map(|i| match &i.cmd {
                DrawCmd::Rect(r) => r.rect,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            rects,
            vec![
                Rect::new(0.0, 0.0, 10.0, 2.0),
                Rect::new(0.0, 18.0, 10.0, 2.0),
                Rect::new(0.0, 2.0, 2.0, 16.0),
                Rect::new(8.0, 2.0, 2.0, 16.0),
            ]
        );
    }

    #[test]
    fn zero_width_outline_records_nothing() {
        let mut list = DrawList::new();
        list.push_rect_outline(ZIndex(0), Rect::new(0.0, 0.0, 10.0, 10.0), 0.0, basic::RED);
        assert!(list.is_empty());
    }
}
