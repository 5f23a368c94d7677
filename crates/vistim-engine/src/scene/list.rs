use crate::coords::Rect;

use super::{DrawCmd, SortKey, ZIndex};

#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub key: SortKey,
    pub cmd: DrawCmd,
    /// Scissor rectangle in logical pixels; `None` draws everywhere.
    pub clip_rect: Option<Rect>,
}

/// Commands recorded for one frame.
///
/// Items are stored in insertion order and sorted lazily into a reused
/// index buffer, so a warmed list records and iterates without allocating.
#[derive(Debug, Default)]
pub struct DrawList {
    items: Vec<DrawItem>,
    next_order: u32,
    sorted: Vec<usize>,
    sorted_dirty: bool,
    /// Effective clip of each open scope, already intersected with its parents.
    clip_stack: Vec<Rect>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all items and open clip scopes, keeping capacity.
    pub fn clear(&mut self) {
        self.items.clear();
        self.sorted.clear();
        self.clip_stack.clear();
        self.next_order = 0;
        self.sorted_dirty = false;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    /// Records `cmd` under the current clip.
    pub fn push(&mut self, z: ZIndex, cmd: DrawCmd) {
        let key = SortKey::new(z, self.next_order);
        self.next_order = self.next_order.wrapping_add(1);
        self.items.push(DrawItem { key, cmd, clip_rect: self.clip_stack.last().copied() });
        self.sorted_dirty = true;
    }

    /// Clips everything pushed until the matching [`pop_clip`](Self::pop_clip)
    /// to `rect`, intersected with any enclosing clip.
    pub fn push_clip(&mut self, rect: Rect) {
        let effective = match self.clip_stack.last() {
            None => rect,
            // Disjoint scopes clip to nothing.
            Some(parent) => parent.intersect(rect).unwrap_or_default(),
        };
        self.clip_stack.push(effective);
    }

    pub fn pop_clip(&mut self) {
        debug_assert!(!self.clip_stack.is_empty(), "pop_clip without push_clip");
        self.clip_stack.pop();
    }

    /// Items back-to-front.
    pub fn iter_in_paint_order(&mut self) -> impl Iterator<Item = &DrawItem> {
        if self.sorted_dirty {
            self.sorted.clear();
            self.sorted.extend(0..self.items.len());
            let items = &self.items;
            self.sorted.sort_by_key(|&i| items[i].key);
            self.sorted_dirty = false;
        }
        self.sorted.iter().map(|&i| &self.items[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::palette::basic;

    fn rect_z(list: &DrawList) -> Vec<(i32, u32)> {
        list.items().iter().map(|i| (i.key.z.0, i.key.order)).collect()
    }

    // ── ordering ──────────────────────────────────────────────────────────

    #[test]
    fn paint_order_is_z_then_insertion() {
        let mut list = DrawList::new();
        list.push_solid_rect(ZIndex(2), Rect::new(0.0, 0.0, 1.0, 1.0), basic::RED);
        list.push_solid_rect(ZIndex(0), Rect::new(0.0, 0.0, 1.0, 1.0), basic::GREEN);
        list.push_solid_rect(ZIndex(2), Rect::new(0.0, 0.0, 1.0, 1.0), basic::BLUE);
        list.push_solid_rect(ZIndex(-1), Rect::new(0.0, 0.0, 1.0, 1.0), basic::WHITE);

        let order: Vec<_> = list.iter_in_paint_order().map(|i| (i.key.z.0, i.key.order)).collect();
        assert_eq!(order, vec![(-1, 3), (0, 1), (2, 0), (2, 2)]);
        assert_eq!(rect_z(&list), vec![(2, 0), (0, 1), (2, 2), (-1, 3)]);
    }

    #[test]
    fn clear_restarts_insertion_order() {
        let mut list = DrawList::new();
        list.push_solid_rect(ZIndex(0), Rect::new(0.0, 0.0, 1.0, 1.0), basic::RED);
        list.clear();
        assert!(list.is_empty());
        list.push_solid_rect(ZIndex(0), Rect::new(0.0, 0.0, 1.0, 1.0), basic::RED);
        assert_eq!(list.items()[0].key.order, 0);
        assert_eq!(list.iter_in_paint_order().count(), 1);
    }

    // ── clipping ──────────────────────────────────────────────────────────

    #[test]
    fn nested_clips_intersect() {
        let mut list = DrawList::new();
        list.push_clip(Rect::new(0.0, 0.0, 100.0, 100.0));
        list.push_clip(Rect::new(50.0, 50.0, 100.0, 100.0));
        list.push_solid_rect(ZIndex(0), Rect::new(0.0, 0.0, 10.0, 10.0), basic::RED);
        list.pop_clip();
        list.push_solid_rect(ZIndex(0), Rect::new(0.0, 0.0, 10.0, 10.0), basic::RED);
        list.pop_clip();
        list.push_solid_rect(ZIndex(0), Rect::new(0.0, 0.0, 10.0, 10.0), basic::RED);

        let clips: Vec<_> = list.items().iter().map(|i| i.clip_rect).collect();
        assert_eq!(
            clips,
            vec![
                Some(Rect::new(50.0, 50.0, 50.0, 50.0)),
                Some(Rect::new(0.0, 0.0, 100.0, 100.0)),
                None
            ]
        );
    }

    #[test]
    fn disjoint_clip_is_empty() {
        let mut list = DrawList::new();
        list.push_clip(Rect::new(0.0, 0.0, 10.0, 10.0));
        list.push_clip(Rect::new(20.0, 20.0, 10.0, 10.0));
        list.push_solid_rect(ZIndex(0), Rect::new(0.0, 0.0, 1.0, 1.0), basic::RED);
        assert!(list.items()[0].clip_rect.is_some_and(Rect::is_empty));
    }
}
