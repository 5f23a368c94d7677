use std::mem;

/// Two fixed-size regions used to stream frames to the GPU.
///
/// The producer always writes into the back region. [`FrameRing::lend`]
/// publishes the filled region by moving it out to the consumer, and the
/// producer continues in the other region. The consumer uploads with no lock
/// held and returns the region with [`FrameRing::give_back`], so a frame
/// being uploaded is never the one being written.
#[derive(Debug)]
pub struct FrameRing {
    regions: [Vec<u8>; 2],
    back: usize,
    /// The front region is out with the consumer.
    lent: bool,
}

impl FrameRing {
    /// Creates a ring whose front region holds `frame` (already uploaded)
    /// and whose back region is zeroed.
    pub fn from_frame(frame: Vec<u8>) -> Self {
        let back = vec![0u8; frame.len()];
        Self { regions: [frame, back], back: 1, lent: false }
    }

    #[inline]
    pub fn region_len(&self) -> usize {
        self.regions[self.back].len()
    }

    /// Index of the region the producer currently writes.
    #[inline]
    pub fn active_index(&self) -> usize {
        self.back
    }

    #[inline]
    pub fn is_lent(&self) -> bool {
        self.lent
    }

    /// Region the producer writes into. Never the lent one.
    #[inline]
    pub fn back_mut(&mut self) -> &mut [u8] {
        &mut self.regions[self.back]
    }

    /// Region last handed to the consumer; empty while it is lent.
    #[inline]
    pub fn front(&self) -> &[u8] {
        &self.regions[self.back ^ 1]
    }

    /// Publishes the back region, moving it out, and switches the producer
    /// to the other region. `None` while an earlier region is still out.
    pub fn lend(&mut self) -> Option<Vec<u8>> {
        if self.lent {
            return None;
        }
        let filled = self.back;
        self.back ^= 1;
        self.lent = true;
        Some(mem::take(&mut self.regions[filled]))
    }

    /// Returns the region obtained from [`lend`](Self::lend) to the front
    /// slot. A region of the wrong size is dropped.
    pub fn give_back(&mut self, region: Vec<u8>) {
        if !self.lent || region.len() != self.region_len() {
            return;
        }
        self.regions[self.back ^ 1] = region;
        self.lent = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_front_holds_initial_frame() {
        let ring = FrameRing::from_frame(vec![7; 4]);
        assert_eq!(ring.front(), &[7, 7, 7, 7]);
        assert_eq!(ring.region_len(), 4);
        assert!(!ring.is_lent());
    }

    #[test]
    fn lend_publishes_last_write() {
        let mut ring = FrameRing::from_frame(vec![0; 3]);
        ring.back_mut().copy_from_slice(&[1, 2, 3]);
        let region = ring.lend().unwrap();
        assert_eq!(region, vec![1, 2, 3]);
        ring.give_back(region);
        assert_eq!(ring.front(), &[1, 2, 3]);
    }

    #[test]
    fn producer_writes_elsewhere_while_a_region_is_lent() {
        let mut ring = FrameRing::from_frame(vec![0; 2]);
        let first = ring.active_index();
        ring.back_mut().copy_from_slice(&[1, 1]);
        let region = ring.lend().unwrap();
        assert_ne!(ring.active_index(), first);

        ring.back_mut().copy_from_slice(&[4, 4]);
        assert_eq!(region, vec![1, 1]);
        assert!(ring.lend().is_none());

        ring.give_back(region);
        assert_eq!(ring.front(), &[1, 1]);
        assert_eq!(ring.lend().unwrap(), vec![4, 4]);
        assert_eq!(ring.active_index(), first);
    }

    #[test]
    fn foreign_region_is_not_taken_back() {
        let mut ring = FrameRing::from_frame(vec![0; 2]);
        ring.give_back(vec![9; 2]);
        assert_eq!(ring.front(), &[0, 0]);

        let _region = ring.lend().unwrap();
        ring.give_back(vec![9; 5]);
        assert!(ring.is_lent());
    }
}
