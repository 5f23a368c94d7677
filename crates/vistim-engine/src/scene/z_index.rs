/// Layer of a draw command; higher values cover lower ones.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Ord, PartialOrd)]
pub struct ZIndex(pub i32);

impl ZIndex {
    pub const BACKGROUND: ZIndex = ZIndex(i32::MIN);
    pub const OVERLAY: ZIndex = ZIndex(i32::MAX);

    #[inline]
    pub const fn new(v: i32) -> Self {
        Self(v)
    }
}
