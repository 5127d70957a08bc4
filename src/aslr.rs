// Layout randomization

/// Supplies the offset applied to the base of a randomized layout.
pub trait SlideSource {
    /// Returns a slide in `0..=max`. Larger values are clamped by the caller.
    fn slide(&mut self, max: u64) -> u64;
}

/// Always places the image set at the start of the address space
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSlide;

impl SlideSource for NoSlide {
    #[inline]
    fn slide(&mut self, _max: u64) -> u64 {
        0
    }
}

/// A predetermined slide, for reproducing a layout
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSlide(pub u64);

impl SlideSource for FixedSlide {
    #[inline]
    fn slide(&mut self, max: u64) -> u64 {
        self.0.min(max)
    }
}
