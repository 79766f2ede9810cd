//! Letterbox/pillarbox fit of the logical canvas into the window.
//!
//! The scene always renders at the canvas resolution; this module only
//! decides where that canvas lands on the window surface. Pure math, no
//! GPU types, recomputed on resize events only.

/// Placement of the logical canvas within the window, in window pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub logical_w: u32,
    pub logical_h: u32,
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Viewport {
    /// Uniform scale preserving the canvas aspect ratio: the limiting axis
    /// fills the window, the other is centered with black bars.
    pub fn fit(logical_w: u32, logical_h: u32, window_w: u32, window_h: u32) -> Self {
        let scale_x = window_w as f32 / logical_w as f32;
        let scale_y = window_h as f32 / logical_h as f32;
        let scale = scale_x.min(scale_y);
        let offset_x = (window_w as f32 - logical_w as f32 * scale) / 2.0;
        let offset_y = (window_h as f32 - logical_h as f32 * scale) / 2.0;
        Self {
            logical_w,
            logical_h,
            scale,
            offset_x,
            offset_y,
        }
    }

    /// Destination rectangle of the canvas on the window: (x, y, w, h).
    pub fn dest_rect(&self) -> (f32, f32, f32, f32) {
        (
            self.offset_x,
            self.offset_y,
            self.logical_w as f32 * self.scale,
            self.logical_h as f32 * self.scale,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_upscale_fills_exactly() {
        let vp = Viewport::fit(320, 180, 1600, 900);
        assert_eq!(vp.scale, 5.0);
        assert_eq!(vp.offset_x, 0.0);
        assert_eq!(vp.offset_y, 0.0);
        assert_eq!(vp.dest_rect(), (0.0, 0.0, 1600.0, 900.0));
    }

    #[test]
    fn taller_window_letterboxes_vertically() {
        let vp = Viewport::fit(320, 180, 800, 600);
        assert_eq!(vp.scale, 2.5);
        assert_eq!(vp.offset_x, 0.0);
        assert_eq!(vp.offset_y, 75.0);
        let (_, _, w, h) = vp.dest_rect();
        assert_eq!((w, h), (800.0, 450.0));
    }

    #[test]
    fn wider_window_pillarboxes_horizontally() {
        let vp = Viewport::fit(320, 180, 2000, 900);
        assert_eq!(vp.scale, 5.0);
        assert_eq!(vp.offset_x, 200.0);
        assert_eq!(vp.offset_y, 0.0);
    }

    #[test]
    fn downscale_keeps_aspect() {
        let vp = Viewport::fit(1920, 1080, 960, 540);
        assert_eq!(vp.scale, 0.5);
        assert_eq!(vp.dest_rect(), (0.0, 0.0, 960.0, 540.0));
    }
}
