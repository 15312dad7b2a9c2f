//! Grid to device-space geometry.
//!
//! Device space is the `[-1, 1] x [-1, 1]` square with `+y` pointing up.
//! Grid row 0 is the top of the screen.

use glam::Vec2;

use super::disposition::Disposition;

/// Gap between neighbouring frames, in physical pixels.
pub const PHOTO_FRAME_PADDING: f32 = 2.0;

/// Quad corners ordered bottom-left, bottom-right, top-left, top-right.
pub type Vertices = [[f32; 2]; 4];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl Quad {
    pub const FULL: Self = Self {
        left: -1.0,
        bottom: -1.0,
        right: 1.0,
        top: 1.0,
    };

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.left + self.right) * 0.5,
            (self.bottom + self.top) * 0.5,
        )
    }

    pub fn vertices(&self) -> Vertices {
        [
            [self.left, self.bottom],
            [self.right, self.bottom],
            [self.left, self.top],
            [self.right, self.top],
        ]
    }

    /// Strict containment; points on an edge belong to no frame.
    pub fn contains(&self, point: Vec2) -> bool {
        self.left < point.x && point.x < self.right && self.bottom < point.y && point.y < self.top
    }

    pub fn inset(&self, dx: f32, dy: f32) -> Self {
        Self {
            left: self.left + dx,
            bottom: self.bottom + dy,
            right: self.right - dx,
            top: self.top - dy,
        }
    }

    pub fn intersection_area(&self, other: &Quad) -> f32 {
        let w = self.right.min(other.right) - self.left.max(other.left);
        let h = self.top.min(other.top) - self.bottom.max(other.bottom);
        if w <= 0.0 || h <= 0.0 { 0.0 } else { w * h }
    }
}

/// Which screen edges a frame touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edges {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

impl Edges {
    pub fn any(&self) -> bool {
        self.left || self.right || self.top || self.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    pub cols: u32,
    pub rows: u32,
}

/// Inter-frame padding for a given surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    pub surface_width: u32,
    pub surface_height: u32,
}

impl Padding {
    /// Padding is only applied when the layout holds more than one frame.
    pub fn for_layout(
        enabled: bool,
        frame_count: usize,
        surface_width: u32,
        surface_height: u32,
    ) -> Option<Self> {
        (enabled && frame_count > 1 && surface_width > 0 && surface_height > 0).then_some(Self {
            surface_width,
            surface_height,
        })
    }

    fn insets(&self) -> (f32, f32) {
        (
            PHOTO_FRAME_PADDING / self.surface_width as f32,
            PHOTO_FRAME_PADDING / self.surface_height as f32,
        )
    }
}

/// Device-space placement of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGeometry {
    /// Full cell, used for borders.
    pub outer: Quad,
    /// Photo area after padding.
    pub inner: Quad,
    pub edges: Edges,
}

pub fn geometry(d: &Disposition, grid: GridSize, padding: Option<Padding>) -> FrameGeometry {
    let cell_w = 2.0 / grid.cols as f32;
    let cell_h = 2.0 / grid.rows as f32;
    let outer = Quad {
        left: -1.0 + d.x as f32 * cell_w,
        bottom: 1.0 - (d.y + d.h) as f32 * cell_h,
        right: -1.0 + (d.x + d.w) as f32 * cell_w,
        top: 1.0 - d.y as f32 * cell_h,
    };
    let inner = match padding {
        Some(padding) => {
            let (dx, dy) = padding.insets();
            outer.inset(dx, dy)
        }
        None => outer,
    };
    let edges = Edges {
        left: d.x == 0,
        right: d.x + d.w >= grid.cols,
        top: d.y == 0,
        bottom: d.y + d.h >= grid.rows,
    };
    FrameGeometry {
        outer,
        inner,
        edges,
    }
}

/// Maps a window position in physical pixels to device space.
pub fn screen_to_device(point: Vec2, width: u32, height: u32) -> Vec2 {
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;
    Vec2::new(point.x * 2.0 / w - 1.0, -(point.y * 2.0 / h - 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID: GridSize = GridSize { cols: 4, rows: 7 };

    #[test]
    fn top_left_cell_is_anchored_at_screen_corner() {
        let g = geometry(&Disposition::new(0, 0, 1, 1), GRID, None);
        assert_eq!(g.outer.left, -1.0);
        assert_eq!(g.outer.top, 1.0);
        assert!((g.outer.right - -0.5).abs() < 1e-6);
        assert!((g.outer.bottom - (1.0 - 2.0 / 7.0)).abs() < 1e-6);
        assert!(g.edges.left && g.edges.top);
        assert!(!g.edges.right && !g.edges.bottom);
    }

    #[test]
    fn vertices_follow_strip_order() {
        let v = Quad::FULL.vertices();
        assert_eq!(v, [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]]);
    }

    #[test]
    fn padding_shrinks_only_multi_frame_layouts() {
        assert!(Padding::for_layout(true, 1, 800, 600).is_none());
        assert!(Padding::for_layout(false, 4, 800, 600).is_none());
        let padding = Padding::for_layout(true, 4, 800, 400).unwrap();
        let g = geometry(&Disposition::new(0, 0, 2, 2), GridSize { cols: 4, rows: 4 }, Some(padding));
        assert!((g.inner.left - (g.outer.left + 2.0 / 800.0)).abs() < 1e-6);
        assert!((g.inner.top - (g.outer.top - 2.0 / 400.0)).abs() < 1e-6);
        assert_eq!(g.outer.left, -1.0);
    }

    #[test]
    fn screen_mapping_flips_y() {
        let p = screen_to_device(Vec2::new(0.0, 0.0), 200, 100);
        assert_eq!(p, Vec2::new(-1.0, 1.0));
        let p = screen_to_device(Vec2::new(150.0, 75.0), 200, 100);
        assert_eq!(p, Vec2::new(0.5, -0.5));
    }

    #[test]
    fn containment_is_strict() {
        assert!(Quad::FULL.contains(Vec2::ZERO));
        assert!(!Quad::FULL.contains(Vec2::new(1.0, 0.0)));
    }
}
