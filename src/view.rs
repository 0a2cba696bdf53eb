// ============================================================================
// VIEW STATE & COORDINATE TRANSLATION
// ============================================================================

use crate::geom::{Axis, PixelPoint, WorldPoint};

/// Parameters of the current 2D view of the volume.
#[derive(Clone, Copy, Debug)]
pub struct ViewState {
    /// Destination buffer dimensions in pixels.
    pub width: u32,
    pub height: u32,
    /// Slice normal: the world axis held constant across the view plane.
    pub in_plane: Axis,
    /// World coordinate of the view plane along `in_plane`.
    pub plane_position: f32,
}

impl ViewState {
    pub fn new(width: u32, height: u32, in_plane: Axis, plane_position: f32) -> Self {
        Self {
            width,
            height,
            in_plane,
            plane_position,
        }
    }

    /// True when `world` lies within `range` of the view plane along the
    /// slice normal. Annotations use half a voxel's thickness as the range.
    pub fn is_world_visible(&self, world: WorldPoint, range: f32) -> bool {
        (world[self.in_plane.index()] - self.plane_position).abs() <= range
    }

    /// Half-voxel visibility range for this view's normal axis.
    pub fn visibility_range(&self, voxel_size: [f32; 3]) -> f32 {
        voxel_size[self.in_plane.index()] / 2.0
    }
}

/// Bidirectional pixel↔world translation. Implementations are pure functions
/// of view parameters — no state is read from the volume or the layer.
pub trait PixelToWorld {
    fn pixel_to_world(&self, pixel: PixelPoint) -> WorldPoint;
    fn world_to_pixel(&self, world: WorldPoint) -> PixelPoint;
}

/// Axis-aligned slice translator: the two non-normal world axes map to screen
/// x/y in ascending axis order, scaled by `zoom` pixels per world unit.
#[derive(Clone, Copy, Debug)]
pub struct SliceTranslator {
    pub in_plane: Axis,
    pub plane_position: f32,
    /// World coordinate shown at pixel (0, 0), along the two screen axes.
    pub screen_origin: [f32; 2],
    /// Pixels per world unit. Must be positive.
    pub zoom: f32,
}

impl SliceTranslator {
    pub fn new(in_plane: Axis, plane_position: f32) -> Self {
        Self {
            in_plane,
            plane_position,
            screen_origin: [0.0, 0.0],
            zoom: 1.0,
        }
    }

    /// Indices of the world axes shown on screen x and y.
    fn screen_axes(&self) -> (usize, usize) {
        match self.in_plane {
            Axis::X => (1, 2),
            Axis::Y => (0, 2),
            Axis::Z => (0, 1),
        }
    }
}

impl PixelToWorld for SliceTranslator {
    fn pixel_to_world(&self, pixel: PixelPoint) -> WorldPoint {
        let (ax, ay) = self.screen_axes();
        let mut world = [0.0; 3];
        world[self.in_plane.index()] = self.plane_position;
        world[ax] = self.screen_origin[0] + pixel.x as f32 / self.zoom;
        world[ay] = self.screen_origin[1] + pixel.y as f32 / self.zoom;
        world
    }

    fn world_to_pixel(&self, world: WorldPoint) -> PixelPoint {
        let (ax, ay) = self.screen_axes();
        PixelPoint::new(
            ((world[ax] - self.screen_origin[0]) * self.zoom).round() as i32,
            ((world[ay] - self.screen_origin[1]) * self.zoom).round() as i32,
        )
    }
}
