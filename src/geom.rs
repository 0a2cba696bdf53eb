// ============================================================================
// GEOMETRY PRIMITIVES — world/pixel points and the discrete segment walk
// ============================================================================

/// A 3D location in the subject's physical scanner space, independent of any
/// 2D view. Plain array so collaborators can hand these around by value.
pub type WorldPoint = [f32; 3];

/// One of the three world axes. Doubles as the slice normal of a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn all() -> &'static [Axis] {
        &[Axis::X, Axis::Y, Axis::Z]
    }
}

/// A pixel coordinate in the destination buffer (signed so off-buffer
/// positions survive translation and can be rejected later).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Squared Euclidean distance between two world points.
pub fn distance_squared(a: WorldPoint, b: WorldPoint) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

/// All pixels on the discrete segment from `from` to `to`, endpoints
/// inclusive (Bresenham). Shared by the annotation pass and the straight-line
/// edge-marking side effect, so both touch exactly the same pixels.
pub fn points_on_segment(from: PixelPoint, to: PixelPoint) -> Vec<PixelPoint> {
    let dx = (to.x - from.x).abs();
    let dy = (to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };

    let mut points = Vec::with_capacity((dx.max(dy) + 1) as usize);
    let mut x = from.x;
    let mut y = from.y;
    let mut err = dx - dy;

    loop {
        points.push(PixelPoint::new(x, y));
        if x == to.x && y == to.y {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_endpoints_inclusive() {
        let pts = points_on_segment(PixelPoint::new(2, 3), PixelPoint::new(7, 3));
        assert_eq!(pts.len(), 6);
        assert_eq!(pts.first(), Some(&PixelPoint::new(2, 3)));
        assert_eq!(pts.last(), Some(&PixelPoint::new(7, 3)));
    }

    #[test]
    fn segment_single_point() {
        let p = PixelPoint::new(5, 5);
        assert_eq!(points_on_segment(p, p), vec![p]);
    }

    #[test]
    fn segment_diagonal() {
        let pts = points_on_segment(PixelPoint::new(0, 0), PixelPoint::new(3, 3));
        assert_eq!(
            pts,
            vec![
                PixelPoint::new(0, 0),
                PixelPoint::new(1, 1),
                PixelPoint::new(2, 2),
                PixelPoint::new(3, 3),
            ]
        );
    }

    #[test]
    fn segment_reversed_covers_same_pixels() {
        let a = PixelPoint::new(1, 8);
        let b = PixelPoint::new(6, 2);
        let mut fwd = points_on_segment(a, b);
        let mut rev = points_on_segment(b, a);
        fwd.sort_by_key(|p| (p.x, p.y));
        rev.sort_by_key(|p| (p.x, p.y));
        assert_eq!(fwd, rev);
    }
}
