// ============================================================================
// VOLUME COLLABORATOR — sampling, selection, and edge-mark surface
// ============================================================================
//
// The rendering layer never owns volume storage; it consumes this trait. The
// in-memory `GridVolume` below backs the headless CLI and the test suite, and
// is sufficient for hosts without their own sampling engine.

use serde::{Deserialize, Serialize};

use crate::geom::WorldPoint;

/// Interpolation strategy for scalar lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SampleMethod {
    #[default]
    Nearest,
    Trilinear,
    Sinc,
    /// Gradient magnitude at the sample point rather than the raw value.
    Magnitude,
}

impl SampleMethod {
    pub fn label(&self) -> &'static str {
        match self {
            SampleMethod::Nearest => "nearest",
            SampleMethod::Trilinear => "trilinear",
            SampleMethod::Sinc => "sinc",
            SampleMethod::Magnitude => "magnitude",
        }
    }

    pub fn all() -> &'static [SampleMethod] {
        &[
            SampleMethod::Nearest,
            SampleMethod::Trilinear,
            SampleMethod::Sinc,
            SampleMethod::Magnitude,
        ]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        SampleMethod::all().iter().copied().find(|m| m.label() == name)
    }
}

/// Scalar volume consumed by the layer: bounds testing, sampling by method,
/// selection state with a highlight color, and boundary ("edge") marks laid
/// down by the line tools.
pub trait VolumeSource {
    /// Voxel counts along x/y/z.
    fn dims(&self) -> [u32; 3];

    /// Physical voxel extent along each axis.
    fn voxel_size(&self) -> [f32; 3];

    /// True when the world coordinate falls inside the volume.
    fn contains(&self, world: WorldPoint) -> bool;

    /// Nearest voxel index for a world coordinate, or `None` outside bounds.
    fn world_to_index(&self, world: WorldPoint) -> Option<[i32; 3]>;

    /// World coordinate at the center of a voxel.
    fn index_to_world(&self, index: [i32; 3]) -> WorldPoint;

    /// Scalar value at a world coordinate by the given method. Callers must
    /// bounds-test first; out-of-bounds behavior is implementation-defined.
    fn value_at(&self, world: WorldPoint, method: SampleMethod) -> f32;

    /// Exact stored value of one voxel (no interpolation).
    fn value_at_index(&self, index: [i32; 3]) -> f32;

    /// Overwrite the voxel nearest to a world coordinate.
    fn set_value_at(&mut self, world: WorldPoint, value: f32);

    /// Gradient magnitude at a world coordinate.
    fn magnitude_at(&self, world: WorldPoint) -> f32;

    /// Upper bound on `magnitude_at` over the whole volume. Used by the path
    /// search to scale costs; a loose bound is fine, a low one is not.
    fn magnitude_max(&self) -> f32;

    /// Min/max stored value over the whole dataset.
    fn value_range(&self) -> (f32, f32);

    /// Highlight color when the voxel at this coordinate is selected.
    fn selection_at(&self, world: WorldPoint) -> Option<[u8; 3]>;

    fn select(&mut self, world: WorldPoint);
    fn unselect(&mut self, world: WorldPoint);

    /// Boundary marks dropped by the straight-line tool; flood fills can be
    /// told to stop at them.
    fn mark_edge(&mut self, world: WorldPoint);
    fn is_edge(&self, world: WorldPoint) -> bool;
}

// ============================================================================
// GRID VOLUME — flat-buffer implementation
// ============================================================================

/// Highlight used for selected voxels unless the host picks another.
pub const DEFAULT_SELECT_COLOR: [u8; 3] = [255, 255, 0];

/// Dense scalar grid with selection and edge masks. Storage is row-major
/// x-fastest: `index = (z * dim_y + y) * dim_x + x`.
pub struct GridVolume {
    dims: [u32; 3],
    spacing: [f32; 3],
    origin: [f32; 3],
    values: Vec<f32>,
    selected: Vec<bool>,
    edges: Vec<bool>,
    select_color: [u8; 3],
    value_min: f32,
    value_max: f32,
    magnitude_max: f32,
}

impl GridVolume {
    /// Wrap an existing scalar buffer. `values.len()` must equal the product
    /// of `dims`; panics otherwise (a caller bug, not a runtime condition).
    pub fn from_values(dims: [u32; 3], spacing: [f32; 3], values: Vec<f32>) -> Self {
        let count = dims[0] as usize * dims[1] as usize * dims[2] as usize;
        assert_eq!(values.len(), count, "value buffer does not match dims");

        let mut vol = Self {
            dims,
            spacing,
            origin: [0.0; 3],
            values,
            selected: vec![false; count],
            edges: vec![false; count],
            select_color: DEFAULT_SELECT_COLOR,
            value_min: 0.0,
            value_max: 0.0,
            magnitude_max: 0.0,
        };
        vol.rescan_bounds();
        vol
    }

    /// All-zero volume of the given shape.
    pub fn zeros(dims: [u32; 3], spacing: [f32; 3]) -> Self {
        let count = dims[0] as usize * dims[1] as usize * dims[2] as usize;
        Self::from_values(dims, spacing, vec![0.0; count])
    }

    /// World coordinate of voxel (0,0,0)'s center. Defaults to the origin.
    pub fn set_origin(&mut self, origin: [f32; 3]) {
        self.origin = origin;
    }

    pub fn set_select_color(&mut self, color: [u8; 3]) {
        self.select_color = color;
    }

    /// Recompute the cached value range and magnitude bound from scratch.
    fn rescan_bounds(&mut self) {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &v in &self.values {
            min = min.min(v);
            max = max.max(v);
        }
        if self.values.is_empty() {
            min = 0.0;
            max = 0.0;
        }
        self.value_min = min;
        self.value_max = max;

        let mut mag_max = 0.0f32;
        let [dx, dy, dz] = self.dims;
        for z in 0..dz as i32 {
            for y in 0..dy as i32 {
                for x in 0..dx as i32 {
                    mag_max = mag_max.max(self.magnitude_at_index([x, y, z]));
                }
            }
        }
        self.magnitude_max = mag_max;
    }

    fn flat(&self, index: [i32; 3]) -> Option<usize> {
        let [dx, dy, dz] = self.dims;
        if index[0] < 0
            || index[1] < 0
            || index[2] < 0
            || index[0] >= dx as i32
            || index[1] >= dy as i32
            || index[2] >= dz as i32
        {
            return None;
        }
        Some(
            (index[2] as usize * dy as usize + index[1] as usize) * dx as usize
                + index[0] as usize,
        )
    }

    /// Value at a voxel, clamping out-of-range indices to the border. Keeps
    /// the interpolators simple near the volume faces.
    fn value_clamped(&self, index: [i32; 3]) -> f32 {
        let clamped = [
            index[0].clamp(0, self.dims[0] as i32 - 1),
            index[1].clamp(0, self.dims[1] as i32 - 1),
            index[2].clamp(0, self.dims[2] as i32 - 1),
        ];
        self.values[self.flat(clamped).unwrap_or(0)]
    }

    /// Continuous voxel-space coordinate for a world point.
    fn to_voxel_space(&self, world: WorldPoint) -> [f32; 3] {
        [
            (world[0] - self.origin[0]) / self.spacing[0],
            (world[1] - self.origin[1]) / self.spacing[1],
            (world[2] - self.origin[2]) / self.spacing[2],
        ]
    }

    fn sample_trilinear(&self, world: WorldPoint) -> f32 {
        let v = self.to_voxel_space(world);
        let base = [
            v[0].floor() as i32,
            v[1].floor() as i32,
            v[2].floor() as i32,
        ];
        let f = [v[0] - base[0] as f32, v[1] - base[1] as f32, v[2] - base[2] as f32];

        let mut acc = 0.0;
        for dz in 0..2 {
            for dy in 0..2 {
                for dx in 0..2 {
                    let w = (if dx == 0 { 1.0 - f[0] } else { f[0] })
                        * (if dy == 0 { 1.0 - f[1] } else { f[1] })
                        * (if dz == 0 { 1.0 - f[2] } else { f[2] });
                    acc += w * self.value_clamped([base[0] + dx, base[1] + dy, base[2] + dz]);
                }
            }
        }
        acc
    }

    /// Lanczos-3 windowed sinc.
    fn sample_sinc(&self, world: WorldPoint) -> f32 {
        const RADIUS: i32 = 3;

        fn lanczos3(x: f32) -> f32 {
            if x.abs() < 1e-6 {
                return 1.0;
            }
            if x.abs() >= RADIUS as f32 {
                return 0.0;
            }
            let px = std::f32::consts::PI * x;
            let a = RADIUS as f32;
            (px.sin() / px) * ((px / a).sin() / (px / a))
        }

        let v = self.to_voxel_space(world);
        let base = [
            v[0].floor() as i32,
            v[1].floor() as i32,
            v[2].floor() as i32,
        ];

        let mut acc = 0.0;
        let mut weight_sum = 0.0;
        for dz in (1 - RADIUS)..=RADIUS {
            let wz = lanczos3(v[2] - (base[2] + dz) as f32);
            if wz == 0.0 {
                continue;
            }
            for dy in (1 - RADIUS)..=RADIUS {
                let wy = lanczos3(v[1] - (base[1] + dy) as f32);
                if wy == 0.0 {
                    continue;
                }
                for dx in (1 - RADIUS)..=RADIUS {
                    let wx = lanczos3(v[0] - (base[0] + dx) as f32);
                    if wx == 0.0 {
                        continue;
                    }
                    let w = wx * wy * wz;
                    acc += w * self.value_clamped([base[0] + dx, base[1] + dy, base[2] + dz]);
                    weight_sum += w;
                }
            }
        }
        if weight_sum.abs() < 1e-6 {
            0.0
        } else {
            acc / weight_sum
        }
    }

    /// Central-difference gradient magnitude at a voxel.
    fn magnitude_at_index(&self, index: [i32; 3]) -> f32 {
        let mut sq = 0.0;
        for axis in 0..3 {
            let mut lo = index;
            let mut hi = index;
            lo[axis] -= 1;
            hi[axis] += 1;
            let g = (self.value_clamped(hi) - self.value_clamped(lo))
                / (2.0 * self.spacing[axis]);
            sq += g * g;
        }
        sq.sqrt()
    }
}

impl VolumeSource for GridVolume {
    fn dims(&self) -> [u32; 3] {
        self.dims
    }

    fn voxel_size(&self) -> [f32; 3] {
        self.spacing
    }

    fn contains(&self, world: WorldPoint) -> bool {
        self.world_to_index(world).is_some()
    }

    fn world_to_index(&self, world: WorldPoint) -> Option<[i32; 3]> {
        let v = self.to_voxel_space(world);
        let index = [
            v[0].round() as i32,
            v[1].round() as i32,
            v[2].round() as i32,
        ];
        self.flat(index).map(|_| index)
    }

    fn index_to_world(&self, index: [i32; 3]) -> WorldPoint {
        [
            index[0] as f32 * self.spacing[0] + self.origin[0],
            index[1] as f32 * self.spacing[1] + self.origin[1],
            index[2] as f32 * self.spacing[2] + self.origin[2],
        ]
    }

    fn value_at(&self, world: WorldPoint, method: SampleMethod) -> f32 {
        match method {
            SampleMethod::Nearest => match self.world_to_index(world) {
                Some(index) => self.value_at_index(index),
                None => 0.0,
            },
            SampleMethod::Trilinear => self.sample_trilinear(world),
            SampleMethod::Sinc => self.sample_sinc(world),
            SampleMethod::Magnitude => self.magnitude_at(world),
        }
    }

    fn value_at_index(&self, index: [i32; 3]) -> f32 {
        self.flat(index).map(|i| self.values[i]).unwrap_or(0.0)
    }

    fn set_value_at(&mut self, world: WorldPoint, value: f32) {
        if let Some(index) = self.world_to_index(world) {
            let flat = self.flat(index).unwrap_or(0);
            self.values[flat] = value;
            // Keep the cached bounds valid as running bounds; a full rescan
            // per edit would be O(volume).
            self.value_min = self.value_min.min(value);
            self.value_max = self.value_max.max(value);
            for axis in 0..3 {
                for step in [-1, 1] {
                    let mut n = index;
                    n[axis] += step;
                    self.magnitude_max = self.magnitude_max.max(self.magnitude_at_index(n));
                }
            }
            self.magnitude_max = self.magnitude_max.max(self.magnitude_at_index(index));
        }
    }

    fn magnitude_at(&self, world: WorldPoint) -> f32 {
        match self.world_to_index(world) {
            Some(index) => self.magnitude_at_index(index),
            None => 0.0,
        }
    }

    fn magnitude_max(&self) -> f32 {
        self.magnitude_max
    }

    fn value_range(&self) -> (f32, f32) {
        (self.value_min, self.value_max)
    }

    fn selection_at(&self, world: WorldPoint) -> Option<[u8; 3]> {
        let flat = self.world_to_index(world).and_then(|i| self.flat(i))?;
        if self.selected[flat] {
            Some(self.select_color)
        } else {
            None
        }
    }

    fn select(&mut self, world: WorldPoint) {
        if let Some(flat) = self.world_to_index(world).and_then(|i| self.flat(i)) {
            self.selected[flat] = true;
        }
    }

    fn unselect(&mut self, world: WorldPoint) {
        if let Some(flat) = self.world_to_index(world).and_then(|i| self.flat(i)) {
            self.selected[flat] = false;
        }
    }

    fn mark_edge(&mut self, world: WorldPoint) {
        if let Some(flat) = self.world_to_index(world).and_then(|i| self.flat(i)) {
            self.edges[flat] = true;
        }
    }

    fn is_edge(&self, world: WorldPoint) -> bool {
        self.world_to_index(world)
            .and_then(|i| self.flat(i))
            .map(|flat| self.edges[flat])
            .unwrap_or(false)
    }
}
