// ============================================================================
// REGION EDITING — brush and flood selection over the volume
// ============================================================================
//
// Both tools toggle per-voxel selection state and produce one reversible
// `SelectionEdit` per touched point into the caller's log. The brush logs
// inside a gesture-scoped action opened by the tool dispatcher; the flood
// opens and closes its own action around the whole operation.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::geom::{distance_squared, Axis, WorldPoint};
use crate::history::{EditLog, SelectionEdit};
use crate::volume::VolumeSource;

/// Cancellation is offered only once a flood has run this long; short floods
/// finish uninterrupted.
const FLOOD_CANCEL_AFTER: Duration = Duration::from_millis(2000);
/// How many visited voxels pass between cancellation polls.
const FLOOD_CANCEL_STRIDE: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrushShape {
    #[default]
    Square,
    Circle,
}

impl BrushShape {
    pub fn label(&self) -> &'static str {
        match self {
            BrushShape::Square => "square",
            BrushShape::Circle => "circle",
        }
    }

    pub fn all() -> &'static [BrushShape] {
        &[BrushShape::Square, BrushShape::Circle]
    }
}

// ============================================================================
// BRUSH
// ============================================================================

/// World-space points covered by one brush stamp: every voxel-lattice offset
/// within `radius` of `center` along the enabled axes (boundary inclusive,
/// no duplicates). A disabled axis contributes only the zero offset, which
/// is how slice-constrained editing stays in plane.
pub fn brush_points(
    center: WorldPoint,
    shape: BrushShape,
    radius: f32,
    axes: [bool; 3],
    voxel_size: [f32; 3],
) -> Vec<WorldPoint> {
    let steps = |axis: usize| -> Vec<f32> {
        if !axes[axis] || radius <= 0.0 {
            return vec![0.0];
        }
        let n = (radius / voxel_size[axis]).floor() as i32;
        (-n..=n).map(|i| i as f32 * voxel_size[axis]).collect()
    };

    let (xs, ys, zs) = (steps(0), steps(1), steps(2));
    let mut points = Vec::with_capacity(xs.len() * ys.len() * zs.len());
    for &dz in &zs {
        for &dy in &ys {
            for &dx in &xs {
                if shape == BrushShape::Circle && dx * dx + dy * dy + dz * dz > radius * radius {
                    continue;
                }
                points.push([center[0] + dx, center[1] + dy, center[2] + dz]);
            }
        }
    }
    points
}

/// Apply one brush stamp: toggle selection at every covered point and log one
/// edit per point. The gesture's action must already be open on `log`.
/// Returns the number of points applied.
pub fn apply_brush(
    volume: &mut dyn VolumeSource,
    log: &mut dyn EditLog,
    center: WorldPoint,
    shape: BrushShape,
    radius: f32,
    axes: [bool; 3],
    select: bool,
) -> usize {
    let points = brush_points(center, shape, radius, axes, volume.voxel_size());
    let mut applied = 0;
    for point in points {
        if !volume.contains(point) {
            continue;
        }
        if select {
            volume.select(point);
        } else {
            volume.unselect(point);
        }
        log.add(SelectionEdit::new(point, select));
        applied += 1;
    }
    applied
}

// ============================================================================
// FLOOD SELECT
// ============================================================================

/// Connectivity and stopping rules for a flood.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FloodParams {
    /// Refuse to cross voxels marked as boundary edges by the line tool.
    pub stop_at_edges: bool,
    /// When selecting, refuse to grow into already-selected voxels.
    pub stop_at_rois: bool,
    /// Grow through all three axes; otherwise stay in `work_plane`.
    pub three_d: bool,
    /// Maximum |value − seed value| a voxel may have and still join.
    pub fuzziness: f32,
    /// Maximum world-space distance from the seed; 0 disables the limit.
    pub max_distance: f32,
    /// Axis held constant for planar floods.
    pub work_plane: Option<Axis>,
}

impl Default for FloodParams {
    fn default() -> Self {
        Self {
            stop_at_edges: false,
            stop_at_rois: false,
            three_d: true,
            fuzziness: 0.0,
            max_distance: 0.0,
            work_plane: None,
        }
    }
}

/// How a flood finished. Cancellation is a normal outcome with partial but
/// consistent effect, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FloodOutcome {
    Completed { visited: usize },
    Cancelled { visited: usize },
}

impl FloodOutcome {
    pub fn visited(&self) -> usize {
        match self {
            FloodOutcome::Completed { visited } | FloodOutcome::Cancelled { visited } => *visited,
        }
    }
}

/// Flood-select (or unselect) connected voxels starting at the seed.
///
/// Opens one named action on the log, logs one edit per visited voxel, and
/// always closes the action — including on cancellation, so the edits made
/// so far stay undoable as a unit. The traversal is an explicit worklist,
/// never call-stack recursion; `cancel` is polled every few dozen voxels
/// once the flood has run for two seconds.
pub fn flood_select(
    volume: &mut dyn VolumeSource,
    seed: WorldPoint,
    select: bool,
    params: &FloodParams,
    log: &mut dyn EditLog,
    cancel: &mut dyn FnMut() -> bool,
) -> FloodOutcome {
    flood_select_inner(volume, seed, select, params, log, cancel, FLOOD_CANCEL_AFTER)
}

fn flood_select_inner(
    volume: &mut dyn VolumeSource,
    seed: WorldPoint,
    select: bool,
    params: &FloodParams,
    log: &mut dyn EditLog,
    cancel: &mut dyn FnMut() -> bool,
    cancel_after: Duration,
) -> FloodOutcome {
    log.begin_action(if select {
        "Selection Fill"
    } else {
        "Unselection Fill"
    });

    let outcome = flood_run(volume, seed, select, params, log, cancel, cancel_after);

    log.end_action();
    outcome
}

fn flood_run(
    volume: &mut dyn VolumeSource,
    seed: WorldPoint,
    select: bool,
    params: &FloodParams,
    log: &mut dyn EditLog,
    cancel: &mut dyn FnMut() -> bool,
    cancel_after: Duration,
) -> FloodOutcome {
    let dims = volume.dims();
    let count = dims[0] as usize * dims[1] as usize * dims[2] as usize;
    if count == 0 {
        return FloodOutcome::Completed { visited: 0 };
    }

    let seed_index = match volume.world_to_index(seed) {
        Some(index) => index,
        None => return FloodOutcome::Completed { visited: 0 },
    };
    let seed_value = volume.value_at_index(seed_index);
    let max_distance_sq = params.max_distance * params.max_distance;

    let flat = |index: [i32; 3]| -> usize {
        (index[2] as usize * dims[1] as usize + index[1] as usize) * dims[0] as usize
            + index[0] as usize
    };
    let in_dims = |index: [i32; 3]| -> bool {
        (0..3).all(|a| index[a] >= 0 && (index[a] as u32) < dims[a])
    };

    // Membership test for a candidate voxel. The seed itself must pass too.
    let accepts = |volume: &dyn VolumeSource, index: [i32; 3]| -> bool {
        let world = volume.index_to_world(index);
        if params.stop_at_edges && volume.is_edge(world) {
            return false;
        }
        if params.stop_at_rois && select && volume.selection_at(world).is_some() {
            return false;
        }
        if (volume.value_at_index(index) - seed_value).abs() > params.fuzziness {
            return false;
        }
        if params.max_distance > 0.0 && distance_squared(world, seed) > max_distance_sq {
            return false;
        }
        true
    };

    if !accepts(volume, seed_index) {
        return FloodOutcome::Completed { visited: 0 };
    }

    // Offsets along the axes the flood may move through.
    let mut offsets: Vec<[i32; 3]> = Vec::with_capacity(6);
    let blocked_axis = if params.three_d {
        None
    } else {
        params.work_plane
    };
    for axis in 0..3 {
        if blocked_axis.map(|a| a.index()) == Some(axis) {
            continue;
        }
        let mut step = [0i32; 3];
        step[axis] = 1;
        offsets.push(step);
        step[axis] = -1;
        offsets.push(step);
    }

    let started = Instant::now();
    let mut visited_mask = vec![false; count];
    let mut worklist: VecDeque<[i32; 3]> = VecDeque::new();
    visited_mask[flat(seed_index)] = true;
    worklist.push_back(seed_index);

    let mut visited = 0usize;
    while let Some(index) = worklist.pop_front() {
        if visited % FLOOD_CANCEL_STRIDE == 0
            && started.elapsed() >= cancel_after
            && cancel()
        {
            return FloodOutcome::Cancelled { visited };
        }

        let world = volume.index_to_world(index);
        if select {
            volume.select(world);
        } else {
            volume.unselect(world);
        }
        log.add(SelectionEdit::new(world, select));
        visited += 1;

        for offset in &offsets {
            let next = [
                index[0] + offset[0],
                index[1] + offset[1],
                index[2] + offset[2],
            ];
            if !in_dims(next) || visited_mask[flat(next)] {
                continue;
            }
            if accepts(volume, next) {
                visited_mask[flat(next)] = true;
                worklist.push_back(next);
            }
        }
    }

    FloodOutcome::Completed { visited }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{NullLog, SelectionHistory};
    use crate::volume::GridVolume;

    fn flat_volume(dims: [u32; 3], fill: f32) -> GridVolume {
        let count = dims[0] as usize * dims[1] as usize * dims[2] as usize;
        GridVolume::from_values(dims, [1.0; 3], vec![fill; count])
    }

    #[test]
    fn square_brush_on_one_axis_is_a_1d_interval() {
        let points = brush_points(
            [5.0, 5.0, 5.0],
            BrushShape::Square,
            2.0,
            [true, false, false],
            [1.0; 3],
        );
        // 2r+1 points, boundary inclusive, no duplicates
        assert_eq!(points.len(), 5);
        let mut xs: Vec<f32> = points.iter().map(|p| p[0]).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(xs, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
        assert!(points.iter().all(|p| p[1] == 5.0 && p[2] == 5.0));
    }

    #[test]
    fn circle_brush_trims_square_corners() {
        let square = brush_points([0.0; 3], BrushShape::Square, 2.0, [true, true, false], [1.0; 3]);
        let circle = brush_points([0.0; 3], BrushShape::Circle, 2.0, [true, true, false], [1.0; 3]);
        assert_eq!(square.len(), 25);
        // 5x5 square minus the four corners at distance 2*sqrt(2) > 2
        assert_eq!(circle.len(), 21);
        assert!(circle
            .iter()
            .all(|p| p[0] * p[0] + p[1] * p[1] <= 2.0 * 2.0 + 1e-5));
    }

    #[test]
    fn zero_radius_brush_is_the_center_alone() {
        let points = brush_points([1.0; 3], BrushShape::Square, 0.0, [true, true, true], [1.0; 3]);
        assert_eq!(points, vec![[1.0, 1.0, 1.0]]);
    }

    #[test]
    fn apply_brush_selects_and_logs_each_point() {
        let mut vol = flat_volume([8, 8, 8], 0.0);
        let mut history = SelectionHistory::default();
        history.begin_action("Selection Brush");
        let applied = apply_brush(
            &mut vol,
            &mut history,
            [4.0, 4.0, 4.0],
            BrushShape::Square,
            1.0,
            [true, true, false],
            true,
        );
        history.end_action();

        assert_eq!(applied, 9);
        assert!(vol.selection_at([3.0, 3.0, 4.0]).is_some());
        assert!(vol.selection_at([4.0, 4.0, 4.0]).is_some());

        history.undo(&mut vol);
        assert!(vol.selection_at([4.0, 4.0, 4.0]).is_none());
    }

    #[test]
    fn brush_skips_points_outside_the_volume() {
        let mut vol = flat_volume([4, 4, 4], 0.0);
        let mut log = NullLog;
        let applied = apply_brush(
            &mut vol,
            &mut log,
            [0.0, 0.0, 0.0],
            BrushShape::Square,
            1.0,
            [true, true, true],
            true,
        );
        // Only the 2x2x2 corner of the 3x3x3 stamp is inside
        assert_eq!(applied, 8);
    }

    #[test]
    fn flood_fills_a_uniform_plane() {
        let mut vol = flat_volume([6, 6, 3], 1.0);
        let mut log = NullLog;
        let params = FloodParams {
            three_d: false,
            work_plane: Some(Axis::Z),
            ..FloodParams::default()
        };
        let outcome = flood_select(
            &mut vol,
            [2.0, 2.0, 1.0],
            true,
            &params,
            &mut log,
            &mut || false,
        );
        assert_eq!(outcome, FloodOutcome::Completed { visited: 36 });
        assert!(vol.selection_at([5.0, 5.0, 1.0]).is_some());
        // The other planes are untouched
        assert!(vol.selection_at([2.0, 2.0, 0.0]).is_none());
        assert!(vol.selection_at([2.0, 2.0, 2.0]).is_none());
    }

    #[test]
    fn flood_respects_fuzziness() {
        // Left half 10.0, right half 50.0
        let mut values = Vec::new();
        for _z in 0..1 {
            for _y in 0..4 {
                for x in 0..8 {
                    values.push(if x < 4 { 10.0 } else { 50.0 });
                }
            }
        }
        let mut vol = GridVolume::from_values([8, 4, 1], [1.0; 3], values);
        let mut log = NullLog;
        let params = FloodParams {
            three_d: false,
            work_plane: Some(Axis::Z),
            fuzziness: 5.0,
            ..FloodParams::default()
        };
        let outcome = flood_select(
            &mut vol,
            [1.0, 1.0, 0.0],
            true,
            &params,
            &mut log,
            &mut || false,
        );
        assert_eq!(outcome.visited(), 16);
        assert!(vol.selection_at([3.0, 3.0, 0.0]).is_some());
        assert!(vol.selection_at([4.0, 1.0, 0.0]).is_none());
    }

    #[test]
    fn flood_stops_at_edge_marks() {
        let mut vol = flat_volume([7, 3, 1], 0.0);
        for y in 0..3 {
            vol.mark_edge([3.0, y as f32, 0.0]);
        }
        let mut log = NullLog;
        let params = FloodParams {
            stop_at_edges: true,
            three_d: false,
            work_plane: Some(Axis::Z),
            ..FloodParams::default()
        };
        let outcome = flood_select(
            &mut vol,
            [1.0, 1.0, 0.0],
            true,
            &params,
            &mut log,
            &mut || false,
        );
        // Only the 3x3 region left of the wall
        assert_eq!(outcome.visited(), 9);
        assert!(vol.selection_at([3.0, 1.0, 0.0]).is_none());
        assert!(vol.selection_at([5.0, 1.0, 0.0]).is_none());
    }

    #[test]
    fn flood_max_distance_limits_growth() {
        let mut vol = flat_volume([9, 9, 1], 0.0);
        let mut log = NullLog;
        let params = FloodParams {
            three_d: false,
            work_plane: Some(Axis::Z),
            max_distance: 1.0,
            ..FloodParams::default()
        };
        let outcome = flood_select(
            &mut vol,
            [4.0, 4.0, 0.0],
            true,
            &params,
            &mut log,
            &mut || false,
        );
        // Seed plus its four in-plane neighbors
        assert_eq!(outcome.visited(), 5);
    }

    #[test]
    fn unselect_flood_inverts_and_undo_restores() {
        let mut vol = flat_volume([4, 4, 1], 0.0);
        for y in 0..4 {
            for x in 0..4 {
                vol.select([x as f32, y as f32, 0.0]);
            }
        }
        let mut history = SelectionHistory::default();
        let params = FloodParams {
            three_d: false,
            work_plane: Some(Axis::Z),
            ..FloodParams::default()
        };
        let outcome = flood_select(
            &mut vol,
            [0.0, 0.0, 0.0],
            false,
            &params,
            &mut history,
            &mut || false,
        );
        assert_eq!(outcome.visited(), 16);
        assert!(vol.selection_at([2.0, 2.0, 0.0]).is_none());
        assert_eq!(history.undo_description(), Some("Unselection Fill"));

        history.undo(&mut vol);
        assert!(vol.selection_at([2.0, 2.0, 0.0]).is_some());
    }

    #[test]
    fn flood_out_of_bounds_seed_is_a_clean_no_op() {
        let mut vol = flat_volume([4, 4, 1], 0.0);
        let mut history = SelectionHistory::default();
        let outcome = flood_select(
            &mut vol,
            [50.0, 0.0, 0.0],
            true,
            &FloodParams::default(),
            &mut history,
            &mut || false,
        );
        assert_eq!(outcome, FloodOutcome::Completed { visited: 0 });
        assert!(!history.can_undo());
    }

    #[test]
    fn cancellation_stops_early_but_closes_the_log() {
        let mut vol = flat_volume([32, 32, 1], 0.0);
        let mut history = SelectionHistory::default();
        let params = FloodParams {
            three_d: false,
            work_plane: Some(Axis::Z),
            ..FloodParams::default()
        };

        // Threshold of zero so the first poll already offers cancellation
        let outcome = flood_select_inner(
            &mut vol,
            [16.0, 16.0, 0.0],
            true,
            &params,
            &mut history,
            &mut || true,
            Duration::ZERO,
        );
        assert_eq!(outcome, FloodOutcome::Cancelled { visited: 0 });
        // Log closed cleanly with nothing recorded
        assert!(!history.can_undo());

        // Cancel on the second poll: a partial, undoable action remains
        let mut polls = 0;
        let outcome = flood_select_inner(
            &mut vol,
            [16.0, 16.0, 0.0],
            true,
            &params,
            &mut history,
            &mut || {
                polls += 1;
                polls > 1
            },
            Duration::ZERO,
        );
        let visited = outcome.visited();
        assert!(matches!(outcome, FloodOutcome::Cancelled { .. }));
        assert!(visited > 0 && visited < 32 * 32);
        assert!(history.can_undo());
        history.undo(&mut vol);
        assert!(vol.selection_at([16.0, 16.0, 0.0]).is_none());
    }

    #[test]
    fn short_floods_finish_without_polling_cancel() {
        let mut vol = flat_volume([8, 8, 1], 0.0);
        let mut log = NullLog;
        let params = FloodParams {
            three_d: false,
            work_plane: Some(Axis::Z),
            ..FloodParams::default()
        };
        // cancel() would stop immediately, but the 2 s threshold gates it
        let outcome = flood_select(
            &mut vol,
            [4.0, 4.0, 0.0],
            true,
            &params,
            &mut log,
            &mut || true,
        );
        assert_eq!(outcome, FloodOutcome::Completed { visited: 64 });
    }
}
