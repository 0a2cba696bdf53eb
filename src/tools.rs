// ============================================================================
// TOOLS — pointer event dispatch to the active editing tool
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::annotations::AnnotationStore;
use crate::geom::WorldPoint;
use crate::history::EditLog;
use crate::region::{self, BrushShape, FloodParams};
use crate::view::{PixelToWorld, ViewState};
use crate::volume::VolumeSource;

/// Value written by the voxel-edit tool.
const VOXEL_EDIT_VALUE: f32 = 255.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tool {
    #[default]
    VoxelEdit,
    RegionEdit,
    Line,
    EdgeLine,
}

impl Tool {
    pub fn label(&self) -> &'static str {
        match self {
            Tool::VoxelEdit => "voxel edit",
            Tool::RegionEdit => "region edit",
            Tool::Line => "line",
            Tool::EdgeLine => "edge line",
        }
    }

    pub fn all() -> &'static [Tool] {
        &[Tool::VoxelEdit, Tool::RegionEdit, Tool::Line, Tool::EdgeLine]
    }
}

/// Shared tool settings, edited out-of-band and read at dispatch time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolOptions {
    pub brush_shape: BrushShape,
    pub brush_radius: f32,
    /// Let the brush reach through the slice normal as well.
    pub brush_3d: bool,
    pub flood_stop_at_edges: bool,
    pub flood_stop_at_rois: bool,
    pub flood_3d: bool,
    pub flood_fuzziness: f32,
    pub flood_max_distance: f32,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            brush_shape: BrushShape::Square,
            brush_radius: 1.0,
            brush_3d: false,
            flood_stop_at_edges: false,
            flood_stop_at_rois: false,
            flood_3d: false,
            flood_fuzziness: 0.0,
            flood_max_distance: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerButton {
    Primary,
    Secondary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerPhase {
    Down,
    Drag,
    Up,
}

/// One pointer event, already translated into world space by the caller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub button: PointerButton,
    pub phase: PointerPhase,
    pub shift: bool,
    pub world: WorldPoint,
}

impl PointerEvent {
    pub fn new(button: PointerButton, phase: PointerPhase, world: WorldPoint) -> Self {
        Self {
            button,
            phase,
            shift: false,
            world,
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }
}

/// Route one pointer event to the active tool.
///
/// The primary button selects (or draws), the secondary button unselects.
/// Brush strokes open one undoable action on pointer down and close it on
/// pointer up, so a whole stroke reverts as a unit.
#[allow(clippy::too_many_arguments)]
pub fn handle_pointer(
    annotations: &mut AnnotationStore,
    event: &PointerEvent,
    tool: Tool,
    opts: &ToolOptions,
    view: &ViewState,
    translator: &dyn PixelToWorld,
    volume: &mut dyn VolumeSource,
    log: &mut dyn EditLog,
    cancel: &mut dyn FnMut() -> bool,
) {
    match tool {
        Tool::VoxelEdit => {
            if event.phase == PointerPhase::Down && event.button == PointerButton::Primary {
                volume.set_value_at(event.world, VOXEL_EDIT_VALUE);
            }
        }
        Tool::RegionEdit => {
            let select = event.button == PointerButton::Primary;
            if event.shift {
                if event.phase == PointerPhase::Down {
                    let params = FloodParams {
                        stop_at_edges: opts.flood_stop_at_edges,
                        stop_at_rois: opts.flood_stop_at_rois,
                        three_d: opts.flood_3d,
                        fuzziness: opts.flood_fuzziness,
                        max_distance: opts.flood_max_distance,
                        work_plane: if opts.flood_3d {
                            None
                        } else {
                            Some(view.in_plane)
                        },
                    };
                    region::flood_select(volume, event.world, select, &params, log, cancel);
                }
                return;
            }
            match event.phase {
                PointerPhase::Down => {
                    log.begin_action(if select {
                        "Selection Brush"
                    } else {
                        "Unselection Brush"
                    });
                    brush_at(event.world, select, opts, view, volume, log);
                }
                PointerPhase::Drag => {
                    brush_at(event.world, select, opts, view, volume, log);
                }
                PointerPhase::Up => log.end_action(),
            }
        }
        Tool::Line => {
            if event.button != PointerButton::Primary {
                return;
            }
            match event.phase {
                PointerPhase::Down => annotations.start_line(event.world),
                PointerPhase::Drag => annotations.stretch_line(event.world),
                PointerPhase::Up => annotations.end_line(event.world, translator, volume),
            }
        }
        Tool::EdgeLine => {
            if event.button != PointerButton::Primary {
                return;
            }
            match event.phase {
                PointerPhase::Down => annotations.start_snake(event.world),
                PointerPhase::Drag => {
                    annotations.stretch_snake(event.world, view, translator, volume)
                }
                PointerPhase::Up => annotations.end_snake(),
            }
        }
    }
}

/// One brush stamp. With the 3D option off, the axis normal to the current
/// slice is held fixed so the brush stays in plane.
fn brush_at(
    world: WorldPoint,
    select: bool,
    opts: &ToolOptions,
    view: &ViewState,
    volume: &mut dyn VolumeSource,
    log: &mut dyn EditLog,
) {
    let mut axes = [true; 3];
    if !opts.brush_3d {
        axes[view.in_plane.index()] = false;
    }
    region::apply_brush(
        volume,
        log,
        world,
        opts.brush_shape,
        opts.brush_radius,
        axes,
        select,
    );
}
