// ============================================================================
// ANNOTATIONS — straight lines and snapped ("snake") paths
// ============================================================================

use crate::geom::{points_on_segment, WorldPoint};
use crate::pathfind::{EdgePathFinder, EDGE_COST_BIAS};
use crate::view::{PixelToWorld, ViewState};
use crate::volume::VolumeSource;

/// A finished or in-progress straight line between two world coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line {
    pub begin: WorldPoint,
    pub end: WorldPoint,
}

/// An edge-snapped path: a fixed anchor plus the snapped point sequence,
/// recomputed wholesale on every drag until finalized.
#[derive(Clone, Debug, PartialEq)]
pub struct SnakeLine {
    pub begin: WorldPoint,
    pub points: Vec<WorldPoint>,
}

impl SnakeLine {
    /// Last point of the path, or the anchor while the path is still empty.
    pub fn end(&self) -> WorldPoint {
        self.points.last().copied().unwrap_or(self.begin)
    }
}

/// Ordered collections of finished and in-progress annotations, owned by the
/// layer. At most one unfinished line and one unfinished snake at a time.
#[derive(Default)]
pub struct AnnotationStore {
    lines: Vec<Line>,
    snake_lines: Vec<SnakeLine>,
    current_line: Option<Line>,
    current_snake: Option<SnakeLine>,
}

impl AnnotationStore {
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn snake_lines(&self) -> &[SnakeLine] {
        &self.snake_lines
    }

    pub fn current_line(&self) -> Option<&Line> {
        self.current_line.as_ref()
    }

    pub fn current_snake(&self) -> Option<&SnakeLine> {
        self.current_snake.as_ref()
    }

    /// Append an already-finished line (host-provided or test fixture).
    pub fn push_line(&mut self, begin: WorldPoint, end: WorldPoint) {
        self.lines.push(Line { begin, end });
    }

    /// Append an already-finished snapped path.
    pub fn push_snake(&mut self, begin: WorldPoint, points: Vec<WorldPoint>) {
        self.snake_lines.push(SnakeLine { begin, points });
    }

    // -- straight line lifecycle ---------------------------------------------

    /// Pointer down: a zero-length line at the pointer. Replaces any line
    /// left unfinished by a lost up-event.
    pub fn start_line(&mut self, world: WorldPoint) {
        self.current_line = Some(Line {
            begin: world,
            end: world,
        });
    }

    /// Pointer drag: only the end point moves.
    pub fn stretch_line(&mut self, world: WorldPoint) {
        if let Some(line) = self.current_line.as_mut() {
            line.end = world;
        }
    }

    /// Pointer up: finalize. The line joins the store, and every pixel on
    /// its rasterized segment is translated back to world space and marked
    /// as an edge in the volume, so floods can stop at drawn boundaries.
    pub fn end_line(
        &mut self,
        world: WorldPoint,
        translator: &dyn PixelToWorld,
        volume: &mut dyn VolumeSource,
    ) {
        if let Some(mut line) = self.current_line.take() {
            line.end = world;

            let from = translator.world_to_pixel(line.begin);
            let to = translator.world_to_pixel(line.end);
            for p in points_on_segment(from, to) {
                volume.mark_edge(translator.pixel_to_world(p));
            }

            self.lines.push(line);
        }
    }

    // -- snake line lifecycle --------------------------------------------------

    /// Pointer down: anchor the path at the pointer with no points yet.
    pub fn start_snake(&mut self, world: WorldPoint) {
        self.current_snake = Some(SnakeLine {
            begin: world,
            points: Vec::new(),
        });
    }

    /// Pointer drag: recompute the whole snapped path between the anchor and
    /// the pointer. The previous points are discarded, never patched. An
    /// empty search result means "no snap available" and clears the points.
    pub fn stretch_snake(
        &mut self,
        world: WorldPoint,
        view: &ViewState,
        translator: &dyn PixelToWorld,
        volume: &dyn VolumeSource,
    ) {
        if let Some(snake) = self.current_snake.as_mut() {
            let finder = EdgePathFinder::new(
                view.width,
                view.height,
                volume.magnitude_max() + EDGE_COST_BIAS,
            );
            let begin = translator.world_to_pixel(snake.begin);
            let end = translator.world_to_pixel(world);

            let path = finder.find_path(begin, end, |p| {
                volume.magnitude_at(translator.pixel_to_world(p)) + EDGE_COST_BIAS
            });

            snake.points = path
                .into_iter()
                .map(|p| translator.pixel_to_world(p))
                .collect();
        }
    }

    /// Pointer up: finalize as-is, no further recomputation.
    pub fn end_snake(&mut self) {
        if let Some(snake) = self.current_snake.take() {
            self.snake_lines.push(snake);
        }
    }
}
