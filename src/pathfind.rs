// ============================================================================
// EDGE-SNAP PATH SEARCH — minimum-cost pixel path over the view grid
// ============================================================================
//
// Recomputed from scratch on every drag update of the edge-snap line tool;
// the whole previous path is discarded. Correctness under rapid recomputation
// matters more than incremental cleverness here.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::geom::PixelPoint;

/// Added to every magnitude sample so a zero-magnitude region still prefers
/// short (diagonal) paths over meandering equal-cost ones.
pub const EDGE_COST_BIAS: f32 = 0.1;

/// Integer resolution costs are quantized to, relative to the supplied
/// cost-magnitude upper bound.
const COST_QUANTUM: f32 = 65536.0;

/// Dijkstra search over the 8-connected pixel grid of the current view.
/// Edge weight is the cost of the destination pixel, not of the move itself.
pub struct EdgePathFinder {
    width: u32,
    height: u32,
    /// Multiplier turning a float cost into an integer priority key.
    quantizer: f32,
}

impl EdgePathFinder {
    /// `max_cost` is an upper bound on the cost function's magnitude (the
    /// volume's maximum gradient magnitude plus the bias). A loose bound only
    /// costs precision, never correctness.
    pub fn new(width: u32, height: u32, max_cost: f32) -> Self {
        let bound = if max_cost.is_finite() && max_cost > 0.0 {
            max_cost
        } else {
            1.0
        };
        Self {
            width,
            height,
            quantizer: COST_QUANTUM / bound,
        }
    }

    fn in_grid(&self, p: PixelPoint) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as u32) < self.width && (p.y as u32) < self.height
    }

    fn flat(&self, p: PixelPoint) -> usize {
        p.y as usize * self.width as usize + p.x as usize
    }

    /// Quantized, strictly positive step cost.
    fn step_cost(&self, cost: f32) -> u64 {
        ((cost * self.quantizer).ceil() as u64).max(1)
    }

    /// Minimum-cost path from `start` to `end`, both inclusive.
    ///
    /// Returns an empty path when either endpoint is off the grid or the grid
    /// has zero area — callers treat that as "no snap available", not as an
    /// error. `start == end` yields the trivial single-point path.
    pub fn find_path<F>(&self, start: PixelPoint, end: PixelPoint, cost: F) -> Vec<PixelPoint>
    where
        F: Fn(PixelPoint) -> f32,
    {
        if self.width == 0 || self.height == 0 || !self.in_grid(start) || !self.in_grid(end) {
            return Vec::new();
        }
        if start == end {
            return vec![start];
        }

        let area = self.width as usize * self.height as usize;
        let mut dist = vec![u64::MAX; area];
        let mut prev = vec![u32::MAX; area];
        let mut heap: BinaryHeap<Reverse<(u64, u32)>> = BinaryHeap::new();

        let start_flat = self.flat(start);
        let end_flat = self.flat(end);
        dist[start_flat] = 0;
        heap.push(Reverse((0, start_flat as u32)));

        while let Some(Reverse((d, flat))) = heap.pop() {
            let flat = flat as usize;
            if d > dist[flat] {
                continue;
            }
            if flat == end_flat {
                break;
            }

            let here = PixelPoint::new(
                (flat % self.width as usize) as i32,
                (flat / self.width as usize) as i32,
            );
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let next = PixelPoint::new(here.x + dx, here.y + dy);
                    if !self.in_grid(next) {
                        continue;
                    }
                    let next_flat = self.flat(next);
                    let nd = d.saturating_add(self.step_cost(cost(next)));
                    if nd < dist[next_flat] {
                        dist[next_flat] = nd;
                        prev[next_flat] = flat as u32;
                        heap.push(Reverse((nd, next_flat as u32)));
                    }
                }
            }
        }

        if dist[end_flat] == u64::MAX {
            return Vec::new();
        }

        // Walk the predecessor chain back from the end.
        let mut path = Vec::new();
        let mut flat = end_flat;
        loop {
            path.push(PixelPoint::new(
                (flat % self.width as usize) as i32,
                (flat / self.width as usize) as i32,
            ));
            if flat == start_flat {
                break;
            }
            flat = prev[flat] as usize;
        }
        path.reverse();
        path
    }
}
