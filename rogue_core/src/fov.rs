//! Field of view via recursive shadowcasting.
//!
//! The area around the origin is split into eight octants; each is scanned row
//! by row outward, and every sight-blocking tile casts a shadow that narrows the
//! slope window of the rows behind it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Position,
    map::{Grid, GridError, TileGrid},
};

/// Octant transforms: `(xx, xy, yx, yy)` mapping scan-local coordinates to map deltas.
const OCTANTS: [(isize, isize, isize, isize); 8] = [
    (1, 0, 0, 1),
    (0, 1, 1, 0),
    (0, -1, 1, 0),
    (-1, 0, 0, 1),
    (-1, 0, 0, -1),
    (0, -1, -1, 0),
    (0, 1, -1, 0),
    (1, 0, 0, -1),
];

/// Which tiles are currently in view.
///
/// Rebuilt from scratch on every [`VisibilityField::compute`]; the only state
/// that outlives a recomputation is the `explored` bit written to the tiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityField {
    in_fov: Grid<bool>,
}

struct Scan {
    origin: Position,
    radius: isize,
    light_walls: bool,
}

impl VisibilityField {
    /// An empty field where nothing is visible.
    pub fn new(width: usize, height: usize) -> Self {
        VisibilityField {
            in_fov: Grid::filled(width, height, false),
        }
    }

    pub fn is_visible(&self, pos: Position) -> Result<bool, GridError> {
        self.in_fov.get(pos).copied()
    }

    /// Visible positions in row-major order.
    pub fn visible_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.in_fov
            .enumerate()
            .filter(|(_, visible)| **visible)
            .map(|(pos, _)| pos)
    }

    /// Recomputes visibility from `origin` and marks every visible tile explored.
    ///
    /// A tile is visible when it lies within `radius` (Euclidean) of the origin
    /// and no sight-blocking tile stands between them. `light_walls` decides
    /// whether the blocking tiles bounding the view are visible themselves.
    pub fn compute(
        &mut self,
        tiles: &mut TileGrid,
        origin: Position,
        radius: usize,
        light_walls: bool,
    ) -> Result<(), GridError> {
        if self.in_fov.width() != tiles.width() || self.in_fov.height() != tiles.height() {
            self.in_fov = Grid::filled(tiles.width(), tiles.height(), false);
        } else {
            self.in_fov.fill(false);
        }
        // Validates the origin before any scanning.
        self.in_fov.set(origin, true)?;

        let scan = Scan {
            origin,
            radius: radius as isize,
            light_walls,
        };
        for octant in OCTANTS {
            self.cast_light(tiles, &scan, 1, 1.0, 0.0, octant);
        }

        let visible: Vec<Position> = self.visible_positions().collect();
        debug!(x = origin.x, y = origin.y, radius, visible = visible.len(), "fov recomputed");
        for pos in visible {
            tiles.set_explored(pos, true)?;
        }
        Ok(())
    }

    fn cast_light(
        &mut self,
        tiles: &TileGrid,
        scan: &Scan,
        row: isize,
        mut start: f64,
        end: f64,
        (xx, xy, yx, yy): (isize, isize, isize, isize),
    ) {
        if start < end {
            return;
        }
        let radius_sq = scan.radius * scan.radius;
        let mut new_start = 0.0;

        for distance in row..=scan.radius {
            let dy = -distance;
            let mut blocked = false;

            for dx in -distance..=0 {
                let left_slope = (dx as f64 - 0.5) / (dy as f64 + 0.5);
                let right_slope = (dx as f64 + 0.5) / (dy as f64 - 0.5);
                if start < right_slope {
                    continue;
                }
                if end > left_slope {
                    break;
                }

                // Off-map cells behave as opaque, unlit walls.
                let cell = scan
                    .origin
                    .offset(dx * xx + dy * xy, dx * yx + dy * yy)
                    .and_then(|pos| tiles.get(pos).ok().map(|tile| (pos, tile.blocks_sight)));
                let opaque = cell.is_none_or(|(_, blocks_sight)| blocks_sight);

                if let Some((pos, _)) = cell {
                    if dx * dx + dy * dy <= radius_sq && (scan.light_walls || !opaque) {
                        if let Ok(visible) = self.in_fov.get_mut(pos) {
                            *visible = true;
                        }
                    }
                }

                if blocked {
                    if opaque {
                        new_start = right_slope;
                    } else {
                        blocked = false;
                        start = new_start;
                    }
                } else if opaque && distance < scan.radius {
                    blocked = true;
                    self.cast_light(tiles, scan, distance + 1, start, left_slope, (xx, xy, yx, yy));
                    new_start = right_slope;
                }
            }

            if blocked {
                break;
            }
        }
    }
}
