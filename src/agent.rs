use std::f32::consts::TAU;

use itertools::iproduct;
use rand::Rng;
use thiserror::Error;
use tracing::debug;

use crate::grid::Grid;
use crate::math::{Cell, Position};
use crate::model::Config;

/// Spawning failed before any sampling happened.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpawnError {
    /// More agents were requested than there are free cells inside the
    /// spawn margin. Rejection sampling would never terminate, so this is
    /// reported instead.
    #[error("requested {requested} agents but only {available} free cells inside the spawn margin")]
    Capacity { requested: usize, available: usize },
}

/// A single agent. The position is continuous; the grid only ever sees its
/// rounded cell. The heading is an angle in radians, interpreted mod 2*pi.
#[derive(Debug)]
pub struct Agent {
    pos: Position,
    heading: f32,
}

impl Agent {
    pub fn new(pos: Position, heading: f32) -> Self {
        Agent { pos, heading }
    }

    pub fn position(&self) -> Position {
        self.pos
    }

    pub fn heading(&self) -> f32 {
        self.heading
    }

    /// The cell this agent's body occupies.
    pub fn cell(&self) -> Cell {
        self.pos.cell()
    }

    /// Try to move one step along the current heading.
    ///
    /// A step that stays inside the current cell is pure sub-cell drift:
    /// the continuous position advances and the grid is untouched. A step
    /// into another cell must claim it through the grid; success deposits
    /// trail on the destination, failure (occupied or out of bounds) leaves
    /// the position alone and redraws the heading at random, so the agent
    /// tries a fresh direction next tick.
    pub fn advance(&mut self, grid: &mut Grid, config: &Config, rng: &mut impl Rng) {
        let dest = self.pos.offset(self.heading, config.step_distance);
        let from = self.pos.cell();
        let to = dest.cell();

        if from == to {
            self.pos = dest;
        } else if grid.relocate(from, to) {
            self.pos = dest;
            grid.deposit(to, config.deposit_amount);
        } else {
            self.heading = rng.gen_range(0.0..TAU);
        }
    }

    /// Steer toward the strongest trail ahead.
    ///
    /// Three probes sample the trail at the sensor distance: one straight
    /// ahead and one to each side at the sensor angle. The heading turns
    /// toward the stronger side, stays put when straight ahead is strictly
    /// strongest, and breaks the local-minimum tie (middle strictly
    /// weakest) with a random turn direction. Sensing never touches the
    /// grid or the position.
    pub fn sense(&mut self, grid: &Grid, config: &Config, rng: &mut impl Rng) {
        let probe = |angle: f32| {
            grid.trail_at(self.pos.offset(angle, config.sensor_distance).cell())
        };
        let left = probe(self.heading - config.sensor_angle);
        let middle = probe(self.heading);
        let right = probe(self.heading + config.sensor_angle);

        if middle > left && middle > right {
            // Straight ahead wins, keep going.
        } else if middle < left && middle < right {
            if rng.gen::<bool>() {
                self.heading += config.rotation_angle;
            } else {
                self.heading -= config.rotation_angle;
            }
        } else if left < right {
            self.heading += config.rotation_angle;
        } else if right < left {
            self.heading -= config.rotation_angle;
        }
    }
}

/// Populate a grid with `count` agents by rejection sampling.
///
/// Positions are drawn uniformly with both coordinates at least `margin`
/// away from every edge, redrawn until the rounded cell is free, then the
/// cell is claimed and a uniform random heading assigned. The injected rng
/// is the only source of randomness.
///
/// Before sampling starts, the free cells reachable from the margin
/// rectangle are counted; asking for more agents than that returns a
/// capacity error where the original sampling loop would spin forever.
pub fn spawn(
    grid: &mut Grid,
    count: usize,
    margin: f32,
    rng: &mut impl Rng,
) -> Result<Vec<Agent>, SpawnError> {
    let hi_x = (grid.width() as f32 - 1.0) - margin;
    let hi_y = (grid.height() as f32 - 1.0) - margin;

    let available = if hi_x < margin || hi_y < margin {
        0
    } else {
        // Rounding is monotone, so sampled positions land exactly on the
        // cells between round(margin) and round(dim - 1 - margin).
        let x_range = margin.round() as i32..=hi_x.round() as i32;
        let y_range = margin.round() as i32..=hi_y.round() as i32;
        iproduct!(y_range, x_range)
            .filter(|&(y, x)| grid.is_empty(Cell::new(x, y)))
            .count()
    };
    if count > available {
        return Err(SpawnError::Capacity {
            requested: count,
            available,
        });
    }

    let mut agents = Vec::with_capacity(count);
    for _ in 0..count {
        let pos = loop {
            let candidate = Position::new(
                rng.gen_range(margin..=hi_x),
                rng.gen_range(margin..=hi_y),
            );
            if grid.is_empty(candidate.cell()) {
                break candidate;
            }
        };
        let placed = grid.place(pos.cell());
        debug_assert!(placed);
        agents.push(Agent::new(pos, rng.gen_range(0.0..TAU)));
    }
    debug!("spawned {} agents inside margin {}", count, margin);
    Ok(agents)
}
