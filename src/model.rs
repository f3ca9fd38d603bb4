use std::f32::consts::FRAC_PI_4;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::info;

use crate::agent::{self, Agent, SpawnError};
use crate::grid::{Grid, DIFFUSION_KERNEL};

/// Simulation parameters. All of them are fixed at construction time; the
/// defaults are the reference values the model was tuned with.
#[derive(Debug, Clone)]
pub struct Config {
    /// How far an agent moves per tick.
    pub step_distance: f32,
    /// Angle between the forward probe and each side probe.
    pub sensor_angle: f32,
    /// How far ahead of the agent the probes sample.
    pub sensor_distance: f32,
    /// How far an agent turns when steering.
    pub rotation_angle: f32,
    /// Trail added to the destination cell on a successful move.
    pub deposit_amount: f32,
    /// Per-tick multiplier applied to the whole trail field.
    pub decay_factor: f32,
    /// Fraction of grid cells to populate with agents.
    pub population_fraction: f32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            step_distance: 1.0,
            sensor_angle: FRAC_PI_4,
            sensor_distance: 3.0,
            rotation_angle: FRAC_PI_4,
            deposit_amount: 5.0,
            decay_factor: 0.9,
            population_fraction: 0.1,
        }
    }
}

/// Top-level simulation state: the grid, the agents on it, and the rng that
/// drives every random decision. Agent storage order is load-bearing: moves
/// resolve in that order, so the first agent to want a contested cell gets
/// it.
#[derive(Debug)]
pub struct Model {
    agents: Vec<Agent>,
    grid: Grid,
    config: Config,
    rng: SmallRng,
    iteration: u32,
}

impl Model {
    /// Build a grid and populate it. The agent count is the configured
    /// fraction of the cell count, rounded; the spawn margin keeps every
    /// sensor probe of a fresh agent inside the grid.
    pub fn new(width: usize, height: usize, config: Config, seed: u64) -> Result<Self, SpawnError> {
        let mut grid = Grid::new(width, height);
        let mut rng = SmallRng::seed_from_u64(seed);

        let n_agents = (config.population_fraction * (width * height) as f32).round() as usize;
        let margin = config.sensor_distance + 1.0;
        let agents = agent::spawn(&mut grid, n_agents, margin, &mut rng)?;
        info!("placed {} agents on a {}x{} grid", agents.len(), width, height);

        Ok(Model {
            agents,
            grid,
            config,
            rng,
            iteration: 0,
        })
    }

    /// Perform a single simulation tick: four phases, strictly in order.
    ///
    /// Every agent moves before any agent senses, so sensing sees the full
    /// set of this tick's deposits; within the move phase agents run in
    /// storage order, which is what resolves two agents contending for the
    /// same destination cell.
    pub fn step(&mut self) {
        for agent in self.agents.iter_mut() {
            agent.advance(&mut self.grid, &self.config, &mut self.rng);
        }
        for agent in self.agents.iter_mut() {
            agent.sense(&self.grid, &self.config, &mut self.rng);
        }
        self.grid.evaporate(self.config.decay_factor);
        self.grid.diffuse(&DIFFUSION_KERNEL);
        self.iteration += 1;
    }

    /// Run the model for a number of ticks.
    pub fn run(&mut self, n_iterations: u32) {
        for _ in 0..n_iterations {
            self.step();
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }
}
