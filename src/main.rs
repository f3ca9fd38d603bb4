use indicatif::ProgressBar;

use moldgrid::model::{Config, Model};
use moldgrid::render;

fn main() {
    tracing_subscriber::fmt::init();

    // Size of the grid
    let (width, height) = (256, 256);

    // # of ticks to run
    let n_iterations = 1024;

    // Seed for the whole run; change it for a different pattern
    let seed = 0x5EED;

    let mut model = Model::new(width, height, Config::default(), seed)
        .expect("grid too small for the configured population");

    let progress = ProgressBar::new(n_iterations);
    for _ in 0..n_iterations {
        model.step();
        progress.inc(1);
    }
    progress.finish();

    // Export snapshots of the final state
    println!("Writing snapshots...");
    render::trail_image(model.grid())
        .save("trail.png")
        .expect("failed to write trail.png");
    render::occupancy_image(model.grid())
        .save("agents.png")
        .expect("failed to write agents.png");
    println!("Done!");
}
