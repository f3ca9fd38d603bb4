use image::GrayImage;
use itertools::iproduct;
use rayon::prelude::*;

use crate::grid::Grid;
use crate::math::Cell;

/// Render the trail field as a grayscale image, brightest at the strongest
/// concentration. Works on a read-only snapshot of the grid; rows are
/// filled in parallel.
pub fn trail_image(grid: &Grid) -> GrayImage {
    let (w, h) = (grid.width(), grid.height());
    let max = iproduct!(0..h, 0..w)
        .map(|(y, x)| grid.trail_at(Cell::new(x as i32, y as i32)))
        .fold(0.0_f32, f32::max);
    let scale = if max > 0.0 { 255.0 / max } else { 0.0 };

    let mut buf = vec![0u8; w * h];
    buf.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for (x, pixel) in row.iter_mut().enumerate() {
            let value = grid.trail_at(Cell::new(x as i32, y as i32));
            *pixel = (value * scale) as u8;
        }
    });
    GrayImage::from_raw(w as u32, h as u32, buf).expect("buffer matches image dimensions")
}

/// Render agent bodies, black on white.
pub fn occupancy_image(grid: &Grid) -> GrayImage {
    let (w, h) = (grid.width(), grid.height());
    let mut buf = vec![0u8; w * h];
    buf.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for (x, pixel) in row.iter_mut().enumerate() {
            let occupied = grid.is_occupied(Cell::new(x as i32, y as i32));
            *pixel = if occupied { 0 } else { 255 };
        }
    });
    GrayImage::from_raw(w as u32, h as u32, buf).expect("buffer matches image dimensions")
}
