//! Connected-region boundary extraction from binary masks.

use nalgebra::Point2;

use crate::image::GrayImageView;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Clockwise 8-neighborhood in image coordinates (y grows downward).
const DELTA: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Extract the closed outer boundary of every connected region in `mask`
/// whose pixel area is at least `min_area`.
///
/// Regions are 8-connected; boundaries are traced clockwise starting from
/// the region's topmost-leftmost pixel. An empty result is valid and means
/// no region passed the area filter.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(mask), fields(width = mask.width, height = mask.height))
)]
pub fn find_contours(mask: &GrayImageView<'_>, min_area: usize) -> Vec<Vec<Point2<i32>>> {
    let (w, h) = (mask.width as i32, mask.height as i32);
    let mut labels = vec![0u32; mask.width * mask.height];
    let mut contours = Vec::new();
    let mut next_label = 0u32;

    for sy in 0..h {
        for sx in 0..w {
            let idx = (sy * w + sx) as usize;
            if !mask.is_set(sx, sy) || labels[idx] != 0 {
                continue;
            }
            next_label += 1;
            let area = flood_label(mask, &mut labels, (sx, sy), next_label);
            if area >= min_area.max(1) {
                contours.push(trace_boundary(&labels, w, h, (sx, sy), next_label, area));
            }
        }
    }
    contours
}

/// Label one 8-connected component and return its pixel area.
fn flood_label(
    mask: &GrayImageView<'_>,
    labels: &mut [u32],
    start: (i32, i32),
    label: u32,
) -> usize {
    let w = mask.width as i32;
    let mut stack = vec![start];
    labels[(start.1 * w + start.0) as usize] = label;
    let mut area = 0usize;

    while let Some((x, y)) = stack.pop() {
        area += 1;
        for (dx, dy) in DELTA {
            let (nx, ny) = (x + dx, y + dy);
            if !mask.is_set(nx, ny) {
                continue;
            }
            let nidx = (ny * w + nx) as usize;
            if labels[nidx] == 0 {
                labels[nidx] = label;
                stack.push((nx, ny));
            }
        }
    }
    area
}

/// Moore-neighbor boundary trace (radial sweep variant).
///
/// `start` must be the component's first pixel in raster order, which
/// guarantees the pixel to its west is background.
fn trace_boundary(
    labels: &[u32],
    w: i32,
    h: i32,
    start: (i32, i32),
    label: u32,
    area: usize,
) -> Vec<Point2<i32>> {
    let inside = |x: i32, y: i32| -> bool {
        x >= 0 && y >= 0 && x < w && y < h && labels[(y * w + x) as usize] == label
    };

    // Sweep clockwise from just past the backtrack direction.
    let next_boundary = |c: (i32, i32), back_dir: usize| -> Option<((i32, i32), usize)> {
        for k in 1..=8 {
            let d = (back_dir + k) % 8;
            let n = (c.0 + DELTA[d].0, c.1 + DELTA[d].1);
            if inside(n.0, n.1) {
                return Some((n, d));
            }
        }
        None
    };

    // Virtual backtrack to the west of the raster-order start pixel.
    let Some((second, _)) = next_boundary(start, 4) else {
        return vec![Point2::new(start.0, start.1)]; // single-pixel region
    };

    let mut contour = vec![Point2::new(start.0, start.1)];
    let mut current = start;
    let mut back_dir = 4usize;
    let mut steps = 0usize;

    loop {
        let Some((next, d)) = next_boundary(current, back_dir) else {
            break;
        };
        if current == start && next == second && contour.len() > 1 {
            break; // re-entered the first move: boundary closed
        }
        contour.push(Point2::new(next.0, next.1));
        back_dir = (d + 4) % 8;
        current = next;

        steps += 1;
        if steps > 4 * area + 8 {
            log::warn!("boundary trace exceeded step bound, truncating");
            break;
        }
    }

    if contour.len() > 1 && contour.last() == contour.first() {
        contour.pop();
    }
    contour
}
