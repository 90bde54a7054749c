//! Closed-polygon simplification (Ramer-Douglas-Peucker).

use nalgebra::Point2;

/// Simplify a closed contour with the Ramer-Douglas-Peucker algorithm.
///
/// The polygon is split at its first vertex and the vertex farthest from it,
/// and each open chain is simplified independently; vertices farther than
/// `tolerance` from the chord of their chain survive. Output keeps the input
/// orientation and has at most as many vertices as the input.
pub fn simplify_closed(contour: &[Point2<i32>], tolerance: f64) -> Vec<Point2<i32>> {
    if contour.len() < 3 {
        return contour.to_vec();
    }

    let first = contour[0];
    let (far, far_dist) = contour
        .iter()
        .enumerate()
        .map(|(i, p)| (i, sq_dist(*p, first)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).expect("finite distance"))
        .expect("non-empty contour");
    if far_dist == 0.0 {
        return vec![first]; // degenerate: every vertex coincides
    }

    let mut half_a = rdp_chain(&contour[..=far], tolerance);
    let mut back: Vec<Point2<i32>> = contour[far..].to_vec();
    back.push(first);
    let half_b = rdp_chain(&back, tolerance);

    // Chains share their endpoints; drop the duplicates when joining.
    half_a.pop();
    half_a.extend_from_slice(&half_b[..half_b.len() - 1]);
    half_a
}

/// RDP over an open chain, keeping both endpoints.
fn rdp_chain(points: &[Point2<i32>], tolerance: f64) -> Vec<Point2<i32>> {
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;
    rdp_mark(points, 0, points.len() - 1, tolerance, &mut keep);
    points
        .iter()
        .zip(&keep)
        .filter_map(|(p, &k)| k.then_some(*p))
        .collect()
}

fn rdp_mark(points: &[Point2<i32>], lo: usize, hi: usize, tolerance: f64, keep: &mut [bool]) {
    if hi <= lo + 1 {
        return;
    }
    let (mut worst, mut worst_dist) = (lo, 0.0f64);
    for i in lo + 1..hi {
        let d = perp_dist(points[i], points[lo], points[hi]);
        if d > worst_dist {
            worst = i;
            worst_dist = d;
        }
    }
    if worst_dist > tolerance {
        keep[worst] = true;
        rdp_mark(points, lo, worst, tolerance, keep);
        rdp_mark(points, worst, hi, tolerance, keep);
    }
}

fn sq_dist(a: Point2<i32>, b: Point2<i32>) -> f64 {
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    dx * dx + dy * dy
}

/// Distance from `p` to the segment `a..b`; plain distance when `a == b`.
fn perp_dist(p: Point2<i32>, a: Point2<i32>, b: Point2<i32>) -> f64 {
    let len = sq_dist(a, b).sqrt();
    if len == 0.0 {
        return sq_dist(p, a).sqrt();
    }
    let cross = ((b.x - a.x) as f64 * (a.y - p.y) as f64
        - (a.x - p.x) as f64 * (b.y - a.y) as f64)
        .abs();
    cross / len
}
