use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use tap_detect_core::{find_contours, simplify_closed, GrayImageView};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Which geometric rule produced a candidate.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TipKind {
    /// A single sharp convex vertex.
    Corner,
    /// Midpoint of a short, nearly horizontal convex edge (a flat tip).
    ColumnMidpoint,
}

/// One probable finger tip, valid only for the frame that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FingerTipCandidate {
    pub position: Point2<f32>,
    pub kind: TipKind,
}

/// Tuning for [`find_finger_tips`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FingerTipParams {
    /// Contours below this pixel area are treated as noise.
    pub min_hand_area: usize,
    /// Polygon simplification tolerance, in pixels.
    pub simplify_tolerance: f64,
    /// A corner vertex counts only if the cosine between its two edge
    /// vectors stays below this value.
    pub corner_cos_max: f32,
    /// A column edge counts only if its slope magnitude stays below this.
    pub flat_slope_max: f32,
    /// Expected finger-tip width, in working-frame pixels.
    pub finger_tip_width: f32,
    /// Accepted column edge length, as multiples of `finger_tip_width`.
    pub width_ratio_min: f32,
    pub width_ratio_max: f32,
}

impl Default for FingerTipParams {
    fn default() -> Self {
        Self {
            min_hand_area: 300,
            simplify_tolerance: 5.0,
            corner_cos_max: 0.7,
            flat_slope_max: 0.25,
            finger_tip_width: 15.0,
            width_ratio_min: 0.5,
            width_ratio_max: 2.0,
        }
    }
}

/// Extract finger-tip candidates from a binary hand silhouette.
///
/// Every sufficiently large contour is simplified and scanned vertex by
/// vertex; the corner rule and the column rule run independently and may
/// both fire on the same vertex pair. Stateless: identical inputs produce
/// identical candidate lists.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(width = mask.width, height = mask.height))
)]
pub fn find_finger_tips(
    mask: &GrayImageView<'_>,
    params: &FingerTipParams,
) -> Vec<FingerTipCandidate> {
    let contours = find_contours(mask, params.min_hand_area);
    if contours.is_empty() {
        return Vec::new();
    }

    let mut tips = Vec::new();
    for contour in &contours {
        let poly = simplify_closed(contour, params.simplify_tolerance);
        tips.extend(tips_of_polygon(mask, &poly, params));
    }
    log::debug!(
        "{} finger tip candidate(s) from {} contour(s)",
        tips.len(),
        contours.len()
    );
    tips
}

fn tips_of_polygon(
    mask: &GrayImageView<'_>,
    poly: &[Point2<i32>],
    params: &FingerTipParams,
) -> Vec<FingerTipCandidate> {
    let n = poly.len();
    if n < 3 {
        return Vec::new();
    }

    let convex: Vec<bool> = (0..n).map(|i| is_convex(mask, poly, i)).collect();
    let mut tips = Vec::new();

    for i in 0..n {
        let p = to_f32(poly[i]);
        let prev = to_f32(poly[(i + n - 1) % n]);
        let next = to_f32(poly[(i + 1) % n]);
        let diff_p = prev - p;
        let diff_n = next - p;

        // Corner rule: a sharp local bottom with both neighbors above.
        if convex[i]
            && diff_p.y < 0.0
            && diff_n.y < 0.0
            && edge_cos(diff_p, diff_n).is_some_and(|c| c < params.corner_cos_max)
        {
            tips.push(FingerTipCandidate {
                position: p,
                kind: TipKind::Corner,
            });
        }

        // Column rule: a flat tip rendered as a short horizontal edge.
        let j = (i + 1) % n;
        if convex[i] && convex[j] {
            let q = next;
            let q_next = to_f32(poly[(j + 1) % n]);
            let edge = q - p;
            let dist = edge.norm();
            // f32 division keeps vertical edges at +-inf instead of faulting
            let slope = edge.y / edge.x;

            if diff_p.y <= 0.0
                && (q_next - q).y <= 0.0
                && slope.abs() < params.flat_slope_max
                && dist >= params.width_ratio_min * params.finger_tip_width
                && dist <= params.width_ratio_max * params.finger_tip_width
            {
                tips.push(FingerTipCandidate {
                    position: Point2::from((p.coords + q.coords) / 2.0),
                    kind: TipKind::ColumnMidpoint,
                });
            }
        }
    }
    tips
}

/// Convexity anchored to the filled mask.
///
/// A vertex is convex when the incenter of the triangle it forms with its
/// neighbors lies strictly above it (the hand fills upward from a tip) and
/// the mask pixel one step from the vertex toward the incenter is part of
/// the hand. The second half tolerates simplification artifacts where the
/// polygon vertex drifts slightly off the silhouette.
fn is_convex(mask: &GrayImageView<'_>, poly: &[Point2<i32>], i: usize) -> bool {
    let n = poly.len();
    let p = to_f32(poly[i]);
    let prev = to_f32(poly[(i + n - 1) % n]);
    let next = to_f32(poly[(i + 1) % n]);

    let Some(inc) = incenter(p, prev, next) else {
        return false;
    };
    if inc.y >= p.y {
        return false;
    }

    let (dx, dy) = octant_step(inc - p);
    mask.is_set(poly[i].x + dx, poly[i].y + dy)
}

/// Incenter of the triangle `(p, a, b)`; `None` for degenerate triangles.
fn incenter(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> Option<Point2<f32>> {
    let w_p = (b - a).norm(); // side opposite p
    let w_a = (b - p).norm();
    let w_b = (a - p).norm();
    let sum = w_p + w_a + w_b;
    if sum == 0.0 {
        return None;
    }
    Some(Point2::from(
        (p.coords * w_p + a.coords * w_a + b.coords * w_b) / sum,
    ))
}

/// Quantize a direction to one of the 8 compass steps.
fn octant_step(dir: Vector2<f32>) -> (i32, i32) {
    const STEPS: [(i32, i32); 8] = [
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
        (-1, 0),
        (-1, -1),
        (0, -1),
        (1, -1),
    ];
    let angle = dir.y.atan2(dir.x);
    let sector = (angle / std::f32::consts::FRAC_PI_4).round() as i32;
    STEPS[sector.rem_euclid(8) as usize]
}

/// Cosine of the angle between two edge vectors; `None` if either is zero.
fn edge_cos(a: Vector2<f32>, b: Vector2<f32>) -> Option<f32> {
    let na = a.norm();
    let nb = b.norm();
    if na == 0.0 || nb == 0.0 {
        return None;
    }
    Some(a.dot(&b) / (na * nb))
}

fn to_f32(p: Point2<i32>) -> Point2<f32> {
    Point2::new(p.x as f32, p.y as f32)
}
