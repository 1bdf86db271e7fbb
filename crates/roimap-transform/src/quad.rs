//! Overlap test between a rectangle and a projected quadrilateral.

use crate::region::Roi;
use roimap_core::Pt2;

const MIN_AREA: f64 = 1e-9;

/// Signed shoelace area; positive for counter-clockwise in a y-up frame.
fn signed_area(poly: &[Pt2]) -> f64 {
    let n = poly.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        acc += a.x * b.y - b.x * a.y;
    }
    0.5 * acc
}

fn cross(a: &Pt2, b: &Pt2, p: &Pt2) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn intersect(s: &Pt2, e: &Pt2, a: &Pt2, b: &Pt2) -> Pt2 {
    let ds = cross(a, b, s);
    let de = cross(a, b, e);
    let denom = ds - de;
    if denom.abs() < f64::EPSILON {
        return *e;
    }
    let t = ds / denom;
    Pt2::new(s.x + t * (e.x - s.x), s.y + t * (e.y - s.y))
}

/// Sutherland-Hodgman clipping of `subject` against the convex `clip` polygon.
fn clip_convex(subject: &[Pt2], clip: &[Pt2]) -> Vec<Pt2> {
    let orientation = signed_area(clip).signum();
    let inside = |a: &Pt2, b: &Pt2, p: &Pt2| orientation * cross(a, b, p) >= 0.0;

    let mut output = subject.to_vec();
    for i in 0..clip.len() {
        if output.is_empty() {
            break;
        }
        let (a, b) = (clip[i], clip[(i + 1) % clip.len()]);
        let input = std::mem::take(&mut output);
        for j in 0..input.len() {
            let e = input[j];
            let s = input[(j + input.len() - 1) % input.len()];
            match (inside(&a, &b, &s), inside(&a, &b, &e)) {
                (true, true) => output.push(e),
                (true, false) => output.push(intersect(&s, &e, &a, &b)),
                (false, true) => {
                    output.push(intersect(&s, &e, &a, &b));
                    output.push(e);
                }
                (false, false) => {}
            }
        }
    }
    output
}

/// True when more than `min_ratio` of `roi`'s area lies inside `quad`.
///
/// `quad` must be convex and may be wound either way. Non-finite vertices,
/// an empty ROI or a degenerate quad give `false`.
pub fn roi_inside_quad(quad: &[Pt2; 4], roi: &Roi, min_ratio: f64) -> bool {
    if quad.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) || !min_ratio.is_finite() {
        return false;
    }
    let roi_area = roi.area();
    if roi.width <= 0 || roi.height <= 0 || roi_area < MIN_AREA {
        return false;
    }
    if signed_area(quad).abs() < MIN_AREA {
        return false;
    }
    let clipped = clip_convex(&roi.corners(), quad);
    let overlap = signed_area(&clipped).abs();
    overlap / roi_area > min_ratio
}
