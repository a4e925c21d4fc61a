//! One-dimensional interval helpers over page coordinates.
//!
//! Spans are serialized as two-element arrays and may arrive with their
//! endpoints in either order; every helper normalizes first.

/// A closed interval `[a, b]` on one page axis.
pub type Span = [f64; 2];

/// A bounding box `[x0, y0, x1, y1]`.
pub type BBox = [f64; 4];

/// Endpoints in ascending order.
pub fn bounds(span: &Span) -> (f64, f64) {
    if span[0] <= span[1] {
        (span[0], span[1])
    } else {
        (span[1], span[0])
    }
}

pub fn midpoint(span: &Span) -> f64 {
    (span[0] + span[1]) / 2.0
}

/// Whether `x` falls inside `span`, widened by `epsilon` on both sides.
pub fn contains(span: &Span, x: f64, epsilon: f64) -> bool {
    let (lo, hi) = bounds(span);
    x >= lo - epsilon && x <= hi + epsilon
}

/// Interior overlap. Spans that merely touch at an endpoint do not overlap.
pub fn overlaps(a: &Span, b: &Span) -> bool {
    let (a_lo, a_hi) = bounds(a);
    let (b_lo, b_hi) = bounds(b);
    a_lo < b_hi && b_lo < a_hi
}

pub fn bbox_x_span(bbox: &BBox) -> Span {
    [bbox[0], bbox[2]]
}

pub fn bbox_x_mid(bbox: &BBox) -> f64 {
    midpoint(&bbox_x_span(bbox))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_spans_do_not_overlap() {
        assert!(!overlaps(&[0.0, 10.0], &[10.0, 20.0]));
        assert!(overlaps(&[0.0, 10.5], &[10.0, 20.0]));
    }

    #[test]
    fn reversed_endpoints_are_normalized() {
        assert!(contains(&[20.0, 10.0], 15.0, 0.0));
        assert!(overlaps(&[20.0, 10.0], &[12.0, 13.0]));
    }

    #[test]
    fn epsilon_widens_containment() {
        assert!(!contains(&[10.0, 20.0], 21.0, 0.5));
        assert!(contains(&[10.0, 20.0], 21.0, 1.0));
    }

    #[test]
    fn bbox_midpoint_uses_x_axis() {
        assert_eq!(bbox_x_mid(&[100.0, 5.0, 140.0, 900.0]), 120.0);
    }
}
