//! Marching squares over a 2-D scalar field.
//!
//! Coordinates are in pixel units with `x` along columns and `y` along rows,
//! so a crossing between two vertically adjacent samples has an integer `x`
//! and a fractional `y`.

use ndarray::ArrayView2;

/// Tolerance for joining segment endpoints, in pixels.
const JOIN_EPSILON: f64 = 0.001;

/// A point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A line segment between two edge crossings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

/// A connected contour polyline.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub points: Vec<Point>,
    pub closed: bool,
}

/// Run marching squares over `field` at `level`.
///
/// Every cell edge (along rows and along columns) is searched, so a field
/// that crosses the level several times in one column yields a segment for
/// each crossing. Cells touching a NaN sample are skipped.
pub fn march_squares(field: ArrayView2<'_, f64>, level: f64) -> Vec<Segment> {
    let (height, width) = field.dim();
    if width < 2 || height < 2 {
        return vec![];
    }

    let mut segments = Vec::new();

    for y in 0..(height - 1) {
        for x in 0..(width - 1) {
            let tl = field[[y, x]];
            let tr = field[[y, x + 1]];
            let bl = field[[y + 1, x]];
            let br = field[[y + 1, x + 1]];

            if tl.is_nan() || tr.is_nan() || bl.is_nan() || br.is_nan() {
                continue;
            }

            let mut cell_index = 0u8;
            if tl >= level {
                cell_index |= 1;
            }
            if tr >= level {
                cell_index |= 2;
            }
            if br >= level {
                cell_index |= 4;
            }
            if bl >= level {
                cell_index |= 8;
            }

            segments.extend(cell_segments(cell_index, x as f64, y as f64, tl, tr, br, bl, level));
        }
    }

    segments
}

#[allow(clippy::too_many_arguments)]
fn cell_segments(
    cell_index: u8,
    x: f64,
    y: f64,
    tl: f64,
    tr: f64,
    br: f64,
    bl: f64,
    level: f64,
) -> Vec<Segment> {
    let top = interpolate_edge(x, y, x + 1.0, y, tl, tr, level);
    let right = interpolate_edge(x + 1.0, y, x + 1.0, y + 1.0, tr, br, level);
    let bottom = interpolate_edge(x, y + 1.0, x + 1.0, y + 1.0, bl, br, level);
    let left = interpolate_edge(x, y, x, y + 1.0, tl, bl, level);

    let seg = |start, end| Segment { start, end };
    match cell_index {
        0 | 15 => vec![],
        1 | 14 => vec![seg(left, top)],
        2 | 13 => vec![seg(top, right)],
        3 | 12 => vec![seg(left, right)],
        4 | 11 => vec![seg(right, bottom)],
        // Saddles: two separate segments
        5 => vec![seg(left, top), seg(right, bottom)],
        6 | 9 => vec![seg(top, bottom)],
        7 | 8 => vec![seg(left, bottom)],
        10 => vec![seg(top, right), seg(left, bottom)],
        _ => vec![],
    }
}

/// Linear interpolation of where `level` crosses between two samples.
fn interpolate_edge(x1: f64, y1: f64, x2: f64, y2: f64, val1: f64, val2: f64, level: f64) -> Point {
    if (val2 - val1).abs() < 1e-12 {
        return Point::new((x1 + x2) / 2.0, (y1 + y2) / 2.0);
    }

    let t = ((level - val1) / (val2 - val1)).clamp(0.0, 1.0);
    Point::new(x1 + t * (x2 - x1), y1 + t * (y2 - y1))
}

/// Join segments that share endpoints into polylines.
///
/// Polylines are grown from both ends, so the result does not depend on
/// which segment of an open contour happens to be found first.
pub fn connect_segments(segments: &[Segment]) -> Vec<Polyline> {
    let mut polylines = Vec::new();
    let mut used = vec![false; segments.len()];

    for start_idx in 0..segments.len() {
        if used[start_idx] {
            continue;
        }
        used[start_idx] = true;

        let mut points = std::collections::VecDeque::new();
        points.push_back(segments[start_idx].start);
        points.push_back(segments[start_idx].end);

        let mut changed = true;
        while changed {
            changed = false;
            for (i, seg) in segments.iter().enumerate() {
                if used[i] {
                    continue;
                }
                let (Some(&head), Some(&tail)) = (points.front(), points.back()) else {
                    break;
                };

                if seg.start.distance(&tail) < JOIN_EPSILON {
                    points.push_back(seg.end);
                } else if seg.end.distance(&tail) < JOIN_EPSILON {
                    points.push_back(seg.start);
                } else if seg.end.distance(&head) < JOIN_EPSILON {
                    points.push_front(seg.start);
                } else if seg.start.distance(&head) < JOIN_EPSILON {
                    points.push_front(seg.end);
                } else {
                    continue;
                }
                used[i] = true;
                changed = true;
            }
        }

        let mut points: Vec<Point> = points.into_iter().collect();
        points.dedup_by(|a, b| a.distance(b) < JOIN_EPSILON);

        let closed = points.len() > 2
            && points
                .first()
                .zip(points.last())
                .map_or(false, |(f, l)| f.distance(l) < JOIN_EPSILON);

        polylines.push(Polyline { points, closed });
    }

    polylines
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_no_crossing_above_max() {
        let field = array![[1.0, 2.0], [3.0, 4.0]];
        assert!(march_squares(field.view(), 5.0).is_empty());
    }

    #[test]
    fn test_single_cell_interpolation() {
        // Level 5 between 0 and 10 on every edge touching the top-left corner
        let field = array![[10.0, 0.0], [0.0, 0.0]];
        let segments = march_squares(field.view(), 5.0);
        assert_eq!(segments.len(), 1);
        let seg = segments[0];
        assert_eq!(seg.start, Point::new(0.0, 0.5));
        assert_eq!(seg.end, Point::new(0.5, 0.0));
    }

    #[test]
    fn test_nan_cells_skipped() {
        let field = array![[10.0, f64::NAN], [0.0, 0.0]];
        assert!(march_squares(field.view(), 5.0).is_empty());
    }

    #[test]
    fn test_connect_open_line_from_middle() {
        let segments = vec![
            Segment { start: Point::new(1.0, 0.0), end: Point::new(2.0, 0.0) },
            Segment { start: Point::new(0.0, 0.0), end: Point::new(1.0, 0.0) },
            Segment { start: Point::new(2.0, 0.0), end: Point::new(3.0, 0.0) },
        ];
        let lines = connect_segments(&segments);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].points.len(), 4);
        assert_eq!(lines[0].points[0], Point::new(0.0, 0.0));
        assert!(!lines[0].closed);
    }

    #[test]
    fn test_connect_closed_ring() {
        let field = array![[0.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 0.0]];
        let lines = connect_segments(&march_squares(field.view(), 5.0));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].closed, "ring around a peak should close");
    }
}
