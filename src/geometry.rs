use opencv::core::{Point2f, Vector};

use crate::error::{ExtractorError, Result};

pub const CORNER_LABELS: [&str; 4] = ["TL", "TR", "BR", "BL"];

/// Corners closer than this (image px) count as the same point.
const MIN_CORNER_DISTANCE: f32 = 0.5;
const MIN_AREA: f32 = 1.0;

/// Four corners in TL, TR, BR, BL order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub corners: [Point2f; 4],
}

impl Quad {
    pub fn tl(&self) -> Point2f {
        self.corners[0]
    }

    pub fn tr(&self) -> Point2f {
        self.corners[1]
    }

    pub fn br(&self) -> Point2f {
        self.corners[2]
    }

    pub fn bl(&self) -> Point2f {
        self.corners[3]
    }

    /// Unsigned shoelace area.
    pub fn area(&self) -> f32 {
        let c = &self.corners;
        let twice: f32 = (0..4)
            .map(|i| {
                let j = (i + 1) % 4;
                c[i].x * c[j].y - c[j].x * c[i].y
            })
            .sum();
        twice.abs() / 2.0
    }

    pub fn validate(&self) -> Result<()> {
        if self
            .corners
            .iter()
            .any(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(ExtractorError::DegenerateQuad(
                "corner coordinates must be finite".into(),
            ));
        }
        for i in 0..4 {
            for j in (i + 1)..4 {
                if distance(self.corners[i], self.corners[j]) < MIN_CORNER_DISTANCE {
                    return Err(ExtractorError::DegenerateQuad(format!(
                        "{} and {} coincide",
                        CORNER_LABELS[i], CORNER_LABELS[j]
                    )));
                }
            }
        }
        let area = self.area();
        if area < MIN_AREA {
            return Err(ExtractorError::DegenerateQuad(format!(
                "area {area:.2} px² is too small"
            )));
        }
        Ok(())
    }

    pub fn to_vector(&self) -> Vector<Point2f> {
        Vector::from_iter(self.corners)
    }
}

pub fn distance(a: Point2f, b: Point2f) -> f32 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Sort four points into TL, TR, BR, BL.
///
/// TL has the smallest `x + y` and BR the largest; TR has the smallest
/// `y - x` and BL the largest. Ties go to the earliest input point.
pub fn order_points(points: &[Point2f]) -> Result<Quad> {
    if points.len() != 4 {
        return Err(ExtractorError::PointCount(points.len()));
    }
    let sum = |p: &Point2f| p.x + p.y;
    let diff = |p: &Point2f| p.y - p.x;

    let tl = arg_extreme(points, sum, |a, b| a < b);
    let br = arg_extreme(points, sum, |a, b| a > b);
    let tr = arg_extreme(points, diff, |a, b| a < b);
    let bl = arg_extreme(points, diff, |a, b| a > b);

    Ok(Quad {
        corners: [points[tl], points[tr], points[br], points[bl]],
    })
}

fn arg_extreme<K, B>(points: &[Point2f], key: K, better: B) -> usize
where
    K: Fn(&Point2f) -> f32,
    B: Fn(f32, f32) -> bool,
{
    let mut best = 0;
    for (i, p) in points.iter().enumerate().skip(1) {
        if better(key(p), key(&points[best])) {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f32, y: f32) -> Point2f {
        Point2f::new(x, y)
    }

    #[test]
    fn orders_shuffled_rectangle() {
        let points = [pt(300.0, 80.0), pt(10.0, 10.0), pt(12.0, 85.0), pt(295.0, 5.0)];
        let quad = order_points(&points).unwrap();
        assert_eq!(quad.tl(), pt(10.0, 10.0));
        assert_eq!(quad.tr(), pt(295.0, 5.0));
        assert_eq!(quad.br(), pt(300.0, 80.0));
        assert_eq!(quad.bl(), pt(12.0, 85.0));
    }

    #[test]
    fn orders_tilted_quad() {
        let points = [pt(40.0, 120.0), pt(220.0, 30.0), pt(20.0, 40.0), pt(240.0, 110.0)];
        let quad = order_points(&points).unwrap();
        assert_eq!(quad.corners, [pt(20.0, 40.0), pt(220.0, 30.0), pt(240.0, 110.0), pt(40.0, 120.0)]);
        quad.validate().unwrap();
    }

    #[test]
    fn ordering_is_stable_under_reordering() {
        let base = [pt(5.0, 5.0), pt(105.0, 8.0), pt(110.0, 40.0), pt(3.0, 38.0)];
        let expected = order_points(&base).unwrap();
        let reversed: Vec<_> = base.iter().rev().copied().collect();
        assert_eq!(order_points(&reversed).unwrap(), expected);
    }

    #[test]
    fn ties_go_to_the_earliest_point() {
        // diamond: (0,5)/(5,0) share the smallest x+y, (5,0)/(10,5) the smallest y-x
        let diamond = [pt(0.0, 5.0), pt(5.0, 0.0), pt(10.0, 5.0), pt(5.0, 10.0)];
        let quad = order_points(&diamond).unwrap();
        assert_eq!(quad.tl(), pt(0.0, 5.0));
        assert_eq!(quad.tr(), pt(5.0, 0.0));
        assert_eq!(quad.br(), pt(10.0, 5.0));
        assert_eq!(quad.bl(), pt(0.0, 5.0));
        assert!(quad.validate().is_err());

        let reversed: Vec<_> = diamond.iter().rev().copied().collect();
        let quad = order_points(&reversed).unwrap();
        assert_eq!(quad.tl(), pt(5.0, 0.0));
        assert_eq!(quad.tr(), pt(10.0, 5.0));
        assert_eq!(quad.br(), pt(5.0, 10.0));
        assert_eq!(quad.bl(), pt(5.0, 10.0));
    }

    #[test]
    fn wrong_point_count_is_rejected() {
        let err = order_points(&[pt(0.0, 0.0), pt(1.0, 1.0)]).unwrap_err();
        assert!(matches!(err, ExtractorError::PointCount(2)));
    }

    #[test]
    fn area_of_axis_aligned_rectangle() {
        let quad = order_points(&[pt(0.0, 0.0), pt(10.0, 0.0), pt(10.0, 4.0), pt(0.0, 4.0)]).unwrap();
        assert_eq!(quad.area(), 40.0);
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let quad = order_points(&[pt(0.0, 0.0), pt(10.0, 10.0), pt(20.0, 20.0), pt(30.0, 30.0)]).unwrap();
        assert!(matches!(quad.validate(), Err(ExtractorError::DegenerateQuad(_))));
    }

    #[test]
    fn duplicate_points_are_degenerate() {
        let quad = order_points(&[pt(5.0, 5.0), pt(5.0, 5.0), pt(50.0, 5.0), pt(50.0, 30.0)]).unwrap();
        assert!(quad.validate().is_err());
    }
}
