// Sutherland-Hodgman clipping of polygon rings against axis aligned rectangles.
//
// The clip window is always convex (a grid cell or a band of cells), so the subject ring may be
// concave. A concave subject can leave zero-width "bridges" along the window border, these have
// no area and do not disturb the shoelace sum.

use geo::{Coord, LineString, Polygon, Rect};

#[derive(Debug, Clone, Copy)]
enum Boundary {
    Left(f64),
    Right(f64),
    Bottom(f64),
    Top(f64),
}

impl Boundary {
    #[inline]
    fn inside(&self, c: &Coord) -> bool {
        match *self {
            Boundary::Left(x) => c.x >= x,
            Boundary::Right(x) => c.x <= x,
            Boundary::Bottom(y) => c.y >= y,
            Boundary::Top(y) => c.y <= y,
        }
    }

    // only called for segments crossing the boundary, so the denominator is never zero
    #[inline]
    fn intersect(&self, a: &Coord, b: &Coord) -> Coord {
        match *self {
            Boundary::Left(x) | Boundary::Right(x) => {
                let t = (x - a.x) / (b.x - a.x);
                Coord {
                    x,
                    y: a.y + t * (b.y - a.y),
                }
            }
            Boundary::Bottom(y) | Boundary::Top(y) => {
                let t = (y - a.y) / (b.y - a.y);
                Coord {
                    x: a.x + t * (b.x - a.x),
                    y,
                }
            }
        }
    }
}

fn clip_ring(ring: &[Coord], boundary: Boundary) -> Vec<Coord> {
    let mut out = Vec::with_capacity(ring.len() + 4);

    let Some(&last) = ring.last() else {
        return out;
    };

    let mut prev = last;
    let mut prev_inside = boundary.inside(&prev);
    for &current in ring {
        let current_inside = boundary.inside(&current);
        if current_inside {
            if !prev_inside {
                out.push(boundary.intersect(&prev, &current));
            }
            out.push(current);
        } else if prev_inside {
            out.push(boundary.intersect(&prev, &current));
        }
        prev = current;
        prev_inside = current_inside;
    }
    out
}

/// Absolute shoelace area of an open ring
pub fn ring_area(ring: &[Coord]) -> f64 {
    if ring.len() < 3 {
        return 0.;
    }

    let mut twice_area = 0.;
    let mut prev = ring[ring.len() - 1];
    for &c in ring {
        twice_area += prev.x * c.y - c.x * prev.y;
        prev = c;
    }
    twice_area.abs() / 2.
}

fn open_ring(line: &LineString) -> Vec<Coord> {
    let mut ring = line.0.clone();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

/// A polygon as open rings, the form the clipper works on
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rings {
    pub exterior: Vec<Coord>,
    pub interiors: Vec<Vec<Coord>>,
}

impl Rings {
    pub fn from_polygon(polygon: &Polygon) -> Rings {
        Rings {
            exterior: open_ring(polygon.exterior()),
            interiors: polygon.interiors().iter().map(open_ring).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exterior.len() < 3
    }

    /// Area inside the exterior ring and outside all holes
    pub fn area(&self) -> f64 {
        let holes: f64 = self.interiors.iter().map(|r| ring_area(r)).sum();
        (ring_area(&self.exterior) - holes).max(0.)
    }

    /// Clips to the horizontal band `y0 <= y <= y1`
    pub fn clip_y(&self, y0: f64, y1: f64) -> Rings {
        self.clip_with(&[Boundary::Bottom(y0), Boundary::Top(y1)])
    }

    /// Clips to the vertical band `x0 <= x <= x1`
    pub fn clip_x(&self, x0: f64, x1: f64) -> Rings {
        self.clip_with(&[Boundary::Left(x0), Boundary::Right(x1)])
    }

    pub fn clip_rect(&self, rect: &Rect) -> Rings {
        self.clip_with(&[
            Boundary::Left(rect.min().x),
            Boundary::Right(rect.max().x),
            Boundary::Bottom(rect.min().y),
            Boundary::Top(rect.max().y),
        ])
    }

    fn clip_with(&self, boundaries: &[Boundary]) -> Rings {
        let clip_all = |ring: &Vec<Coord>| {
            boundaries
                .iter()
                .fold(ring.clone(), |acc, b| clip_ring(&acc, *b))
        };

        let exterior = clip_all(&self.exterior);
        if exterior.len() < 3 {
            return Rings::default();
        }

        let interiors = self
            .interiors
            .iter()
            .map(clip_all)
            .filter(|r| r.len() >= 3)
            .collect();

        Rings {
            exterior,
            interiors,
        }
    }
}

/// Area of the part of `polygon` that lies inside `rect`
pub fn clipped_area(polygon: &Polygon, rect: &Rect) -> f64 {
    Rings::from_polygon(polygon).clip_rect(rect).area()
}
