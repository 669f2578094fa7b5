use crate::geometry::{PointCloud, PointSample};
use crate::raster::ElevationGrid;
use crate::{Error, Result};

use kiddo::{immutable::float::kdtree::ImmutableKdTree, SquaredEuclidean};
use log::debug;
use spade::{DelaunayTriangulation, HasPosition, Point2, Triangulation};

use std::collections::BTreeMap;

// barycentric slack so cell centres exactly on a shared edge are not lost to rounding
const BARYCENTRIC_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
pub struct TinVertex {
    pub pos: Point2<f64>,
    pub z: f64,
}

impl HasPosition for TinVertex {
    type Scalar = f64;

    fn position(&self) -> Point2<Self::Scalar> {
        self.pos
    }
}

/// Triangulated irregular network over the planimetric positions of the samples
pub struct Tin {
    dt: DelaunayTriangulation<TinVertex>,
    vertices: Vec<TinVertex>,
    triangles: Vec<[usize; 3]>,
}

impl Tin {
    pub fn new(cloud: &PointCloud) -> Result<Tin> {
        cloud.check_interpolatable()?;

        let merged = merge_duplicates(&cloud.points);
        if merged.len() < cloud.len() {
            debug!(
                "Merged {} samples sharing a position with another sample",
                cloud.len() - merged.len()
            );
        }

        let dt = DelaunayTriangulation::<TinVertex>::bulk_load_stable(merged)
            .map_err(|_| Error::DegenerateGeometry)?;

        let vertices: Vec<TinVertex> = dt.vertices().map(|v| *v.data()).collect();
        let mut triangles: Vec<[usize; 3]> = dt
            .inner_faces()
            .map(|f| f.vertices().map(|v| v.fix().index()))
            .collect();

        if triangles.is_empty() {
            return Err(Error::DegenerateGeometry);
        }

        let flipped = resolve_cocircular(&vertices, &mut triangles);
        debug!(
            "Triangulated {} vertices into {} triangles, {flipped} cocircular diagonals flipped",
            vertices.len(),
            triangles.len()
        );

        Ok(Tin {
            dt,
            vertices,
            triangles,
        })
    }

    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Linear interpolation on the triangle containing each cell centre.
    /// Cells outside the hull, or only under too long triangles, are left empty.
    pub fn rasterize_linear(&self, grid: &mut ElevationGrid, max_edge_length: Option<f64>) {
        let t = grid.transform;
        let cs = t.cell_size;

        for tri in self.triangles.iter() {
            let [a, b, c] = tri.map(|i| self.vertices[i].pos);
            let [za, zb, zc] = tri.map(|i| self.vertices[i].z);

            if let Some(max) = max_edge_length {
                let max_sq = max * max;
                if sq_dist(a, b) > max_sq || sq_dist(b, c) > max_sq || sq_dist(c, a) > max_sq {
                    continue;
                }
            }

            // twice the signed area, the sign takes care of either orientation
            let det = (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y);
            if det == 0. {
                continue;
            }

            let min_x = a.x.min(b.x).min(c.x);
            let max_x = a.x.max(b.x).max(c.x);
            let min_y = a.y.min(b.y).min(c.y);
            let max_y = a.y.max(b.y).max(c.y);

            // the cells whose centres fall in the bounding box of the triangle
            let col_start = ((min_x - t.tl_coord.x) / cs - 0.5).ceil().max(0.) as usize;
            let col_end = ((max_x - t.tl_coord.x) / cs - 0.5).floor();
            let row_start = ((t.tl_coord.y - max_y) / cs - 0.5).ceil().max(0.) as usize;
            let row_end = ((t.tl_coord.y - min_y) / cs - 0.5).floor();
            if col_end < 0. || row_end < 0. {
                continue;
            }
            let col_end = (col_end as usize).min(grid.width - 1);
            let row_end = (row_end as usize).min(grid.height - 1);

            for yi in row_start..=row_end {
                for xi in col_start..=col_end {
                    let index = yi * grid.width + xi;
                    if grid.field[index].is_some() {
                        continue;
                    }

                    let p = t.cell_center(yi, xi);
                    let l1 = ((b.x - p.x) * (c.y - p.y) - (c.x - p.x) * (b.y - p.y)) / det;
                    let l2 = ((c.x - p.x) * (a.y - p.y) - (a.x - p.x) * (c.y - p.y)) / det;
                    let l3 = 1. - l1 - l2;

                    if l1 >= -BARYCENTRIC_EPSILON
                        && l2 >= -BARYCENTRIC_EPSILON
                        && l3 >= -BARYCENTRIC_EPSILON
                    {
                        grid.field[index] = Some(l1 * za + l2 * zb + l3 * zc);
                    }
                }
            }
        }
    }

    /// Sibson natural neighbour interpolation, restricted to the cells the linear surface covers
    pub fn rasterize_natural_neighbor(
        &self,
        grid: &mut ElevationGrid,
        max_edge_length: Option<f64>,
    ) {
        self.rasterize_linear(grid, max_edge_length);

        let nn = self.dt.natural_neighbor();
        for yi in 0..grid.height {
            for xi in 0..grid.width {
                let index = yi * grid.width + xi;
                if grid.field[index].is_none() {
                    continue;
                }

                let c = grid.transform.cell_center(yi, xi);
                if let Some(elev) = nn.interpolate(|v| v.data().z, Point2::new(c.x, c.y)) {
                    grid.field[index] = Some(elev);
                }
            }
        }
    }
}

/// Clears every cell whose centre is farther than `max_distance` from the closest sample
pub fn mask_unsupported(grid: &mut ElevationGrid, cloud: &PointCloud, max_distance: f64) -> usize {
    let tree: ImmutableKdTree<f64, usize, 2, 32> =
        ImmutableKdTree::new_from_slice(&cloud.to_2d_slice());
    let max_sq = max_distance * max_distance;

    let mut cleared = 0;
    for yi in 0..grid.height {
        for xi in 0..grid.width {
            let index = yi * grid.width + xi;
            if grid.field[index].is_none() {
                continue;
            }

            let c = grid.transform.cell_center(yi, xi);
            let nearest = tree.nearest_one::<SquaredEuclidean>(&[c.x, c.y]);
            if nearest.distance > max_sq {
                grid.field[index] = None;
                cleared += 1;
            }
        }
    }
    cleared
}

fn sq_dist(a: Point2<f64>, b: Point2<f64>) -> f64 {
    (a.x - b.x).powi(2) + (a.y - b.y).powi(2)
}

/// Samples at the same planimetric position are collapsed into one vertex at their mean elevation.
/// The result is sorted, which makes the triangulation independent of the input order.
fn merge_duplicates(points: &[PointSample]) -> Vec<TinVertex> {
    let mut sorted: Vec<&PointSample> = points.iter().collect();
    sorted.sort_by(|a, b| {
        a.x.total_cmp(&b.x)
            .then(a.y.total_cmp(&b.y))
            .then(a.z.total_cmp(&b.z))
    });

    let mut merged: Vec<TinVertex> = Vec::with_capacity(sorted.len());
    let mut i = 0;
    while i < sorted.len() {
        let first = sorted[i];
        let mut j = i + 1;
        let mut z_sum = first.z;
        while j < sorted.len() && sorted[j].x == first.x && sorted[j].y == first.y {
            z_sum += sorted[j].z;
            j += 1;
        }

        merged.push(TinVertex {
            pos: Point2::new(first.x, first.y),
            z: z_sum / (j - i) as f64,
        });
        i = j;
    }
    merged
}

// positive when d lies inside the circle through a, b, c (counter clockwise)
fn incircle(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>, d: Point2<f64>) -> f64 {
    let (adx, ady) = (a.x - d.x, a.y - d.y);
    let (bdx, bdy) = (b.x - d.x, b.y - d.y);
    let (cdx, cdy) = (c.x - d.x, c.y - d.y);

    (adx * adx + ady * ady) * (bdx * cdy - cdx * bdy)
        + (bdx * bdx + bdy * bdy) * (cdx * ady - adx * cdy)
        + (cdx * cdx + cdy * cdy) * (adx * bdy - bdx * ady)
}

fn orientation(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Four cocircular points have two valid Delaunay triangulations and the choice between them is
/// arbitrary. Such quads are re-split along the diagonal with the higher midpoint, so crests and
/// ridges survive in the surface and the result only depends on the samples.
///
/// Returns the number of flipped diagonals.
fn resolve_cocircular(vertices: &[TinVertex], triangles: &mut [[usize; 3]]) -> usize {
    // undirected edge -> (triangle, vertex opposite the edge)
    let mut edges: BTreeMap<(usize, usize), Vec<(usize, usize)>> = BTreeMap::new();
    for (ti, tri) in triangles.iter().enumerate() {
        for k in 0..3 {
            let (a, b, opposite) = (tri[k], tri[(k + 1) % 3], tri[(k + 2) % 3]);
            edges
                .entry((a.min(b), a.max(b)))
                .or_default()
                .push((ti, opposite));
        }
    }

    let mut touched = vec![false; triangles.len()];
    let mut flipped = 0;
    for (&(a, b), faces) in edges.iter() {
        let &[(t1, c), (t2, d)] = faces.as_slice() else {
            continue;
        };
        if touched[t1] || touched[t2] {
            continue;
        }

        let (va, vb, vc, vd) = (vertices[a], vertices[b], vertices[c], vertices[d]);

        // the quad must be strictly convex for the other diagonal to be valid
        let sides_ab = orientation(va.pos, vb.pos, vc.pos) * orientation(va.pos, vb.pos, vd.pos);
        let sides_cd = orientation(vc.pos, vd.pos, va.pos) * orientation(vc.pos, vd.pos, vb.pos);
        if sides_ab >= 0. || sides_cd >= 0. {
            continue;
        }

        let scale = sq_dist(va.pos, vb.pos).max(sq_dist(vc.pos, vd.pos));
        let (p, q, r) = if orientation(va.pos, vb.pos, vc.pos) > 0. {
            (va.pos, vb.pos, vc.pos)
        } else {
            (vb.pos, va.pos, vc.pos)
        };
        if incircle(p, q, r, vd.pos).abs() > 1e-10 * scale * scale {
            continue;
        }

        if va.z + vb.z >= vc.z + vd.z {
            continue;
        }

        triangles[t1] = [c, d, a];
        triangles[t2] = [d, c, b];
        touched[t1] = true;
        touched[t2] = true;
        flipped += 1;
    }
    flipped
}
