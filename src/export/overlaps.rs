//! Coarse overlap check between sibling placements.
//!
//! Every solid is approximated by convex pieces (frusta and boxes) that
//! enclose it, plus the holes known not to belong to it: the bore of a tube,
//! the inner prism of a polyhedra and the boxes and tubes subtracted from it.
//! Two siblings overlap when a piece of one, not inside a hole of the other,
//! intersects such a piece of the other. Pieces are shrunk by a small
//! tolerance first so that touching volumes pass.
//!
//! The approximation only grows solids, so a real overlap is always found;
//! curved shapes may give false alarms. The result is advisory.

use crate::geometry::{BooleanOp, Shape, Transform, VolumeNode, VolumeRegistry};
use log::{debug, info, warn};
use nalgebra::{Isometry3, Point3, Vector3};
use std::f64::consts::PI;
use std::fmt;

type Vec3 = Vector3<f64>;

/// Distance in mm below which volumes count as touching
const TOLERANCE: f64 = 1e-3;
const GJK_ITERATIONS: usize = 64;
/// Points per rim when a circle has to be sampled
const RIM_SAMPLES: usize = 32;

/// Component of `v` perpendicular to the unit vector `axis`
fn perpendicular(v: &Vec3, axis: &Vec3) -> Vec3 {
    v - axis * v.dot(axis)
}

/// Local frame of a piece or hole, in the frame of the mother
#[derive(Debug, Clone, Copy, PartialEq)]
struct Frame(Isometry3<f64>);

impl Frame {
    fn identity() -> Self {
        Frame(Isometry3::identity())
    }

    fn from_transform(transform: &Transform) -> Self {
        Frame(transform.isometry())
    }

    fn origin(&self) -> Vec3 {
        self.0.translation.vector
    }

    /// Local axis `j` in the outer frame
    fn axis(&self, j: usize) -> Vec3 {
        self.0.rotation * Vec3::ith(j, 1.0)
    }

    fn point(&self, x: f64, y: f64, z: f64) -> Vec3 {
        self.0.transform_point(&Point3::new(x, y, z)).coords
    }

    /// `self` expressed in the frame `outer`
    fn within(&self, outer: &Frame) -> Frame {
        Frame(outer.0 * self.0)
    }
}

/// Convex part of a solid
#[derive(Debug, Clone, Copy, PartialEq)]
enum Piece {
    /// Convex hull of two discs on the local z axis
    Frustum { frame: Frame, z: [f64; 2], r: [f64; 2] },
    Cuboid { frame: Frame, half: Vec3 },
}

impl Piece {
    fn frustum(z0: f64, r0: f64, z1: f64, r1: f64) -> Self {
        let (z, r) = if z0 <= z1 { ([z0, z1], [r0, r1]) } else { ([z1, z0], [r1, r0]) };
        Piece::Frustum {
            frame: Frame::identity(),
            z,
            r,
        }
    }

    fn within(self, outer: &Frame) -> Self {
        match self {
            Piece::Frustum { frame, z, r } => Piece::Frustum {
                frame: frame.within(outer),
                z,
                r,
            },
            Piece::Cuboid { frame, half } => Piece::Cuboid {
                frame: frame.within(outer),
                half,
            },
        }
    }

    fn shrunk(self, by: f64) -> Self {
        match self {
            Piece::Frustum { frame, z, r } => {
                let z = if z[1] - z[0] > 2.0 * by {
                    [z[0] + by, z[1] - by]
                } else {
                    let mid = (z[0] + z[1]) / 2.0;
                    [mid, mid]
                };
                Piece::Frustum {
                    frame,
                    z,
                    r: r.map(|v| (v - by).max(0.0)),
                }
            }
            Piece::Cuboid { frame, half } => Piece::Cuboid {
                frame,
                half: half.map(|v| (v - by).max(0.0)),
            },
        }
    }

    fn center(&self) -> Vec3 {
        match self {
            Piece::Frustum { frame, z, .. } => frame.point(0.0, 0.0, (z[0] + z[1]) / 2.0),
            Piece::Cuboid { frame, .. } => frame.origin(),
        }
    }

    fn bounding_radius(&self) -> f64 {
        match self {
            Piece::Frustum { z, r, .. } => ((z[1] - z[0]) / 2.0).hypot(r[0].max(r[1])),
            Piece::Cuboid { half, .. } => half.norm(),
        }
    }

    /// Point of the piece farthest along `d`
    fn support(&self, d: Vec3) -> Vec3 {
        match self {
            Piece::Frustum { frame, z, r } => {
                let axis = frame.axis(2);
                let side = perpendicular(&d, &axis);
                let length = side.norm();
                let rim = |i: usize| {
                    let center = frame.point(0.0, 0.0, z[i]);
                    if length > 1e-12 {
                        center + side * (r[i] / length)
                    } else {
                        center
                    }
                };
                let (a, b) = (rim(0), rim(1));
                if a.dot(&d) >= b.dot(&d) {
                    a
                } else {
                    b
                }
            }
            Piece::Cuboid { frame, half } => (0..3).fold(frame.origin(), |p, j| {
                let axis = frame.axis(j);
                let sign = if axis.dot(&d) >= 0.0 { 1.0 } else { -1.0 };
                p + axis * (sign * half[j])
            }),
        }
    }

    /// Points whose convex hull contains the piece
    fn hull_points(&self) -> Vec<Vec3> {
        match self {
            Piece::Frustum { frame, z, r } => {
                let widen = 1.0 / (PI / RIM_SAMPLES as f64).cos();
                (0..2)
                    .flat_map(|i| {
                        (0..RIM_SAMPLES).map(move |k| {
                            let phi = 2.0 * PI * k as f64 / RIM_SAMPLES as f64;
                            let radius = r[i] * widen;
                            frame.point(radius * phi.cos(), radius * phi.sin(), z[i])
                        })
                    })
                    .collect()
            }
            Piece::Cuboid { frame, half } => (0..8)
                .map(|corner| {
                    let sign = |bit: usize| if corner & (1 << bit) != 0 { 1.0 } else { -1.0 };
                    frame.point(sign(0) * half[0], sign(1) * half[1], sign(2) * half[2])
                })
                .collect(),
        }
    }
}

/// Region known not to belong to a solid
#[derive(Debug, Clone, Copy, PartialEq)]
enum Hole {
    /// Cylinder around the local z axis, unbounded without `z`
    Cylinder { frame: Frame, r: f64, z: Option<[f64; 2]> },
    /// Regular prism whose side planes lie `r` from the local z axis
    Prism { frame: Frame, sphi: f64, sides: u32, r: f64 },
    Cuboid { frame: Frame, half: Vec3 },
}

impl Hole {
    fn within(self, outer: &Frame) -> Self {
        match self {
            Hole::Cylinder { frame, r, z } => Hole::Cylinder {
                frame: frame.within(outer),
                r,
                z,
            },
            Hole::Prism { frame, sphi, sides, r } => Hole::Prism {
                frame: frame.within(outer),
                sphi,
                sides,
                r,
            },
            Hole::Cuboid { frame, half } => Hole::Cuboid {
                frame: frame.within(outer),
                half,
            },
        }
    }

    /// Extent of the piece along `n` measured from `origin`
    fn reach(piece: &Piece, origin: Vec3, n: Vec3) -> f64 {
        (piece.support(n) - origin).dot(&n)
    }

    fn contains(&self, piece: &Piece) -> bool {
        match self {
            Hole::Cuboid { frame, half } => (0..3).all(|j| {
                let axis = frame.axis(j);
                Self::reach(piece, frame.origin(), axis) <= half[j] + TOLERANCE
                    && Self::reach(piece, frame.origin(), -axis) <= half[j] + TOLERANCE
            }),
            Hole::Prism { frame, sphi, sides, r } => (0..*sides).all(|k| {
                let phi = sphi + 2.0 * PI * (f64::from(k) + 0.5) / f64::from(*sides);
                let n = frame.axis(0) * phi.cos() + frame.axis(1) * phi.sin();
                Self::reach(piece, frame.origin(), n) <= r + TOLERANCE
            }),
            Hole::Cylinder { frame, r, z } => {
                let axis = frame.axis(2);
                if let Some([z0, z1]) = z {
                    if Self::reach(piece, frame.origin(), axis) > z1 + TOLERANCE
                        || -Self::reach(piece, frame.origin(), -axis) < z0 - TOLERANCE
                    {
                        return false;
                    }
                }
                Self::radial_reach(piece, frame, axis) <= r + TOLERANCE
            }
        }
    }

    /// Largest distance of the piece from the axis of `frame`
    fn radial_reach(piece: &Piece, frame: &Frame, axis: Vec3) -> f64 {
        let distance = |p: Vec3| perpendicular(&(p - frame.origin()), &axis).norm();
        match piece {
            Piece::Frustum {
                frame: own, z, r, ..
            } if own.axis(2).dot(&axis).abs() > 1.0 - 1e-12 => (0..2)
                .map(|i| distance(own.point(0.0, 0.0, z[i])) + r[i])
                .fold(0.0, f64::max),
            _ => piece.hull_points().into_iter().map(distance).fold(0.0, f64::max),
        }
    }
}

/// Convex pieces covering a solid, and holes not belonging to it
#[derive(Debug, Clone, Default)]
struct Parts {
    pieces: Vec<Piece>,
    holes: Vec<Hole>,
}

impl Parts {
    fn of(shape: &Shape) -> Self {
        match shape {
            Shape::Box { x, y, z } => Parts {
                pieces: vec![Piece::Cuboid {
                    frame: Frame::identity(),
                    half: Vec3::new(x / 2.0, y / 2.0, z / 2.0),
                }],
                holes: Vec::new(),
            },
            Shape::Tubs { rmin, rmax, z, .. } => {
                let holes = if *rmin > 0.0 {
                    vec![Hole::Cylinder {
                        frame: Frame::identity(),
                        r: *rmin,
                        z: None,
                    }]
                } else {
                    Vec::new()
                };
                Parts {
                    pieces: vec![Piece::frustum(-z / 2.0, *rmax, z / 2.0, *rmax)],
                    holes,
                }
            }
            Shape::GenericPolycone { r, z, .. } => {
                let n = r.len();
                let pieces = (0..n)
                    .map(|i| (i, (i + 1) % n))
                    .filter(|&(i, j)| z[i] != z[j] && (r[i] > 0.0 || r[j] > 0.0))
                    .map(|(i, j)| Piece::frustum(z[i], r[i], z[j], r[j]))
                    .collect();
                Parts {
                    pieces,
                    holes: Vec::new(),
                }
            }
            Shape::Polyhedra {
                sphi,
                dphi,
                num_side,
                z,
                rmin,
                rmax,
            } => {
                let corner = 1.0 / (dphi / f64::from(*num_side) / 2.0).cos();
                let pieces = z
                    .windows(2)
                    .zip(rmax.windows(2))
                    .filter(|(z, _)| z[0] != z[1])
                    .map(|(z, r)| Piece::frustum(z[0], r[0] * corner, z[1], r[1] * corner))
                    .collect();
                let inner = rmin.iter().copied().fold(f64::INFINITY, f64::min);
                let holes = if inner > 0.0 && (*dphi - 2.0 * PI).abs() < 1e-9 {
                    vec![Hole::Prism {
                        frame: Frame::identity(),
                        sphi: *sphi,
                        sides: *num_side,
                        r: inner,
                    }]
                } else {
                    Vec::new()
                };
                Parts { pieces, holes }
            }
            Shape::Ellipsoid {
                ax,
                by,
                cz,
                zcut1,
                zcut2,
            } => {
                let r = ax.max(*by);
                Parts {
                    pieces: vec![Piece::frustum(zcut1.max(-cz), r, zcut2.min(*cz), r)],
                    holes: Vec::new(),
                }
            }
            Shape::EllipticalTube { dx, dy, dz } => Parts {
                pieces: vec![Piece::Cuboid {
                    frame: Frame::identity(),
                    half: Vec3::new(*dx, *dy, *dz),
                }],
                holes: Vec::new(),
            },
            Shape::Boolean {
                op,
                first,
                second,
                transform,
            } => {
                let mut parts = Parts::of(first);
                let placed = Frame::from_transform(transform);
                match op {
                    BooleanOp::Union => {
                        parts
                            .pieces
                            .extend(Parts::of(second).pieces.into_iter().map(|p| p.within(&placed)));
                        // a hole of one operand may be filled by the other
                        parts.holes.clear();
                    }
                    BooleanOp::Subtraction => {
                        if let Some(hole) = Self::cut(second) {
                            parts.holes.push(hole.within(&placed));
                        }
                    }
                    BooleanOp::Intersection => parts.holes.clear(),
                }
                parts
            }
        }
    }

    /// Hole left by subtracting `shape`, if it is simple enough
    fn cut(shape: &Shape) -> Option<Hole> {
        match shape {
            Shape::Box { x, y, z } => Some(Hole::Cuboid {
                frame: Frame::identity(),
                half: Vec3::new(x / 2.0, y / 2.0, z / 2.0),
            }),
            Shape::Tubs { rmin, rmax, z, dphi, .. } if *rmin == 0.0 && (*dphi - 2.0 * PI).abs() < 1e-9 => {
                Some(Hole::Cylinder {
                    frame: Frame::identity(),
                    r: *rmax,
                    z: Some([-z / 2.0, z / 2.0]),
                })
            }
            _ => None,
        }
    }

    fn within(self, outer: &Frame) -> Self {
        Parts {
            pieces: self.pieces.into_iter().map(|p| p.within(outer)).collect(),
            holes: self.holes.into_iter().map(|h| h.within(outer)).collect(),
        }
    }

    /// Pieces of `self` not inside a hole of `other`, shrunk by the tolerance
    fn exposed_to(&self, other: &Parts) -> Vec<Piece> {
        self.pieces
            .iter()
            .filter(|piece| !other.holes.iter().any(|hole| hole.contains(piece)))
            .map(|piece| piece.shrunk(TOLERANCE))
            .collect()
    }
}

/// GJK intersection test of two convex pieces
fn intersects(a: &Piece, b: &Piece) -> bool {
    let between = a.center() - b.center();
    if between.norm() > a.bounding_radius() + b.bounding_radius() {
        return false;
    }

    let support = |d: Vec3| a.support(d) - b.support(-d);
    let mut d = if between.norm() > 1e-12 { between } else { Vec3::x() };
    let mut simplex = vec![support(d)];
    d = -simplex[0];

    for _ in 0..GJK_ITERATIONS {
        if d.norm_squared() == 0.0 {
            return true;
        }
        let p = support(d);
        if p.dot(&d) <= 0.0 {
            return false;
        }
        simplex.push(p);
        match reduce_simplex(&mut simplex) {
            Some(next) => d = next,
            None => return true,
        }
    }
    debug!("GJK did not converge, assuming the pieces are apart");
    false
}

/// Reduce the simplex (newest point last) to the feature closest to the
/// origin and return the next search direction, or `None` if it encloses the
/// origin
fn reduce_simplex(simplex: &mut Vec<Vec3>) -> Option<Vec3> {
    match simplex.len() {
        2 => line_case(simplex),
        3 => triangle_case(simplex),
        _ => tetrahedron_case(simplex),
    }
}

fn line_case(simplex: &mut Vec<Vec3>) -> Option<Vec3> {
    let (b, a) = (simplex[0], simplex[1]);
    let ab = b - a;
    let ao = -a;
    if ab.dot(&ao) > 0.0 {
        let d = ab.cross(&ao).cross(&ab);
        if d.norm_squared() == 0.0 {
            return None;
        }
        Some(d)
    } else {
        *simplex = vec![a];
        Some(ao)
    }
}

fn triangle_case(simplex: &mut Vec<Vec3>) -> Option<Vec3> {
    let (c, b, a) = (simplex[0], simplex[1], simplex[2]);
    let ab = b - a;
    let ac = c - a;
    let ao = -a;
    let abc = ab.cross(&ac);

    if abc.cross(&ac).dot(&ao) > 0.0 {
        if ac.dot(&ao) > 0.0 {
            *simplex = vec![c, a];
            return Some(ac.cross(&ao).cross(&ac));
        }
        *simplex = vec![b, a];
        return line_case(simplex);
    }
    if ab.cross(&abc).dot(&ao) > 0.0 {
        *simplex = vec![b, a];
        return line_case(simplex);
    }

    let side = abc.dot(&ao);
    if side > 0.0 {
        Some(abc)
    } else if side < 0.0 {
        *simplex = vec![b, c, a];
        Some(-abc)
    } else {
        None
    }
}

fn tetrahedron_case(simplex: &mut Vec<Vec3>) -> Option<Vec3> {
    let (d, c, b, a) = (simplex[0], simplex[1], simplex[2], simplex[3]);
    let ao = -a;
    for (face, opposite) in [([c, b, a], d), ([d, c, a], b), ([b, d, a], c)] {
        let normal = (face[0] - a).cross(&(face[1] - a));
        let outward = if normal.dot(&(opposite - a)) > 0.0 {
            -normal
        } else {
            normal
        };
        if outward.dot(&ao) > 0.0 {
            *simplex = face.to_vec();
            return triangle_case(simplex);
        }
    }
    None
}

/// Two sibling placements whose solids intersect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlap {
    /// Logical volume both are placed in
    pub mother: String,
    pub first: String,
    pub second: String,
}

impl fmt::Display for Overlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' overlaps '{}' in '{}'", self.first, self.second, self.mother)
    }
}

fn placed_parts(registry: &VolumeRegistry, node: &VolumeNode) -> Parts {
    match registry.logical_of(node) {
        Some(lv) => Parts::of(&lv.shape).within(&Frame::from_transform(&node.transform)),
        None => Parts::default(),
    }
}

/// All pairs of overlapping siblings, in construction order
pub fn find_overlaps(registry: &VolumeRegistry) -> Vec<Overlap> {
    let mut overlaps = Vec::new();
    for mother in registry.logical_volumes() {
        let daughters: Vec<(&VolumeNode, Parts)> = registry
            .daughters(&mother.name)
            .map(|node| (node, placed_parts(registry, node)))
            .collect();

        for (i, (first, first_parts)) in daughters.iter().enumerate() {
            for (second, second_parts) in &daughters[i + 1..] {
                let ours = first_parts.exposed_to(second_parts);
                if ours.is_empty() {
                    continue;
                }
                let theirs = second_parts.exposed_to(first_parts);
                let hit = ours
                    .iter()
                    .any(|a| theirs.iter().any(|b| intersects(a, b)));
                if hit {
                    overlaps.push(Overlap {
                        mother: mother.name.clone(),
                        first: first.name.clone(),
                        second: second.name.clone(),
                    });
                }
            }
        }
    }
    overlaps
}

/// Run the check and log every overlap as a warning; returns their number
pub fn check_overlaps(registry: &VolumeRegistry) -> usize {
    info!("Checking {} placements for overlaps", registry.len());
    let overlaps = find_overlaps(registry);
    for overlap in &overlaps {
        warn!("Overlap: {}", overlap);
    }
    if overlaps.is_empty() {
        info!("No overlaps found");
    } else {
        warn!("Found {} overlapping volume pairs", overlaps.len());
    }
    overlaps.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::RegistryBuilder;

    fn registry(volumes: &[(&str, Shape, Transform)]) -> VolumeRegistry {
        let mut builder = RegistryBuilder::new();
        builder
            .add_logical("world", Shape::cuboid(10_000.0, 10_000.0, 10_000.0), "vacuum")
            .unwrap();
        builder.set_world("world").unwrap();
        for (name, shape, transform) in volumes {
            builder.add_logical(name, shape.clone(), "vacuum").unwrap();
            builder.place(name, name, "world", *transform).unwrap();
        }
        builder.finish().unwrap()
    }

    #[test]
    fn test_overlapping_boxes() {
        let registry = registry(&[
            ("a", Shape::cuboid(100.0, 100.0, 100.0), Transform::default()),
            ("b", Shape::cuboid(100.0, 100.0, 100.0), Transform::translation(90.0, 0.0, 0.0)),
        ]);
        assert_eq!(
            find_overlaps(&registry),
            vec![Overlap {
                mother: "world".to_string(),
                first: "a".to_string(),
                second: "b".to_string(),
            }]
        );
    }

    #[test]
    fn test_touching_is_not_an_overlap() {
        let registry = registry(&[
            ("a", Shape::cuboid(100.0, 100.0, 100.0), Transform::default()),
            ("b", Shape::cuboid(100.0, 100.0, 100.0), Transform::translation(100.0, 0.0, 0.0)),
            ("c", Shape::cylinder(50.0, 20.0), Transform::translation(0.0, 0.0, 60.0)),
        ]);
        assert!(find_overlaps(&registry).is_empty());
    }

    #[test]
    fn test_rotated_box_beside_cylinder() {
        // the bounding boxes intersect, the solids do not
        let registry = registry(&[
            ("cyl", Shape::cylinder(100.0, 200.0), Transform::default()),
            (
                "box",
                Shape::cuboid(100.0, 100.0, 100.0),
                Transform::new([0.0, 0.0, PI / 4.0], [100.0 + 50.0 * 2f64.sqrt() + 1.0, 0.0, 0.0]),
            ),
        ]);
        assert!(find_overlaps(&registry).is_empty());

        let registry = self::registry(&[
            ("cyl", Shape::cylinder(100.0, 200.0), Transform::default()),
            (
                "box",
                Shape::cuboid(100.0, 100.0, 100.0),
                Transform::new([0.0, 0.0, PI / 4.0], [100.0 + 50.0 * 2f64.sqrt() - 5.0, 0.0, 0.0]),
            ),
        ]);
        assert_eq!(find_overlaps(&registry).len(), 1);
    }

    #[test]
    fn test_volume_in_bore_of_pipe() {
        let registry = registry(&[
            ("pipe", Shape::pipe(100.0, 110.0, 500.0), Transform::default()),
            ("rod", Shape::cylinder(30.0, 800.0), Transform::default()),
            ("box", Shape::cuboid(20.0, 20.0, 20.0), Transform::translation(60.0, 60.0, 0.0)),
        ]);
        assert!(find_overlaps(&registry).is_empty());

        let registry = self::registry(&[
            ("pipe", Shape::pipe(100.0, 110.0, 500.0), Transform::default()),
            ("rod", Shape::cylinder(20.0, 100.0), Transform::translation(95.0, 0.0, 0.0)),
        ]);
        assert_eq!(find_overlaps(&registry).len(), 1);
    }

    #[test]
    fn test_volume_in_subtracted_pocket() {
        let block = Shape::cuboid(1000.0, 1000.0, 1000.0)
            .subtract(Shape::cuboid(400.0, 400.0, 400.0), Transform::translation(0.0, 0.0, 300.0))
            .subtract(Shape::cylinder(100.0, 200.0), Transform::translation(0.0, 0.0, 0.0));
        let registry = registry(&[
            ("block", block.clone(), Transform::default()),
            ("in_box", Shape::cylinder(150.0, 300.0), Transform::translation(0.0, 0.0, 300.0)),
            ("in_tube", Shape::cylinder(100.0, 200.0), Transform::default()),
        ]);
        assert!(find_overlaps(&registry).is_empty());

        let registry = self::registry(&[
            ("block", block, Transform::default()),
            ("sticking_out", Shape::cylinder(150.0, 500.0), Transform::translation(0.0, 0.0, 300.0)),
        ]);
        assert_eq!(find_overlaps(&registry).len(), 1);
    }

    #[test]
    fn test_volume_inside_polyhedra_lining() {
        let lining = Shape::Polyhedra {
            sphi: 0.0,
            dphi: 2.0 * PI,
            num_side: 8,
            z: vec![0.0, 1000.0],
            rmin: vec![500.0, 500.0],
            rmax: vec![503.0, 503.0],
        };
        let rotation = [0.0, PI / 2.0, PI / 8.0];
        let registry = registry(&[
            ("lining", lining.clone(), Transform::default()),
            // lies against the face whose normal points along 22.5 deg
            (
                "sensor",
                Shape::cylinder(50.0, 40.0),
                Transform::new(rotation, [479.0 * (PI / 8.0).cos(), 479.0 * (PI / 8.0).sin(), 500.0]),
            ),
        ]);
        assert!(find_overlaps(&registry).is_empty());

        let registry = self::registry(&[
            ("lining", lining, Transform::default()),
            (
                "sensor",
                Shape::cylinder(50.0, 40.0),
                Transform::new(rotation, [490.0 * (PI / 8.0).cos(), 490.0 * (PI / 8.0).sin(), 500.0]),
            ),
        ]);
        assert_eq!(find_overlaps(&registry).len(), 1);
    }

    #[test]
    fn test_polycone_pieces() {
        let cone = Shape::GenericPolycone {
            sphi: 0.0,
            dphi: 2.0 * PI,
            r: vec![0.0, 100.0, 10.0, 0.0],
            z: vec![0.0, 0.0, 100.0, 100.0],
        };
        let parts = Parts::of(&cone);
        assert_eq!(parts.pieces.len(), 1);

        // next to the narrow top of the cone but clear of it
        let registry = registry(&[
            ("cone", cone.clone(), Transform::default()),
            ("box", Shape::cuboid(20.0, 20.0, 20.0), Transform::translation(60.0, 0.0, 85.0)),
        ]);
        assert!(find_overlaps(&registry).is_empty());
        let registry = self::registry(&[
            ("cone", cone, Transform::default()),
            ("box", Shape::cuboid(20.0, 20.0, 20.0), Transform::translation(60.0, 0.0, 15.0)),
        ]);
        assert_eq!(find_overlaps(&registry).len(), 1);
    }
}
