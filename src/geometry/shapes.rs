//! Solid shape parameters.
//!
//! Only the parameters are modelled here; tessellation and navigation are
//! left to the simulation toolkit reading the exported geometry. Lengths are
//! in mm, angles in radians.

use super::transform::Transform;
use crate::error::{GeometryError, Result};
use serde::Serialize;
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanOp {
    Union,
    Subtraction,
    Intersection,
}

impl BooleanOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Union => "union",
            Self::Subtraction => "subtraction",
            Self::Intersection => "intersection",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    /// Cuboid with full edge lengths
    Box { x: f64, y: f64, z: f64 },
    /// Cylinder section; `z` is the full length
    Tubs {
        rmin: f64,
        rmax: f64,
        z: f64,
        sphi: f64,
        dphi: f64,
    },
    /// Solid of revolution of a closed (r, z) outline
    GenericPolycone {
        sphi: f64,
        dphi: f64,
        r: Vec<f64>,
        z: Vec<f64>,
    },
    /// Polygonal prism; radii are distances to the side planes
    Polyhedra {
        sphi: f64,
        dphi: f64,
        num_side: u32,
        z: Vec<f64>,
        rmin: Vec<f64>,
        rmax: Vec<f64>,
    },
    /// Ellipsoid cut at `zcut1 < z < zcut2`
    Ellipsoid {
        ax: f64,
        by: f64,
        cz: f64,
        zcut1: f64,
        zcut2: f64,
    },
    /// Elliptical cylinder with half lengths
    EllipticalTube { dx: f64, dy: f64, dz: f64 },
    /// `second` is positioned by `transform` in the frame of `first`
    Boolean {
        op: BooleanOp,
        first: Box<Shape>,
        second: Box<Shape>,
        transform: Transform,
    },
}

impl Shape {
    /// Full cylinder of radius `r` and full length `length`
    pub fn cylinder(r: f64, length: f64) -> Self {
        Self::pipe(0.0, r, length)
    }

    pub fn pipe(rmin: f64, rmax: f64, length: f64) -> Self {
        Self::Tubs {
            rmin,
            rmax,
            z: length,
            sphi: 0.0,
            dphi: 2.0 * PI,
        }
    }

    pub fn cuboid(x: f64, y: f64, z: f64) -> Self {
        Self::Box { x, y, z }
    }

    pub fn union(self, other: Shape, transform: Transform) -> Self {
        self.combine(BooleanOp::Union, other, transform)
    }

    pub fn subtract(self, other: Shape, transform: Transform) -> Self {
        self.combine(BooleanOp::Subtraction, other, transform)
    }

    fn combine(self, op: BooleanOp, other: Shape, transform: Transform) -> Self {
        Self::Boolean {
            op,
            first: Box::new(self),
            second: Box::new(other),
            transform,
        }
    }

    /// GDML element name of the solid
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Box { .. } => "box",
            Self::Tubs { .. } => "tube",
            Self::GenericPolycone { .. } => "genericPolycone",
            Self::Polyhedra { .. } => "polyhedra",
            Self::Ellipsoid { .. } => "ellipsoid",
            Self::EllipticalTube { .. } => "eltube",
            Self::Boolean { op, .. } => op.as_str(),
        }
    }

    /// Reject degenerate parameters
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Box { x, y, z } => {
                positive("box edge", &[*x, *y, *z])?;
            }
            Self::Tubs {
                rmin,
                rmax,
                z,
                sphi,
                dphi,
            } => {
                positive("tube", &[*rmax, *z, *dphi])?;
                finite("tube start angle", &[*sphi])?;
                if !(*rmin >= 0.0 && rmin < rmax) {
                    return Err(degenerate(format!("tube radii rmin={} rmax={}", rmin, rmax)));
                }
                if *dphi > 2.0 * PI + 1e-9 {
                    return Err(degenerate(format!("tube opening angle {}", dphi)));
                }
            }
            Self::GenericPolycone { sphi, dphi, r, z } => {
                finite("polycone angle", &[*sphi])?;
                positive("polycone opening angle", &[*dphi])?;
                if r.len() != z.len() || r.len() < 3 {
                    return Err(degenerate(format!(
                        "polycone outline with {} radii and {} heights",
                        r.len(),
                        z.len()
                    )));
                }
                finite("polycone outline", z)?;
                if r.iter().any(|v| !(v.is_finite() && *v >= 0.0)) {
                    return Err(degenerate("polycone outline with negative radius"));
                }
                if span(z) <= 0.0 || r.iter().all(|v| *v == 0.0) {
                    return Err(degenerate("flat polycone outline"));
                }
            }
            Self::Polyhedra {
                sphi,
                dphi,
                num_side,
                z,
                rmin,
                rmax,
            } => {
                finite("polyhedra angle", &[*sphi])?;
                positive("polyhedra opening angle", &[*dphi])?;
                if *num_side < 3 {
                    return Err(degenerate(format!("polyhedra with {} sides", num_side)));
                }
                if z.len() < 2 || z.len() != rmin.len() || z.len() != rmax.len() {
                    return Err(degenerate("polyhedra planes of unequal length"));
                }
                finite("polyhedra planes", z)?;
                if z.windows(2).any(|w| w[1] < w[0]) || span(z) <= 0.0 {
                    return Err(degenerate("polyhedra planes are not increasing in z"));
                }
                for (inner, outer) in rmin.iter().zip(rmax) {
                    if !(inner.is_finite() && *inner >= 0.0 && outer > inner) {
                        return Err(degenerate(format!(
                            "polyhedra radii rmin={} rmax={}",
                            inner, outer
                        )));
                    }
                }
            }
            Self::Ellipsoid {
                ax,
                by,
                cz,
                zcut1,
                zcut2,
            } => {
                positive("ellipsoid semi-axis", &[*ax, *by, *cz])?;
                finite("ellipsoid cut", &[*zcut1, *zcut2])?;
                if !(zcut1 < zcut2 && *zcut1 < *cz && *zcut2 > -cz) {
                    return Err(degenerate(format!(
                        "ellipsoid cuts {}..{} leave nothing of cz={}",
                        zcut1, zcut2, cz
                    )));
                }
            }
            Self::EllipticalTube { dx, dy, dz } => {
                positive("elliptical tube", &[*dx, *dy, *dz])?;
            }
            Self::Boolean {
                first,
                second,
                transform,
                ..
            } => {
                first.validate()?;
                second.validate()?;
                finite("boolean rotation", &transform.rotation)?;
                finite("boolean translation", &transform.translation)?;
            }
        }
        Ok(())
    }
}

fn degenerate(msg: impl Into<String>) -> GeometryError {
    GeometryError::construction(format!("degenerate shape: {}", msg.into()))
}

fn finite(what: &str, values: &[f64]) -> Result<()> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(degenerate(format!("{} is not finite: {:?}", what, values)));
    }
    Ok(())
}

fn positive(what: &str, values: &[f64]) -> Result<()> {
    if values.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
        return Err(degenerate(format!("{} needs positive dimensions, got {:?}", what, values)));
    }
    Ok(())
}

fn span(values: &[f64]) -> f64 {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    max - min
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_shapes() {
        assert!(Shape::cylinder(10.0, 20.0).validate().is_ok());
        assert!(Shape::pipe(9.0, 10.0, 20.0).validate().is_ok());
        assert!(Shape::cuboid(1.0, 2.0, 3.0).validate().is_ok());

        let dome = Shape::Ellipsoid {
            ax: 10.0,
            by: 10.0,
            cz: 5.0,
            zcut1: 0.0,
            zcut2: 5.0,
        };
        let combined = Shape::cylinder(10.0, 20.0).union(dome, Transform::translation(0.0, 0.0, 10.0));
        assert!(combined.validate().is_ok());
        assert_eq!(combined.kind(), "union");
    }

    #[test]
    fn test_degenerate_shapes_rejected() {
        let cases = [
            Shape::cylinder(0.0, 20.0),
            Shape::pipe(10.0, 10.0, 20.0),
            Shape::cylinder(10.0, f64::NAN),
            Shape::cuboid(1.0, -2.0, 3.0),
            Shape::GenericPolycone {
                sphi: 0.0,
                dphi: 2.0 * PI,
                r: vec![0.0, 1.0],
                z: vec![0.0, 1.0],
            },
            Shape::Polyhedra {
                sphi: 0.0,
                dphi: 2.0 * PI,
                num_side: 2,
                z: vec![0.0, 1.0],
                rmin: vec![1.0, 1.0],
                rmax: vec![2.0, 2.0],
            },
            Shape::Ellipsoid {
                ax: 1.0,
                by: 1.0,
                cz: 1.0,
                zcut1: 2.0,
                zcut2: 3.0,
            },
        ];
        for shape in cases {
            assert!(
                matches!(shape.validate(), Err(GeometryError::Construction(_))),
                "{:?}",
                shape
            );
        }
    }

    #[test]
    fn test_boolean_validates_operands() {
        let broken = Shape::cylinder(10.0, 20.0).subtract(Shape::cylinder(-1.0, 5.0), Transform::default());
        assert!(broken.validate().is_err());
    }
}
