//! Affine transforms for components and build items

use crate::error::{Error, Result};
use nalgebra::{Matrix4, Point3, Vector4};

/// Number of values in a 3MF transform attribute (4x3 affine, row-major)
pub const TRANSFORM_MATRIX_SIZE: usize = 12;

/// Number of values accepted for a full 4x4 transform attribute
pub const FULL_MATRIX_SIZE: usize = 16;

/// An affine transform stored as a column-vector 4x4 matrix
///
/// 3MF documents store transforms as 12 numbers in row-vector order:
///
/// ```text
/// m00 m01 m02 m10 m11 m12 m20 m21 m22 tx ty tz
/// ```
///
/// so a point maps as `x' = x*m00 + y*m10 + z*m20 + tx`. The stored matrix is
/// the transpose of that layout, so points are transformed as `M * p`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform(Matrix4<f64>);

impl Transform {
    /// The identity transform
    pub fn identity() -> Self {
        Self(Matrix4::identity())
    }

    /// Wrap a column-vector matrix
    pub fn from_matrix(matrix: Matrix4<f64>) -> Self {
        Self(matrix)
    }

    /// A pure translation
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Self(Matrix4::new_translation(&nalgebra::Vector3::new(x, y, z)))
    }

    /// A non-uniform scale about the origin
    pub fn scaling(x: f64, y: f64, z: f64) -> Self {
        Self(Matrix4::new_nonuniform_scaling(&nalgebra::Vector3::new(
            x, y, z,
        )))
    }

    /// Build a transform from 12 (or 16) values in 3MF row-vector order
    pub fn from_values(values: &[f64]) -> Result<Self> {
        let full: [f64; FULL_MATRIX_SIZE] = match values.len() {
            TRANSFORM_MATRIX_SIZE => [
                values[0], values[1], values[2], 0.0, //
                values[3], values[4], values[5], 0.0, //
                values[6], values[7], values[8], 0.0, //
                values[9], values[10], values[11], 1.0,
            ],
            FULL_MATRIX_SIZE => {
                let mut full = [0.0; FULL_MATRIX_SIZE];
                full.copy_from_slice(values);
                full
            }
            n => {
                return Err(Error::ParseError(format!(
                    "Transform must have {} values, found {}",
                    TRANSFORM_MATRIX_SIZE, n
                )));
            }
        };

        if full.iter().any(|v| !v.is_finite()) {
            return Err(Error::ParseError(
                "Transform contains a non-finite value".to_string(),
            ));
        }

        // Row-vector rows become the columns of the stored matrix.
        Ok(Self(Matrix4::from_column_slice(&full)))
    }

    /// Parse a whitespace separated transform attribute value
    pub fn parse(text: &str) -> Result<Self> {
        let values = text
            .split_whitespace()
            .map(|s| s.parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Self::from_values(&values)
    }

    /// The underlying column-vector matrix
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.0
    }

    /// Compose two transforms, applying `self` first and then `next`
    pub fn then(&self, next: &Transform) -> Transform {
        Transform(next.0 * self.0)
    }

    /// Transform a point
    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        let v = self.0 * Vector4::new(point.x, point.y, point.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Whether this is exactly the identity
    pub fn is_identity(&self) -> bool {
        self.0 == Matrix4::identity()
    }

    /// Whether the transform keeps the XY plane planar and Z unscaled
    ///
    /// Requires no coupling between Z and the X/Y axes and a Z scale of
    /// exactly one. Translation along Z is allowed.
    pub fn is_planar_in_z(&self) -> bool {
        let m = &self.0;
        m[(2, 0)] == 0.0
            && m[(2, 1)] == 0.0
            && m[(0, 2)] == 0.0
            && m[(1, 2)] == 0.0
            && m[(2, 2)] == 1.0
    }

    /// The 12 values of the 3MF attribute form, in row-vector order
    pub fn to_values(&self) -> [f64; TRANSFORM_MATRIX_SIZE] {
        let m = &self.0;
        let mut values = [0.0; TRANSFORM_MATRIX_SIZE];
        for row in 0..4 {
            for col in 0..3 {
                values[row * 3 + col] = m[(col, row)];
            }
        }
        values
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values = self.to_values();
        for (i, v) in values.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", v)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Transform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
