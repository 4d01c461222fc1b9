//! Uniform real-space grids over (possibly periodic) simulation cells.

use std::fmt;

use derive_builder::Builder;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};


/// The relative magnitude below which off-diagonal lattice components are considered zero.
const ORTHORHOMBIC_THRESHOLD: f64 = 1e-12;

// -----------
// LatticeForm
// -----------

/// The closed set of lattice shapes a grid can take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LatticeForm {
    /// All three lattice vectors are mutually orthogonal and axis-aligned.
    Orthorhombic,

    /// Any other arrangement of lattice vectors. Integral evaluation over such lattices is not
    /// implemented and is rejected with an explicit error.
    General,
}

impl fmt::Display for LatticeForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LatticeForm::Orthorhombic => write!(f, "orthorhombic"),
            LatticeForm::General => write!(f, "general"),
        }
    }
}

// -----------
// UniformGrid
// -----------

/// A uniform mesh of sample points spanning a simulation cell.
///
/// The rows of [`Self::lattice`] are the real-space cell vectors $`\mathbf{a}_1`$,
/// $`\mathbf{a}_2`$ and $`\mathbf{a}_3`$; the mesh places `mesh[k]` points along cell vector
/// $`k`$, at fractional positions $`0, 1/n_k, \ldots, (n_k-1)/n_k`$. The first `dimension` axes
/// are periodic.
#[derive(Clone, Builder, Debug, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct UniformGrid {
    /// The real-space lattice vectors, one per row.
    pub lattice: Matrix3<f64>,

    /// The number of grid points along each lattice vector.
    pub mesh: [usize; 3],

    /// The number of periodic axes, `0..=3`. Axes `0..dimension` are periodic and image-summed;
    /// the remaining axes are open boundaries.
    pub dimension: usize,
}

impl UniformGridBuilder {
    fn validate(&self) -> Result<(), String> {
        let lattice = self.lattice.as_ref().ok_or("No lattice vectors found.")?;
        let mesh = self.mesh.as_ref().ok_or("No mesh found.")?;
        let dimension = self.dimension.as_ref().ok_or("No dimensionality found.")?;
        if mesh.iter().any(|&n| n == 0) {
            return Err("Each mesh dimension requires at least one grid point.".to_string());
        }
        if *dimension > 3 {
            return Err(format!(
                "The periodic dimensionality must be 0..=3, but {dimension} was given."
            ));
        }
        if (0..3).any(|k| lattice.row(k).norm() == 0.0) {
            return Err("Lattice vectors must have non-zero lengths.".to_string());
        }
        Ok(())
    }
}

impl UniformGrid {
    /// Returns a builder to construct a new [`UniformGrid`].
    pub fn builder() -> UniformGridBuilder {
        UniformGridBuilder::default()
    }

    /// Constructs an orthorhombic grid with the given cell edge lengths.
    ///
    /// # Arguments
    ///
    /// * `lengths` - The edge lengths of the cell along $`x`$, $`y`$ and $`z`$.
    /// * `mesh` - The number of grid points along each edge.
    /// * `dimension` - The number of periodic axes, `0..=3`.
    pub fn orthorhombic(
        lengths: [f64; 3],
        mesh: [usize; 3],
        dimension: usize,
    ) -> Result<Self, UniformGridBuilderError> {
        Self::builder()
            .lattice(Matrix3::from_diagonal(&Vector3::new(
                lengths[0], lengths[1], lengths[2],
            )))
            .mesh(mesh)
            .dimension(dimension)
            .build()
    }

    /// Classifies the lattice of this grid.
    pub fn form(&self) -> LatticeForm {
        let scale = self.lattice.norm();
        let orthorhombic = (0..3).all(|i| {
            (0..3).all(|j| i == j || self.lattice[(i, j)].abs() <= ORTHORHOMBIC_THRESHOLD * scale)
        });
        if orthorhombic {
            LatticeForm::Orthorhombic
        } else {
            LatticeForm::General
        }
    }

    /// Indicates whether axis `axis` is periodic.
    pub fn periodic(&self, axis: usize) -> bool {
        axis < self.dimension
    }

    /// The total number of grid points in one cell.
    pub fn n_points(&self) -> usize {
        self.mesh.iter().product()
    }

    /// The scale factors converting Cartesian coordinates into fractional coordinates along each
    /// axis of an orthorhombic cell, *i.e.* the reciprocals of the cell edge lengths.
    pub fn fractional_scale(&self) -> Vector3<f64> {
        Vector3::new(
            1.0 / self.lattice[(0, 0)],
            1.0 / self.lattice[(1, 1)],
            1.0 / self.lattice[(2, 2)],
        )
    }

    /// The grid-point spacing along axis `axis` of an orthorhombic cell.
    pub fn spacing(&self, axis: usize) -> f64 {
        self.lattice[(axis, axis)] / self.mesh[axis] as f64
    }

    /// The volume element associated with one grid point of an orthorhombic cell.
    pub fn voxel_volume(&self) -> f64 {
        (0..3).map(|axis| self.spacing(axis)).product()
    }
}
