//! Contracted atomic-orbital shells.

use std::fmt;
use std::ops::Index;

use anyhow::{self, format_err};
use derive_builder::Builder;
use nalgebra::Point3;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::angmom::{n_cart, n_pure, ANGMOM_LABELS};

#[cfg(test)]
#[path = "ao_tests.rs"]
mod ao_tests;

// ---------
// ShellKind
// ---------

/// The two closed kinds of shell functions an integral driver can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShellKind {
    /// Cartesian components $`x^{l_x} y^{l_y} z^{l_z}`$ in lexicographic order.
    Cartesian,

    /// Pure (real solid-harmonic) components in increasing-$`m`$ order.
    Pure,
}

impl fmt::Display for ShellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellKind::Cartesian => write!(f, "cartesian"),
            ShellKind::Pure => write!(f, "pure"),
        }
    }
}

// ---------------
// ContractedShell
// ---------------

/// A structure to handle a group of basis functions sharing a centre, an angular momentum and a
/// set of primitive Gaussian exponents.
///
/// The contraction-coefficient matrix has one row per primitive and one column per contracted
/// function, so a single shell structure describes a general (segmented or family-style)
/// contraction.
#[derive(Clone, Builder, Debug, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct ContractedShell {
    /// The angular momentum $`l`$ of the shell.
    pub l: u32,

    /// The Cartesian origin $`\mathbf{R}`$ of the shell.
    pub cart_origin: Point3<f64>,

    /// The primitive Gaussian exponents $`\alpha_p`$.
    pub exponents: Array1<f64>,

    /// The contraction coefficients, shaped (primitives $`\times`$ contracted functions).
    pub coefficients: Array2<f64>,
}

impl ContractedShellBuilder {
    fn validate(&self) -> Result<(), String> {
        let exponents = self
            .exponents
            .as_ref()
            .ok_or("No primitive exponents found.".to_string())?;
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or("No contraction coefficients found.".to_string())?;
        if exponents.is_empty() {
            return Err("At least one primitive exponent is required.".to_string());
        }
        if exponents.iter().any(|&a| a <= 0.0 || !a.is_finite()) {
            return Err("Primitive exponents must be finite and positive.".to_string());
        }
        if coefficients.nrows() != exponents.len() {
            return Err(format!(
                "The coefficient matrix has {} rows but {} primitive exponents were given.",
                coefficients.nrows(),
                exponents.len()
            ));
        }
        if coefficients.ncols() == 0 {
            return Err("At least one contracted function is required.".to_string());
        }
        Ok(())
    }
}

impl ContractedShell {
    /// Returns a builder to construct a new [`ContractedShell`].
    pub fn builder() -> ContractedShellBuilder {
        ContractedShellBuilder::default()
    }

    /// Constructs a new [`ContractedShell`] from its angular momentum, centre, primitive
    /// exponents and contraction-coefficient matrix.
    ///
    /// # Errors
    ///
    /// Errors if the exponent and coefficient arrays have inconsistent shapes or non-positive
    /// exponents.
    pub fn new(
        l: u32,
        cart_origin: Point3<f64>,
        exponents: Array1<f64>,
        coefficients: Array2<f64>,
    ) -> Result<Self, anyhow::Error> {
        Self::builder()
            .l(l)
            .cart_origin(cart_origin)
            .exponents(exponents)
            .coefficients(coefficients)
            .build()
            .map_err(|err| format_err!(err))
    }

    /// The number of primitive Gaussians in this shell.
    pub fn n_primitives(&self) -> usize {
        self.exponents.len()
    }

    /// The number of contracted functions sharing the primitives of this shell.
    pub fn n_contractions(&self) -> usize {
        self.coefficients.ncols()
    }

    /// The number of Cartesian components per contracted function.
    pub fn n_cart(&self) -> usize {
        n_cart(self.l)
    }

    /// The number of pure components per contracted function.
    pub fn n_pure(&self) -> usize {
        n_pure(self.l)
    }

    /// The number of basis functions this shell contributes for a given function kind.
    pub fn n_funcs(&self, kind: ShellKind) -> usize {
        let per_contraction = match kind {
            ShellKind::Cartesian => self.n_cart(),
            ShellKind::Pure => self.n_pure(),
        };
        self.n_contractions() * per_contraction
    }

    /// Returns, for each primitive, the natural logarithm of the largest contraction-coefficient
    /// magnitude using that primitive.
    ///
    /// These values bound the contribution any contracted function can receive from a primitive
    /// pair and drive the screening of negligible pairs. A primitive with all-zero coefficients
    /// yields $`-\infty`$ and is therefore always screened out.
    pub fn log_max_coefficients(&self) -> Array1<f64> {
        Array1::from_iter(self.coefficients.rows().into_iter().map(|row| {
            row.iter()
                .fold(0.0f64, |acc, &c| acc.max(c.abs()))
                .ln()
        }))
    }
}

impl fmt::Display for ContractedShell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{} primitives, {} contractions] @ ({:+.4}, {:+.4}, {:+.4})",
            ANGMOM_LABELS
                .get(self.l as usize)
                .copied()
                .unwrap_or("higher"),
            self.n_primitives(),
            self.n_contractions(),
            self.cart_origin[0],
            self.cart_origin[1],
            self.cart_origin[2],
        )
    }
}

// ----------
// ShellBasis
// ----------

/// A structure to manage an ordered collection of contracted shells.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShellBasis {
    shells: Vec<ContractedShell>,
}

impl ShellBasis {
    /// Creates a new [`ShellBasis`] from an ordered vector of shells.
    pub fn new(shells: Vec<ContractedShell>) -> Self {
        Self { shells }
    }

    /// The number of shells in the basis.
    pub fn n_shells(&self) -> usize {
        self.shells.len()
    }

    /// The total number of basis functions for a given function kind.
    pub fn n_funcs(&self, kind: ShellKind) -> usize {
        self.shells.iter().map(|shell| shell.n_funcs(kind)).sum()
    }

    /// Returns an iterator over the shells in the basis.
    pub fn shells(&self) -> impl Iterator<Item = &ContractedShell> {
        self.shells.iter()
    }

    /// Returns the starting (inclusive) and ending (exclusive) basis-function indices of every
    /// shell for a given function kind.
    pub fn function_boundaries(&self, kind: ShellKind) -> Vec<(usize, usize)> {
        self.shells
            .iter()
            .scan(0, |acc, shell| {
                let shell_length = shell.n_funcs(kind);
                let boundary = (*acc, *acc + shell_length);
                *acc += shell_length;
                Some(boundary)
            })
            .collect::<Vec<_>>()
    }
}

impl Index<usize> for ShellBasis {
    type Output = ContractedShell;

    fn index(&self, i: usize) -> &Self::Output {
        self.shells
            .get(i)
            .unwrap_or_else(|| panic!("Unable to obtain the shell with index {i}."))
    }
}
