//! # gridgto: numerical integration of Gaussian-type orbitals on uniform grids
//!
//! `gridgto` evaluates one- and two-centre overlap-like integrals between contracted
//! Gaussian-type-orbital (GTO) shell pairs and scalar fields (potentials or densities) sampled on
//! a uniform real-space mesh, as required by grid-based electronic-structure methods such as
//! periodic density-functional theory.
//!
//! The evaluation exploits the separability of the Gaussian product along the three Cartesian
//! axes: a stable 1D exponential recursion builds the values of
//! $`\exp[-\alpha(x - x_0)^2] (x - x_0)^l`$ on every relevant grid point across all periodic
//! images within a precision-derived cutoff radius, after which three sequential matrix
//! contractions reduce the sampled weight field to angular-momentum-resolved Cartesian integrals.
//! These are contracted over primitive Gaussians with coefficient-magnitude screening and finally
//! transformed to pure (real solid-harmonic) form where requested.
//!
//! The main entry points are [`numint::fill_two_center`] and [`numint::overlap_matrix`], which
//! populate dense atomic-orbital matrices over rectangular shell ranges, parallelised over shell
//! pairs with `rayon`.
//!
//! Only orthorhombic lattices are supported: requests involving general (non-orthorhombic)
//! lattice vectors are rejected with an explicit unsupported-feature error rather than being
//! silently approximated.

pub mod angmom;
pub mod basis;
pub mod grid;
pub mod numint;
