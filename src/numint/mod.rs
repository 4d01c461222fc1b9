//! Numerical integration of contracted GTO shell pairs against scalar fields on uniform grids.
//!
//! The modules here follow the data flow of the evaluation: [`recursion`] builds per-axis
//! exponential-power tables with periodic image folding, [`contract`] reduces the weight field
//! against those tables into combined-angular-momentum Cartesian integrals for one primitive
//! pair, [`shell_pair`] contracts primitives into shell-pair blocks and applies the pure
//! transformation, and [`fill`] populates dense matrices over shell-pair ranges in parallel.

pub mod contract;
pub mod fill;
pub mod recursion;
pub mod shell_pair;

pub use fill::{fill_two_center, overlap_matrix, FillMode};
pub use recursion::gto_cutoff_radius;
pub use shell_pair::{eval_shell_pair, required_cache_len, CacheLayout, PairScratch};

/// The natural-log threshold above which `eij - logcc` renders a primitive pair negligible.
///
/// `eij` is the Gaussian-product distance penalty of the pair and `logcc` the log of the largest
/// combined contraction-coefficient magnitude, so pairs failing this test cannot contribute more
/// than $`\mathrm{e}^{-40}`$ of a coefficient-scaled primitive integral to any contracted
/// function.
pub const PRIM_SCREEN_CUTOFF: f64 = 40.0;
