//! Reduction kernels computing the virial from descriptor derivatives.
//!
//! Both backends share the per-pair computation in [`pair_contribution`], and
//! only differ in how the loop over frames and atoms is scheduled, and how
//! contributions from different pairs are summed together.

use std::fmt::Debug;
use std::ops::{AddAssign, SubAssign};

use num_traits::Float;

use crate::{Error, VirialShape};

mod atomic;
pub use self::atomic::AtomicAdd;

mod sequential;
pub use self::sequential::Sequential;

mod parallel;
pub use self::parallel::{Parallel, Reduction};

/// Floating point types the virial can be computed with, i.e. `f32` and
/// `f64`.
pub trait VirialFloat: Float + AtomicAdd + AddAssign + SubAssign + Send + Sync + Debug + 'static {}

impl VirialFloat for f32 {}
impl VirialFloat for f64 {}

/// Flat input buffers for the virial calculation, containing all frames one
/// after the other.
#[derive(Debug, Clone, Copy)]
pub struct VirialInputs<'a, T> {
    /// Derivative of the network output w.r.t. the descriptor, with
    /// `nloc * ndescrpt` values per frame
    pub net_deriv: &'a [T],
    /// Derivative of the descriptor w.r.t. the neighbor positions, with
    /// `nloc * ndescrpt * 3` values per frame
    pub in_deriv: &'a [T],
    /// Displacement vectors from each local atom to its neighbors, with
    /// `nloc * nnei * 3` values per frame
    pub rij: &'a [T],
    /// Index of the neighbors of each local atom, with `nloc * nnei` values
    /// per frame. Negative values are used for missing neighbors.
    pub nlist: &'a [i32],
}

impl<'a, T> VirialInputs<'a, T> {
    /// Get the inputs corresponding to a single frame
    #[inline]
    pub(crate) fn frame(&self, shape: &VirialShape, frame: usize) -> VirialInputs<'a, T> {
        let slice = |stride: usize| frame * stride..(frame + 1) * stride;
        let (net_deriv, in_deriv, rij, nlist) = (self.net_deriv, self.in_deriv, self.rij, self.nlist);
        VirialInputs {
            net_deriv: &net_deriv[slice(shape.net_deriv_stride())],
            in_deriv: &in_deriv[slice(shape.in_deriv_stride())],
            rij: &rij[slice(shape.rij_stride())],
            nlist: &nlist[slice(shape.nlist_stride())],
        }
    }
}

/// Compute the contribution to the virial of the pair between the local atom
/// `center` and the neighbor in slot `slot`, using the inputs of a single
/// `frame`.
///
/// This returns the global index of the neighbor and the 3x3 contribution
/// (row-major, rows following the descriptor derivative and columns the
/// displacement vector), or `None` if this pair does not contribute.
///
/// Only the angular selection (`slot < n_a_sel`) contributes to the virial,
/// with descriptor entries `4 * slot .. 4 * slot + 4` for this neighbor.
#[inline]
pub(crate) fn pair_contribution<T: VirialFloat>(
    shape: &VirialShape,
    frame: &VirialInputs<'_, T>,
    center: usize,
    slot: usize,
) -> Option<(usize, [T; 9])> {
    if slot >= shape.n_a_sel {
        return None;
    }

    let neighbor = frame.nlist[center * shape.nnei + slot];
    let neighbor = usize::try_from(neighbor).ok()?;

    let rij_start = (center * shape.nnei + slot) * 3;
    let rij = &frame.rij[rij_start..rij_start + 3];

    let mut contribution = [T::zero(); 9];
    for aa in (4 * slot)..(4 * slot + 4) {
        let descriptor = center * shape.ndescrpt + aa;
        let pref = -frame.net_deriv[descriptor];
        let in_deriv = &frame.in_deriv[3 * descriptor..3 * descriptor + 3];

        for dd0 in 0..3 {
            for dd1 in 0..3 {
                let tmp_v = pref * rij[dd1] * in_deriv[dd0];
                contribution[dd0 * 3 + dd1] -= tmp_v;
            }
        }
    }

    return Some((neighbor, contribution));
}

/// Iterate over all the contributions coming from the neighbors of `center`,
/// in increasing slot order.
#[inline]
pub(crate) fn atom_contributions<'a, T: VirialFloat>(
    shape: &'a VirialShape,
    frame: &'a VirialInputs<'a, T>,
    center: usize,
) -> impl Iterator<Item = (usize, [T; 9])> + 'a {
    (0..shape.n_a_sel).filter_map(move |slot| pair_contribution(shape, frame, center, slot))
}

/// A strategy to execute the virial reduction.
pub trait VirialBackend {
    /// Get the name of this backend, used for logging and profiling
    fn name(&self) -> &'static str;

    /// Accumulate the contributions of all pairs in `inputs` into `virial`
    /// (`9` values per frame) and `atom_virial` (`9 * nall` values per frame).
    ///
    /// The outputs are zero-initialized and have the right size when this
    /// function is called. All neighbor indexes in `inputs.nlist` are either
    /// negative or smaller than `shape.nall`.
    fn accumulate<T: VirialFloat>(
        &self,
        shape: &VirialShape,
        inputs: &VirialInputs<'_, T>,
        virial: &mut [T],
        atom_virial: &mut [T],
    );
}

/// Selection of the backend used to run the virial reduction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
pub enum Backend {
    /// Single-threaded reduction, iterating over frames, local atoms and
    /// neighbors in order. Results are reproducible to the last bit.
    #[default]
    Sequential,
    /// Multi-threaded reduction over (frame, local atom) pairs. The order of
    /// the floating point additions is not fixed, so the last bits of the
    /// results can change from one run to the other.
    Parallel {
        /// How contributions to the same output are combined
        #[serde(default)]
        reduction: Reduction,
    },
}

impl Backend {
    /// Get the name of this backend
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Sequential => Sequential.name(),
            Backend::Parallel { reduction } => Parallel { reduction: *reduction }.name(),
        }
    }

    /// Compute the virial and per-atom virial for the given `inputs` in
    /// pre-allocated flat buffers.
    ///
    /// `virial` must contain `9 * nframes` values and `atom_virial`
    /// `9 * nall * nframes` values. Both are overwritten. All the entries in
    /// `inputs.nlist` must be either negative or smaller than `nall`.
    pub fn compute_into<T: VirialFloat>(
        &self,
        shape: &VirialShape,
        inputs: &VirialInputs<'_, T>,
        virial: &mut [T],
        atom_virial: &mut [T],
    ) -> Result<(), Error> {
        shape.check_lengths(&[
            ("net_deriv", inputs.net_deriv.len(), shape.net_deriv_stride()),
            ("in_deriv", inputs.in_deriv.len(), shape.in_deriv_stride()),
            ("rij", inputs.rij.len(), shape.rij_stride()),
            ("nlist", inputs.nlist.len(), shape.nlist_stride()),
            ("virial", virial.len(), 9),
            ("atom_virial", atom_virial.len(), shape.atom_virial_stride()),
        ])?;
        shape.check_selection()?;
        shape.check_neighbors(inputs.nlist)?;

        virial.fill(T::zero());
        atom_virial.fill(T::zero());

        match *self {
            Backend::Sequential => Sequential.accumulate(shape, inputs, virial, atom_virial),
            Backend::Parallel { reduction } => {
                Parallel { reduction }.accumulate(shape, inputs, virial, atom_virial);
            }
        }

        Ok(())
    }
}
