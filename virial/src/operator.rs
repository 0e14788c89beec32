use log::debug;
use ndarray::{Array2, ArrayView1, ArrayView2, CowArray, Ix2};

use crate::{Error, VirialShape};
use crate::kernel::{Backend, VirialFloat, VirialInputs};

/// Parameters of the virial calculation, fixed when creating a
/// [`ProdVirialSeA`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ProdVirialParameters {
    /// Number of neighbors in the angular selection, i.e. the first
    /// `n_a_sel` entries of the neighbor list of each atom
    pub n_a_sel: usize,
    /// Number of neighbors in the radial-only selection, coming after the
    /// angular neighbors in the neighbor list. These neighbors do not
    /// contribute to the virial.
    pub n_r_sel: usize,
}

/// Result of a virial calculation
#[derive(Debug, Clone)]
pub struct VirialOutput<T> {
    /// Virial for each frame, with shape `[nframes, 9]`. Each row contains a
    /// row-major 3x3 matrix.
    pub virial: Array2<T>,
    /// Per-atom virial for each frame, with shape `[nframes, 9 * nall]`. The
    /// 9 values of atom `i` start at column `9 * i`.
    pub atom_virial: Array2<T>,
}

/// Virial and per-atom virial for "se_a" descriptors.
///
/// Given the derivatives of the energy w.r.t. the descriptor (`net_deriv`),
/// the derivatives of the descriptor w.r.t. the positions of neighbors
/// (`in_deriv`), the displacement vectors to the neighbors (`rij`) and the
/// neighbor list itself (`nlist`), this computes the virial of each frame and
/// its decomposition on all atoms.
///
/// ```
/// use ndarray::{arr1, arr2};
/// use virial::{Backend, ProdVirialSeA};
///
/// let operator = ProdVirialSeA::from_json(r#"{"n_a_sel": 1, "n_r_sel": 0}"#).unwrap();
///
/// let net_deriv = arr2(&[[1.0, 0.0, 0.0, 0.0]]);
/// let in_deriv = arr2(&[[2.0, 0.0, 0.0,  0.0, 0.0, 0.0,  0.0, 0.0, 0.0,  0.0, 0.0, 0.0]]);
/// let rij = arr2(&[[0.0, 1.5, 0.0]]);
/// let nlist = arr2(&[[1]]);
/// let natoms = arr1(&[1, 2, 1]);
///
/// let output = operator.compute(
///     Backend::Sequential,
///     net_deriv.view(), in_deriv.view(), rij.view(), nlist.view(), natoms.view(),
/// ).unwrap();
///
/// assert_eq!(output.virial.row(0).to_vec(), [0.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
/// assert_eq!(output.atom_virial.shape(), [1, 18]);
/// ```
#[derive(Debug, Clone)]
pub struct ProdVirialSeA {
    parameters: ProdVirialParameters,
    n_a_shift: usize,
}

impl ProdVirialSeA {
    /// Create a new operator with the given `parameters`
    pub fn new(parameters: ProdVirialParameters) -> Result<ProdVirialSeA, Error> {
        let n_a_shift = parameters.n_a_sel.checked_mul(4).ok_or_else(|| Error::InvalidParameter(format!(
            "n_a_sel is too large: {}", parameters.n_a_sel
        )))?;

        if parameters.n_a_sel.checked_add(parameters.n_r_sel).is_none() {
            return Err(Error::InvalidParameter(format!(
                "n_a_sel + n_r_sel is too large: {} + {}", parameters.n_a_sel, parameters.n_r_sel
            )));
        }

        return Ok(ProdVirialSeA { parameters, n_a_shift });
    }

    /// Create a new operator with parameters given as JSON
    pub fn from_json(parameters: &str) -> Result<ProdVirialSeA, Error> {
        let parameters = serde_json::from_str::<ProdVirialParameters>(parameters)?;
        return ProdVirialSeA::new(parameters);
    }

    /// Get the parameters used to create this operator as a JSON string
    pub fn parameters(&self) -> String {
        serde_json::to_string(&self.parameters).expect("failed to serialize to JSON")
    }

    /// Get the JSON schema describing the parameters of this operator
    pub fn parameters_schema() -> String {
        let schema = schemars::schema_for!(ProdVirialParameters);
        serde_json::to_string_pretty(&schema).expect("failed to serialize to JSON")
    }

    /// Number of neighbors in the angular selection
    pub fn n_a_sel(&self) -> usize {
        self.parameters.n_a_sel
    }

    /// Number of neighbors in the radial-only selection
    pub fn n_r_sel(&self) -> usize {
        self.parameters.n_r_sel
    }

    /// Number of descriptor entries associated with the angular selection
    pub fn n_a_shift(&self) -> usize {
        self.n_a_shift
    }

    /// Compute the virial and per-atom virial with the given `backend`.
    ///
    /// `net_deriv`, `in_deriv`, `rij` and `nlist` must contain one row per
    /// frame; `natoms` must contain at least 3 entries, the first one being
    /// the number of local atoms and the second one the total number of atoms
    /// (local and ghosts). All other values in `natoms` are ignored.
    ///
    /// This function checks that all shapes are consistent, and that the
    /// neighbor list only refers to existing atoms.
    #[time_graph::instrument(name = "ProdVirialSeA::compute")]
    pub fn compute<T: VirialFloat>(
        &self,
        backend: Backend,
        net_deriv: ArrayView2<'_, T>,
        in_deriv: ArrayView2<'_, T>,
        rij: ArrayView2<'_, T>,
        nlist: ArrayView2<'_, i32>,
        natoms: ArrayView1<'_, i32>,
    ) -> Result<VirialOutput<T>, Error> {
        let natoms = natoms.to_vec();
        let shape = VirialShape::resolve(
            dim(&net_deriv),
            dim(&in_deriv),
            dim(&rij),
            dim(&nlist),
            &natoms,
            self.parameters.n_a_sel,
            self.parameters.n_r_sel,
        )?;

        debug!(
            "computing virial of {} frames with {} local atoms ({} in total), {} neighbors and {} descriptors per atom, using {} backend",
            shape.nframes, shape.nloc, shape.nall, shape.nnei, shape.ndescrpt, backend.name()
        );

        let net_deriv = net_deriv.as_standard_layout();
        let in_deriv = in_deriv.as_standard_layout();
        let rij = rij.as_standard_layout();
        let nlist = nlist.as_standard_layout();

        let inputs = VirialInputs {
            net_deriv: contiguous(&net_deriv),
            in_deriv: contiguous(&in_deriv),
            rij: contiguous(&rij),
            nlist: contiguous(&nlist),
        };

        let mut virial = vec![T::zero(); 9 * shape.nframes];
        let mut atom_virial = vec![T::zero(); shape.atom_virial_stride() * shape.nframes];
        backend.compute_into(&shape, &inputs, &mut virial, &mut atom_virial)?;

        let virial = Array2::from_shape_vec((shape.nframes, 9), virial)
            .expect("wrong size for the virial array");
        let atom_virial = Array2::from_shape_vec((shape.nframes, shape.atom_virial_stride()), atom_virial)
            .expect("wrong size for the atom virial array");

        return Ok(VirialOutput { virial, atom_virial });
    }
}

fn dim<T>(array: &ArrayView2<'_, T>) -> [usize; 2] {
    let (rows, columns) = array.dim();
    [rows, columns]
}

fn contiguous<'a, T>(array: &'a CowArray<'_, T, Ix2>) -> &'a [T] {
    array.as_slice().expect("array in standard layout should be contiguous")
}
