use crate::Error;

/// Sizes of all the arrays involved in a virial calculation.
///
/// All arrays are stored as flat, row-major buffers with one row per frame
/// (configuration). The quantities below are the ones required to compute
/// offsets inside these buffers.
///
/// A shape can only be created with [`VirialShape::resolve`], which checks
/// that all the sizes are consistent with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirialShape {
    /// Number of frames in the batch
    pub(crate) nframes: usize,
    /// Number of local atoms in each frame
    pub(crate) nloc: usize,
    /// Number of local and ghost atoms in each frame
    pub(crate) nall: usize,
    /// Number of neighbor slots for each local atom
    pub(crate) nnei: usize,
    /// Size of the descriptor of a single atom
    pub(crate) ndescrpt: usize,
    /// Number of neighbor slots in the angular selection. These come first in
    /// the neighbor list, and are the only ones contributing to the virial.
    pub(crate) n_a_sel: usize,
    /// Number of descriptor entries for the angular selection, always
    /// `4 * n_a_sel`
    pub(crate) n_a_shift: usize,
}

impl VirialShape {
    /// Derive the virial shape from the `[rows, columns]` shape of the input
    /// arrays and the `natoms` array, checking that all of them are
    /// consistent with each other.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve(
        net_deriv: [usize; 2],
        in_deriv: [usize; 2],
        rij: [usize; 2],
        nlist: [usize; 2],
        natoms: &[i32],
        n_a_sel: usize,
        n_r_sel: usize,
    ) -> Result<VirialShape, Error> {
        if natoms.len() < 3 {
            return Err(Error::InvalidParameter(format!(
                "number of atoms should be larger than (or equal to) 3, got natoms with {} entries",
                natoms.len()
            )));
        }

        let nloc = usize::try_from(natoms[0]).map_err(|_| Error::InvalidParameter(format!(
            "the number of local atoms must be positive, got {}", natoms[0]
        )))?;
        let nall = usize::try_from(natoms[1]).map_err(|_| Error::InvalidParameter(format!(
            "the total number of atoms must be positive, got {}", natoms[1]
        )))?;

        if nloc == 0 {
            return Err(Error::InvalidParameter(
                "the number of local atoms must be at least 1".into()
            ));
        }

        if nloc > nall {
            return Err(Error::InvalidParameter(format!(
                "the number of local atoms ({}) can not be larger than the total number of atoms ({})",
                nloc, nall
            )));
        }

        if nlist[1] % nloc != 0 {
            return Err(Error::InvalidParameter(format!(
                "dim of nlist should be a multiple of the number of local atoms ({}), got {}",
                nloc, nlist[1]
            )));
        }

        if net_deriv[1] % nloc != 0 {
            return Err(Error::InvalidParameter(format!(
                "dim of net deriv should be a multiple of the number of local atoms ({}), got {}",
                nloc, net_deriv[1]
            )));
        }

        let nnei = nlist[1] / nloc;
        let ndescrpt = net_deriv[1] / nloc;
        let nframes = net_deriv[0];

        for (name, rows) in [("input deriv", in_deriv[0]), ("rij", rij[0]), ("nlist", nlist[0])] {
            if rows != nframes {
                return Err(Error::InvalidParameter(format!(
                    "number of samples should match: net deriv has {} frames, but {} has {}",
                    nframes, name, rows
                )));
            }
        }

        if nloc * ndescrpt * 3 != in_deriv[1] {
            return Err(Error::InvalidParameter(format!(
                "number of descriptors should match: expected {} columns in input deriv, got {}",
                nloc * ndescrpt * 3, in_deriv[1]
            )));
        }

        if nloc * nnei * 3 != rij[1] {
            return Err(Error::InvalidParameter(format!(
                "dim of rij should be nnei * 3: expected {} columns, got {}",
                nloc * nnei * 3, rij[1]
            )));
        }

        if nnei != n_a_sel + n_r_sel {
            return Err(Error::InvalidParameter(format!(
                "number of neighbors should match: got {} neighbors per atom, but n_a_sel + n_r_sel = {}",
                nnei, n_a_sel + n_r_sel
            )));
        }

        let shape = VirialShape {
            nframes,
            nloc,
            nall,
            nnei,
            ndescrpt,
            n_a_sel,
            n_a_shift: 4 * n_a_sel,
        };
        shape.check_selection()?;

        return Ok(shape);
    }

    /// Number of frames in the batch
    pub fn nframes(&self) -> usize {
        self.nframes
    }

    /// Number of local atoms in each frame
    pub fn nloc(&self) -> usize {
        self.nloc
    }

    /// Number of local and ghost atoms in each frame
    pub fn nall(&self) -> usize {
        self.nall
    }

    /// Number of neighbor slots for each local atom
    pub fn nnei(&self) -> usize {
        self.nnei
    }

    /// Size of the descriptor of a single atom
    pub fn ndescrpt(&self) -> usize {
        self.ndescrpt
    }

    /// Number of neighbor slots in the angular selection
    pub fn n_a_sel(&self) -> usize {
        self.n_a_sel
    }

    /// Number of descriptor entries for the angular selection
    pub fn n_a_shift(&self) -> usize {
        self.n_a_shift
    }

    /// Check that the angular selection fits in the neighbor list and in the
    /// descriptor of each atom
    pub(crate) fn check_selection(&self) -> Result<(), Error> {
        if self.n_a_sel > self.nnei {
            return Err(Error::InvalidParameter(format!(
                "too many angular neighbors: n_a_sel is {}, but there are only {} neighbors per atom",
                self.n_a_sel, self.nnei
            )));
        }

        if self.n_a_shift != 4 * self.n_a_sel || self.n_a_shift > self.ndescrpt {
            return Err(Error::InvalidParameter(format!(
                "the descriptor is too small for {} angular neighbors: expected at least {} entries per atom, got {}",
                self.n_a_sel, 4 * self.n_a_sel, self.ndescrpt
            )));
        }

        Ok(())
    }

    /// Check that all entries in the neighbor list are either negative
    /// (missing neighbor) or refer to one of the `nall` atoms
    pub(crate) fn check_neighbors(&self, nlist: &[i32]) -> Result<(), Error> {
        for (index, &neighbor) in nlist.iter().enumerate() {
            if neighbor >= 0 && neighbor as usize >= self.nall {
                let frame = index / self.nlist_stride();
                let center = (index % self.nlist_stride()) / self.nnei;
                let slot = index % self.nnei;
                return Err(Error::InvalidParameter(format!(
                    "invalid neighbor index {} for atom {} (slot {}) in frame {}: there are only {} atoms",
                    neighbor, center, slot, frame, self.nall
                )));
            }
        }

        Ok(())
    }

    /// Number of entries in one frame of `net_deriv`
    pub fn net_deriv_stride(&self) -> usize {
        self.nloc * self.ndescrpt
    }

    /// Number of entries in one frame of `in_deriv`
    pub fn in_deriv_stride(&self) -> usize {
        self.nloc * self.ndescrpt * 3
    }

    /// Number of entries in one frame of `rij`
    pub fn rij_stride(&self) -> usize {
        self.nloc * self.nnei * 3
    }

    /// Number of entries in one frame of `nlist`
    pub fn nlist_stride(&self) -> usize {
        self.nloc * self.nnei
    }

    /// Number of entries in one frame of `atom_virial`
    pub fn atom_virial_stride(&self) -> usize {
        9 * self.nall
    }

    /// Check that flat buffers have the lengths implied by this shape
    pub(crate) fn check_lengths(&self, lengths: &[(&str, usize, usize)]) -> Result<(), Error> {
        for &(name, actual, stride) in lengths {
            if actual != self.nframes * stride {
                return Err(Error::InvalidParameter(format!(
                    "expected {} to contain {} values ({} frames of {}), got {}",
                    name, self.nframes * stride, self.nframes, stride, actual
                )));
            }
        }
        Ok(())
    }
}
