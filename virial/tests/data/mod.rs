#![allow(dead_code)]

use ndarray::{Array1, Array2, Axis};

use virial::{Backend, ProdVirialSeA, ProdVirialParameters, VirialFloat, VirialOutput};

/// Sizes of a synthetic virial calculation
#[derive(Debug, Clone, Copy)]
pub struct Sizes {
    pub nframes: usize,
    pub nloc: usize,
    pub nall: usize,
    pub n_a_sel: usize,
    pub n_r_sel: usize,
}

impl Sizes {
    pub fn nnei(&self) -> usize {
        self.n_a_sel + self.n_r_sel
    }

    /// Descriptor size following the "se_a" layout: 4 entries per angular
    /// neighbor, and one entry per radial neighbor
    pub fn ndescrpt(&self) -> usize {
        4 * self.n_a_sel + self.n_r_sel
    }

    pub fn operator(&self) -> ProdVirialSeA {
        ProdVirialSeA::new(ProdVirialParameters {
            n_a_sel: self.n_a_sel,
            n_r_sel: self.n_r_sel,
        }).expect("invalid parameters")
    }
}

/// Inputs for a virial calculation, one row per frame
#[derive(Debug, Clone)]
pub struct VirialData<T> {
    pub sizes: Sizes,
    pub net_deriv: Array2<T>,
    pub in_deriv: Array2<T>,
    pub rij: Array2<T>,
    pub nlist: Array2<i32>,
    pub natoms: Array1<i32>,
}

/// Generate deterministic inputs for the given sizes. Different `seed` give
/// different values and neighbor lists. Roughly one neighbor in nine is
/// missing.
pub fn generate(sizes: Sizes, seed: usize) -> VirialData<f64> {
    let nloc = sizes.nloc;
    let offset = seed as f64;

    let net_deriv = Array2::from_shape_fn((sizes.nframes, nloc * sizes.ndescrpt()), |(frame, i)| {
        f64::sin(offset + 0.37 * i as f64 + 1.1 * frame as f64)
    });
    let in_deriv = Array2::from_shape_fn((sizes.nframes, nloc * sizes.ndescrpt() * 3), |(frame, i)| {
        0.5 * f64::cos(2.0 * offset + 0.11 * i as f64 - 0.7 * frame as f64)
    });
    let rij = Array2::from_shape_fn((sizes.nframes, nloc * sizes.nnei() * 3), |(frame, i)| {
        3.0 * f64::sin(3.0 * offset + 1.3 * i as f64 + 0.3 * frame as f64)
    });
    let nlist = Array2::from_shape_fn((sizes.nframes, nloc * sizes.nnei()), |(frame, i)| {
        if (i * 13 + frame * 5 + seed) % 9 == 4 {
            -1
        } else {
            ((i * 7 + frame * 3 + seed) % sizes.nall) as i32
        }
    });

    VirialData {
        sizes,
        net_deriv,
        in_deriv,
        rij,
        nlist,
        natoms: natoms(sizes),
    }
}

pub fn natoms(sizes: Sizes) -> Array1<i32> {
    Array1::from(vec![sizes.nloc as i32, sizes.nall as i32, sizes.nloc as i32, 0])
}

impl<T: VirialFloat> VirialData<T> {
    pub fn compute(&self, backend: Backend) -> VirialOutput<T> {
        self.sizes.operator().compute(
            backend,
            self.net_deriv.view(),
            self.in_deriv.view(),
            self.rij.view(),
            self.nlist.view(),
            self.natoms.view(),
        ).expect("failed to compute the virial")
    }

    /// Get the data for a single frame
    pub fn frame(&self, frame: usize) -> VirialData<T> {
        let select = |array: &Array2<T>| array.select(Axis(0), &[frame]);
        VirialData {
            sizes: Sizes { nframes: 1, ..self.sizes },
            net_deriv: select(&self.net_deriv),
            in_deriv: select(&self.in_deriv),
            rij: select(&self.rij),
            nlist: self.nlist.select(Axis(0), &[frame]),
            natoms: self.natoms.clone(),
        }
    }

    /// Remove the neighbor `slot` from the neighbor list of all atoms,
    /// together with the corresponding descriptor entries. `slot` must be
    /// in the angular selection.
    pub fn remove_angular_slot(&self, slot: usize) -> VirialData<T> {
        let sizes = self.sizes;
        assert!(slot < sizes.n_a_sel);

        let new_sizes = Sizes { n_a_sel: sizes.n_a_sel - 1, ..sizes };

        let keep_descriptor = |column: usize| {
            let aa = column % sizes.ndescrpt();
            !(4 * slot..4 * slot + 4).contains(&aa)
        };
        let keep_neighbor = |column: usize| column % sizes.nnei() != slot;

        let filter = |array: &Array2<T>, per_entry: usize, keep: &dyn Fn(usize) -> bool| {
            let columns = (0..array.ncols())
                .filter(|column| keep(column / per_entry))
                .collect::<Vec<_>>();
            array.select(Axis(1), &columns)
        };

        let nlist_columns = (0..self.nlist.ncols())
            .filter(|&column| keep_neighbor(column))
            .collect::<Vec<_>>();

        VirialData {
            sizes: new_sizes,
            net_deriv: filter(&self.net_deriv, 1, &keep_descriptor),
            in_deriv: filter(&self.in_deriv, 3, &keep_descriptor),
            rij: filter(&self.rij, 3, &keep_neighbor),
            nlist: self.nlist.select(Axis(1), &nlist_columns),
            natoms: self.natoms.clone(),
        }
    }
}

impl VirialData<f64> {
    pub fn to_f32(&self) -> VirialData<f32> {
        VirialData {
            sizes: self.sizes,
            net_deriv: self.net_deriv.mapv(|v| v as f32),
            in_deriv: self.in_deriv.mapv(|v| v as f32),
            rij: self.rij.mapv(|v| v as f32),
            nlist: self.nlist.clone(),
            natoms: self.natoms.clone(),
        }
    }
}

/// Sum the per-atom virial over all atoms, for each frame
pub fn sum_atom_virial<T: VirialFloat>(atom_virial: &Array2<T>) -> Array2<T> {
    let nframes = atom_virial.nrows();
    let mut sum = Array2::from_elem((nframes, 9), T::zero());
    for (frame, row) in atom_virial.axis_iter(Axis(0)).enumerate() {
        for (i, &value) in row.iter().enumerate() {
            sum[[frame, i % 9]] += value;
        }
    }
    sum
}
