use crate::VirialShape;

use super::{VirialBackend, VirialFloat, VirialInputs, atom_contributions};

/// Single-threaded virial reduction.
///
/// Pairs are visited frame by frame, then in increasing local atom and
/// neighbor slot order, which makes the result bit-for-bit reproducible.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl VirialBackend for Sequential {
    fn name(&self) -> &'static str {
        "sequential"
    }

    #[time_graph::instrument(name = "Sequential::accumulate")]
    fn accumulate<T: VirialFloat>(
        &self,
        shape: &VirialShape,
        inputs: &VirialInputs<'_, T>,
        virial: &mut [T],
        atom_virial: &mut [T],
    ) {
        let frames = virial.chunks_exact_mut(9)
            .zip(atom_virial.chunks_exact_mut(shape.atom_virial_stride()))
            .enumerate();

        for (frame_i, (virial, atom_virial)) in frames {
            let frame = inputs.frame(shape, frame_i);

            for center in 0..shape.nloc {
                for (neighbor, contribution) in atom_contributions(shape, &frame, center) {
                    let atom_virial = &mut atom_virial[9 * neighbor..9 * neighbor + 9];
                    for (i, &value) in contribution.iter().enumerate() {
                        virial[i] += value;
                        atom_virial[i] += value;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_on_neighbors() {
        // two local atoms, both seeing atom 2 (a ghost) in their first slot,
        // and each other in the second slot
        let shape = VirialShape {
            nframes: 1,
            nloc: 2,
            nall: 3,
            nnei: 2,
            ndescrpt: 8,
            n_a_sel: 2,
            n_a_shift: 8,
        };

        let net_deriv = [1.0; 16];
        let mut in_deriv = [0.0; 48];
        // only the first channel of each neighbor has a derivative, along x
        for aa in [0, 4, 8, 12] {
            in_deriv[3 * aa] = 1.0;
        }
        let rij = [
            1.0, 0.0, 0.0,   2.0, 0.0, 0.0,
            0.0, 3.0, 0.0,   0.0, 0.0, 4.0,
        ];
        let nlist = [2, 1, 2, 0];

        let inputs = VirialInputs { net_deriv: &net_deriv, in_deriv: &in_deriv, rij: &rij, nlist: &nlist };
        let mut virial = [0.0; 9];
        let mut atom_virial = [0.0; 27];
        Sequential.accumulate(&shape, &inputs, &mut virial, &mut atom_virial);

        assert_eq!(virial, [3.0, 3.0, 4.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(atom_virial[0..9], [0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(atom_virial[9..18], [2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(atom_virial[18..27], [1.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }
}
