use std::cell::RefCell;

use log::info;
use rayon::prelude::*;
use thread_local::ThreadLocal;

use crate::VirialShape;

use super::{VirialBackend, VirialFloat, VirialInputs, atom_contributions};

/// Strategy used to combine contributions targeting the same output entry
/// when running in parallel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
pub enum Reduction {
    /// All threads add their contributions directly to shared outputs, using
    /// atomic floating point additions.
    #[default]
    Atomic,
    /// Each thread accumulates into its own copy of the outputs, and the
    /// copies are summed once all pairs have been visited. This trades memory
    /// (one full copy of the outputs per thread) for contention-free
    /// accumulation.
    ThreadLocal,
}

/// Multi-threaded virial reduction, distributing (frame, local atom) pairs
/// over the rayon thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct Parallel {
    /// How contributions to the same output are combined
    pub reduction: Reduction,
}

impl VirialBackend for Parallel {
    fn name(&self) -> &'static str {
        match self.reduction {
            Reduction::Atomic => "parallel (atomic)",
            Reduction::ThreadLocal => "parallel (thread local)",
        }
    }

    #[time_graph::instrument(name = "Parallel::accumulate")]
    fn accumulate<T: VirialFloat>(
        &self,
        shape: &VirialShape,
        inputs: &VirialInputs<'_, T>,
        virial: &mut [T],
        atom_virial: &mut [T],
    ) {
        if rayon::current_num_threads() == 1 {
            info!("running the parallel virial reduction with a single thread");
        }

        match self.reduction {
            Reduction::Atomic => accumulate_atomic(shape, inputs, virial, atom_virial),
            Reduction::ThreadLocal => accumulate_thread_local(shape, inputs, virial, atom_virial),
        }
    }
}

fn accumulate_atomic<T: VirialFloat>(
    shape: &VirialShape,
    inputs: &VirialInputs<'_, T>,
    virial: &mut [T],
    atom_virial: &mut [T],
) {
    let shared_virial = virial.iter().map(|&v| T::new_atomic(v)).collect::<Vec<_>>();
    let shared_atom_virial = atom_virial.iter().map(|&v| T::new_atomic(v)).collect::<Vec<_>>();

    (0..shape.nframes * shape.nloc).into_par_iter().for_each(|work_item| {
        let frame_i = work_item / shape.nloc;
        let center = work_item % shape.nloc;

        let frame = inputs.frame(shape, frame_i);
        let stride = shape.atom_virial_stride();
        let atom_virial = &shared_atom_virial[frame_i * stride..(frame_i + 1) * stride];

        // contributions to the global virial are summed locally first, to
        // only touch the (heavily contended) shared values once per atom
        let mut local_virial = [T::zero(); 9];
        for (neighbor, contribution) in atom_contributions(shape, &frame, center) {
            for (i, &value) in contribution.iter().enumerate() {
                local_virial[i] += value;
                T::atomic_add(&atom_virial[9 * neighbor + i], value);
            }
        }

        for (i, &value) in local_virial.iter().enumerate() {
            T::atomic_add(&shared_virial[9 * frame_i + i], value);
        }
    });

    for (output, shared) in virial.iter_mut().zip(shared_virial) {
        *output = T::into_value(shared);
    }

    for (output, shared) in atom_virial.iter_mut().zip(shared_atom_virial) {
        *output = T::into_value(shared);
    }
}

/// Per-thread copy of the outputs
struct LocalOutputs<T> {
    virial: Vec<T>,
    atom_virial: Vec<T>,
}

fn accumulate_thread_local<T: VirialFloat>(
    shape: &VirialShape,
    inputs: &VirialInputs<'_, T>,
    virial: &mut [T],
    atom_virial: &mut [T],
) {
    let virial_len = virial.len();
    let atom_virial_len = atom_virial.len();
    let local_outputs = ThreadLocal::new();

    (0..shape.nframes * shape.nloc).into_par_iter().for_each(|work_item| {
        let frame_i = work_item / shape.nloc;
        let center = work_item % shape.nloc;

        let mut outputs = local_outputs.get_or(|| RefCell::new(LocalOutputs {
            virial: vec![T::zero(); virial_len],
            atom_virial: vec![T::zero(); atom_virial_len],
        })).borrow_mut();
        let LocalOutputs { virial, atom_virial } = &mut *outputs;

        let frame = inputs.frame(shape, frame_i);
        let virial = &mut virial[9 * frame_i..9 * frame_i + 9];
        let stride = shape.atom_virial_stride();
        let atom_virial = &mut atom_virial[frame_i * stride..(frame_i + 1) * stride];

        for (neighbor, contribution) in atom_contributions(shape, &frame, center) {
            for (i, &value) in contribution.iter().enumerate() {
                virial[i] += value;
                atom_virial[9 * neighbor + i] += value;
            }
        }
    });

    for outputs in local_outputs {
        let outputs = outputs.into_inner();
        for (output, value) in virial.iter_mut().zip(outputs.virial) {
            *output += value;
        }

        for (output, value) in atom_virial.iter_mut().zip(outputs.atom_virial) {
            *output += value;
        }
    }
}
