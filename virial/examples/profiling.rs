use ndarray::{Array1, Array2};

use virial::{Backend, ProdVirialSeA, Reduction};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let backend = match std::env::args().nth(1).as_deref() {
        None | Some("sequential") => Backend::Sequential,
        Some("atomic") => Backend::Parallel { reduction: Reduction::Atomic },
        Some("thread-local") => Backend::Parallel { reduction: Reduction::ThreadLocal },
        Some(other) => {
            return Err(format!(
                "unknown backend '{}', expected one of 'sequential', 'atomic' or 'thread-local'", other
            ).into());
        }
    };

    // enable collection of profiling data
    time_graph::enable_data_collection(true);
    // clear any existing collected data
    time_graph::clear_collected_data();

    // run the calculation
    time_graph::spanned!("Full calculation", {
        compute_virial(backend)
    })?;

    // get the call graph and display it
    let graph = time_graph::get_full_graph();
    // (this requires the "table" feature for the time_graph crate)
    println!("{}", graph.as_short_table());

    // also available for saving profiling data to the disk & future analysis
    // (this requires the "json" feature for the time_graph crate)
    println!("{}", graph.as_json());

    Ok(())
}

/// Compute the virial of 10 frames, using typical sizes for a water system
fn compute_virial(backend: Backend) -> Result<(), Box<dyn std::error::Error>> {
    let parameters = r#"{
        "n_a_sel": 138,
        "n_r_sel": 0
    }"#;
    let operator = ProdVirialSeA::from_json(parameters)?;

    let nframes = 10;
    let nloc = 192;
    let nall = 1536;
    let nnei = operator.n_a_sel() + operator.n_r_sel();
    let ndescrpt = operator.n_a_shift() + operator.n_r_sel();

    let net_deriv = Array2::from_shape_fn((nframes, nloc * ndescrpt), |(f, i)| f64::sin((i * (f + 1)) as f64));
    let in_deriv = Array2::from_shape_fn((nframes, 3 * nloc * ndescrpt), |(f, i)| f64::cos((i + f) as f64));
    let rij = Array2::from_shape_fn((nframes, 3 * nloc * nnei), |(f, i)| 3.0 * f64::sin((i + 2 * f) as f64));
    let nlist = Array2::from_shape_fn((nframes, nloc * nnei), |(f, i)| ((17 * i + f) % nall) as i32);
    let natoms = Array1::from(vec![nloc as i32, nall as i32, nloc as i32]);

    let output = operator.compute(
        backend, net_deriv.view(), in_deriv.view(), rij.view(), nlist.view(), natoms.view(),
    )?;

    println!("virial of the first frame: {}", output.virial.row(0));

    Ok(())
}
