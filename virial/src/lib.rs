#![warn(clippy::all, clippy::pedantic)]

// disable some style lints
#![allow(clippy::needless_return, clippy::must_use_candidate, clippy::comparison_chain)]
#![allow(clippy::redundant_field_names, clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unreadable_literal, clippy::option_if_let_else, clippy::range_plus_one)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::module_name_repetitions)]

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap, clippy::cast_lossless, clippy::cast_sign_loss)]
#![allow(clippy::default_trait_access)]

// Tests lints
#![cfg_attr(test, allow(clippy::float_cmp))]

//! Virial of machine-learned interatomic potentials using "se_a" (smooth
//! edition, angular) descriptors.
//!
//! Given the derivative of the network output with respect to the descriptor,
//! the derivative of the descriptor with respect to atomic positions and the
//! displacement vectors between atoms and their neighbors, this crate computes
//! the 3x3 virial of each configuration, as well as its decomposition on all
//! atoms (including ghost atoms).

mod errors;
pub use self::errors::Error;

mod shape;
pub use self::shape::VirialShape;

pub mod kernel;
pub use self::kernel::{Backend, Reduction, VirialFloat, VirialInputs};

mod operator;
pub use self::operator::{ProdVirialSeA, ProdVirialParameters, VirialOutput};
