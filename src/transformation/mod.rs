// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The symbolic points-to domain: field graphs, atoms, terms and
//! transformations.
//!
//! All values here are immutable; every operation builds a fresh value.

pub mod atom;
pub mod field_graph;
pub mod term;
#[allow(clippy::module_inception)]
pub mod transformation;

pub use atom::{Atom, Key};
pub use field_graph::FieldGraph;
pub use term::Term;
pub use transformation::Transformation;
