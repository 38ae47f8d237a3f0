// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Terms: finite joins of atoms.

use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;

use crate::interproc::field_table::FieldTable;
use crate::intraproc::environment::Environment;
use crate::ir::body::Var;
use crate::region::{Region, Regions};
use crate::transformation::atom::Atom;
use crate::transformation::field_graph::FieldGraph;
use crate::transformation::transformation::Transformation;

/// A finite join of atoms: "may evaluate to any of these". The empty term is
/// the bottom value, denoting unreached or not-yet-computed.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Term {
    atoms: BTreeSet<Atom>,
}

impl Term {
    pub fn empty() -> Term {
        Term::default()
    }

    pub fn atom(atom: Atom) -> Term {
        Term {
            atoms: BTreeSet::from([atom]),
        }
    }

    pub fn var(var: Var) -> Term {
        Term::atom(Atom::Variable(var))
    }

    pub fn region(region: Region) -> Term {
        Term::atom(Atom::Region(region))
    }

    /// One region atom per region in the set.
    pub fn regions(regions: &Regions) -> Term {
        Term {
            atoms: regions.iter().map(|r| Atom::Region(r.clone())).collect(),
        }
    }

    pub fn from_atoms(atoms: BTreeSet<Atom>) -> Term {
        Term { atoms }
    }

    /// Set union; duplicate atoms collapse by construction.
    pub fn join(&self, other: &Term) -> Term {
        let mut atoms = self.atoms.clone();
        atoms.extend(other.atoms.iter().cloned());
        Term { atoms }
    }

    /// Rewrites every atom through `trans` and joins the results.
    pub fn substitute(&self, trans: &Transformation) -> Term {
        let mut result = Term::empty();
        for atom in &self.atoms {
            result = result.join(&atom.substitute(trans));
        }
        result
    }

    /// Extends every atom by a field graph on the right.
    pub fn concat(&self, graph: &FieldGraph) -> Term {
        Term {
            atoms: self.atoms.iter().map(|a| a.concat(graph)).collect(),
        }
    }

    /// Evaluates to the union of the concrete regions of all atoms.
    pub fn instantiate(&self, env: &Environment, table: &FieldTable) -> Regions {
        let mut regions = Regions::empty();
        for atom in &self.atoms {
            regions = regions.join(&atom.instantiate(env, table));
        }
        regions
    }

    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.iter()
    }

    pub fn contains(&self, atom: &Atom) -> bool {
        self.atoms.contains(atom)
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.atoms.iter().map(|a| a.to_string()).join(", "))
    }
}
