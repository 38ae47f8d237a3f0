// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Atoms: the symbolic references terms are built from.

use std::fmt;

use crate::interproc::field_table::FieldTable;
use crate::intraproc::environment::Environment;
use crate::ir::body::Var;
use crate::region::{Region, Regions};
use crate::transformation::field_graph::FieldGraph;
use crate::transformation::term::Term;
use crate::transformation::transformation::Transformation;

/// A symbolic reference: the current value of a variable, a concrete region,
/// or everything reachable from one of those through a field graph.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Atom {
    Variable(Var),
    Region(Region),
    RegionField(Region, FieldGraph),
    VariableField(Var, FieldGraph),
}

/// The atoms usable as the left-hand side of a transformation entry. A bare
/// region is deliberately absent: there is nothing to assign into it.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Key {
    Variable(Var),
    RegionField(Region, FieldGraph),
    VariableField(Var, FieldGraph),
}

impl Key {
    pub fn to_atom(&self) -> Atom {
        match self {
            Key::Variable(v) => Atom::Variable(v.clone()),
            Key::RegionField(r, g) => Atom::RegionField(r.clone(), g.clone()),
            Key::VariableField(v, g) => Atom::VariableField(v.clone(), g.clone()),
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Key::Variable(_))
    }
}

impl Atom {
    /// The key form of this atom, if it has one.
    pub fn as_key(&self) -> Option<Key> {
        match self {
            Atom::Variable(v) => Some(Key::Variable(v.clone())),
            Atom::Region(_) => None,
            Atom::RegionField(r, g) => Some(Key::RegionField(r.clone(), g.clone())),
            Atom::VariableField(v, g) => Some(Key::VariableField(v.clone(), g.clone())),
        }
    }

    /// Extends this atom by a field graph on the right. The result is always
    /// a field atom, hence always a key.
    pub fn concat(&self, graph: &FieldGraph) -> Atom {
        match self {
            Atom::Variable(v) => Atom::VariableField(v.clone(), graph.clone()),
            Atom::Region(r) => Atom::RegionField(r.clone(), graph.clone()),
            Atom::RegionField(r, g) => Atom::RegionField(r.clone(), g.concat(graph)),
            Atom::VariableField(v, g) => Atom::VariableField(v.clone(), g.concat(graph)),
        }
    }

    /// Rewrites this atom through a transformation: variables (and the
    /// receiver variables of variable-field atoms) take the value the
    /// transformation assigns them; an unconstrained variable means
    /// "unchanged" and the atom stays as it is.
    pub fn substitute(&self, trans: &Transformation) -> Term {
        match self {
            Atom::Variable(v) => {
                let key = Key::Variable(v.clone());
                if trans.contains_key(&key) {
                    trans.get(&key)
                } else {
                    Term::atom(self.clone())
                }
            }
            Atom::VariableField(v, g) => {
                let key = Key::Variable(v.clone());
                if trans.contains_key(&key) {
                    trans.get(&key).concat(g)
                } else {
                    Term::atom(self.clone())
                }
            }
            Atom::Region(_) | Atom::RegionField(..) => Term::atom(self.clone()),
        }
    }

    /// Evaluates this atom to a concrete region set under an environment and
    /// field table.
    pub fn instantiate(&self, env: &Environment, table: &FieldTable) -> Regions {
        match self {
            Atom::Variable(v) => env.get(v).cloned().unwrap_or_default(),
            Atom::Region(r) => Regions::singleton(r.clone()),
            Atom::RegionField(r, g) => {
                let reachable = table.reachable_fields(r, g);
                let mut regions = Regions::empty();
                for key in &reachable {
                    if let Some(rs) = table.get(key) {
                        regions = regions.join(rs);
                    }
                }
                regions
            }
            Atom::VariableField(v, g) => {
                let mut regions = Regions::empty();
                if let Some(rs) = env.get(v) {
                    for r in rs.iter() {
                        let rfa = Atom::RegionField(r.clone(), g.clone());
                        regions = regions.join(&rfa.instantiate(env, table));
                    }
                }
                regions
            }
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Variable(v) => write!(f, "{}", v),
            Atom::Region(r) => write!(f, "{}", r),
            Atom::RegionField(r, g) => write!(f, "{}.{}", r, g),
            Atom::VariableField(v, g) => write!(f, "{}.{}", v, g),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_atom())
    }
}
