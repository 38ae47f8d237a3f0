// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Transformations: the net points-to effect of executing a piece of code.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use itertools::Itertools;

use crate::interproc::field_table::{FieldKey, FieldTable};
use crate::intraproc::environment::Environment;
use crate::ir::body::Var;
use crate::ir::program::Program;
use crate::region::{Region, Regions};
use crate::transformation::atom::{Atom, Key};
use crate::transformation::term::Term;

/// A mapping from keys to terms, relative to the (unknown) state before
/// execution, or the distinguished bottom element for unreached code.
///
/// Variable keys are updated strongly (an assignment replaces prior
/// knowledge); field keys are updated weakly (a write joins with whatever may
/// already reach that field path), because the same symbolic field key may
/// denote several concrete objects.
///
/// The identity transformation is the empty map: no key constrained, every
/// variable keeps its value, no field written. It is distinct from bottom,
/// which carries no information at all.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Transformation {
    assigns: Option<BTreeMap<Key, Term>>,
}

impl Transformation {
    pub fn bottom() -> Transformation {
        Transformation { assigns: None }
    }

    pub fn identity() -> Transformation {
        Transformation {
            assigns: Some(BTreeMap::new()),
        }
    }

    pub fn singleton(key: Key, term: Term) -> Transformation {
        Transformation {
            assigns: Some(BTreeMap::from([(key, term)])),
        }
    }

    pub fn is_bottom(&self) -> bool {
        self.assigns.is_none()
    }

    /// Bottom constrains every key (to the empty term).
    pub fn contains_key(&self, key: &Key) -> bool {
        match &self.assigns {
            None => true,
            Some(map) => map.contains_key(key),
        }
    }

    /// The term for `key`; the empty term if the key is unconstrained.
    pub fn get(&self, key: &Key) -> Term {
        match &self.assigns {
            None => Term::empty(),
            Some(map) => map.get(key).cloned().unwrap_or_default(),
        }
    }

    /// Entries, in key order. Bottom has no entries.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Term)> {
        self.assigns.iter().flat_map(|m| m.iter())
    }

    pub fn len(&self) -> usize {
        self.assigns.as_ref().map_or(0, |m| m.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenates with `next` on the right. `next` binds the prior state:
    /// every term of `self` is rewritten through `next`, and the receiver of
    /// a variable-field key is rewritten as well, since the variable itself
    /// may have been redefined by `next`. Rewritten field keys are joined
    /// into any existing entry (weak update); variable keys replace theirs
    /// (strong update). Entries of `next` for keys not yet constrained are
    /// then merged in, field keys again by join.
    ///
    /// Bottom is absorbing on either side: concatenating from bottom yields a
    /// copy of `next`, and sequencing into bottom (unreached code) stays
    /// bottom.
    pub fn concat(&self, next: &Transformation) -> Transformation {
        let assigns = match &self.assigns {
            None => return next.clone(),
            Some(map) => map,
        };
        let next_assigns = match &next.assigns {
            None => return Transformation::bottom(),
            Some(map) => map,
        };
        let empty = Term::empty();
        let mut result: BTreeMap<Key, Term> = BTreeMap::new();
        for (key, value) in assigns {
            let updated = value.substitute(next);
            match key {
                Key::Variable(_) => {
                    result.insert(key.clone(), updated);
                }
                Key::VariableField(var, graph) => {
                    let var_key = Key::Variable(var.clone());
                    let rewritten: Vec<Atom> = if next.contains_key(&var_key) {
                        next.get(&var_key).atoms().map(|a| a.concat(graph)).collect()
                    } else {
                        // receiver unchanged by `next`
                        vec![key.to_atom()]
                    };
                    for atom in rewritten {
                        if let Some(new_key) = atom.as_key() {
                            let joined = updated.join(result.get(&new_key).unwrap_or(&empty));
                            result.insert(new_key, joined);
                        }
                    }
                }
                Key::RegionField(..) => {
                    let joined = updated.join(result.get(key).unwrap_or(&empty));
                    result.insert(key.clone(), joined);
                }
            }
        }
        for (key, value) in next_assigns {
            match result.entry(key.clone()) {
                Entry::Occupied(mut occupied) => {
                    if !key.is_variable() {
                        let joined = occupied.get().join(value);
                        occupied.insert(joined);
                    }
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(value.clone());
                }
            }
        }
        Self::create_after_cleanup(result)
    }

    /// Parallel combination at a control-flow merge point: pointwise term
    /// join. A variable key constrained on one side only implicitly means
    /// "unchanged" on the other, so its term is additionally joined with the
    /// variable itself. Bottom joined with anything is the other side.
    pub fn join(&self, other: &Transformation) -> Transformation {
        let (a, b) = match (&self.assigns, &other.assigns) {
            (None, _) => return other.clone(),
            (_, None) => return self.clone(),
            (Some(a), Some(b)) => (a, b),
        };
        let mut result: BTreeMap<Key, Term> = BTreeMap::new();
        for (key, value) in a {
            let term = match b.get(key) {
                Some(bv) => value.join(bv),
                None if key.is_variable() => value.join(&Term::atom(key.to_atom())),
                None => value.clone(),
            };
            result.insert(key.clone(), term);
        }
        for (key, value) in b {
            if !a.contains_key(key) {
                let term = if key.is_variable() {
                    value.join(&Term::atom(key.to_atom()))
                } else {
                    value.clone()
                };
                result.insert(key.clone(), term);
            }
        }
        Self::create_after_cleanup(result)
    }

    /// Drops entries conveying no information: a variable key whose term is
    /// exactly itself, and a field key with an empty term.
    pub fn create_after_cleanup(map: BTreeMap<Key, Term>) -> Transformation {
        let mut map = map;
        map.retain(|key, term| match key {
            Key::Variable(_) => *term != Term::atom(key.to_atom()),
            _ => !term.is_empty(),
        });
        Transformation { assigns: Some(map) }
    }

    /// Projects down to the given variables plus all field keys. Used when a
    /// method's exit effect is stored into its summary: only `this` and the
    /// parameters are visible to callers.
    pub fn remove_locals(&self, keep: &BTreeSet<Var>) -> Transformation {
        let assigns = match &self.assigns {
            None => return Transformation::bottom(),
            Some(map) => map,
        };
        let map = assigns
            .iter()
            .filter(|(key, _)| match key {
                Key::Variable(v) => keep.contains(v),
                _ => true,
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Transformation { assigns: Some(map) }
    }

    /// Instantiates this symbolic transformation against a concrete initial
    /// environment and field table, iterating environment and field-table
    /// recomputation to a fixed point. Variables in terms denote the prior
    /// state, so both recomputations evaluate against the initial
    /// environment; only the field table evolves across rounds (field values
    /// may depend on regions that themselves depend on other fields, as in
    /// cyclic structures).
    pub fn instantiate(
        &self,
        program: &Program,
        env: &Environment,
        table: &FieldTable,
    ) -> (Environment, FieldTable) {
        if self.is_bottom() {
            return (env.clone(), table.clone());
        }
        let mut old_env = env.clone();
        let mut old_table = table.clone();
        loop {
            let new_env = self.env_instantiate(env, &old_table);
            let new_table = self.field_instantiate(program, env, &old_table);
            if new_env == old_env && new_table == old_table {
                return (old_env, old_table);
            }
            old_env = new_env;
            old_table = new_table;
        }
    }

    /// Recomputes every constrained variable from its term; unconstrained
    /// variables keep their prior binding.
    fn env_instantiate(&self, env: &Environment, table: &FieldTable) -> Environment {
        let mut updated = Environment::new();
        for (key, term) in self.iter() {
            if let Key::Variable(v) = key {
                updated.insert(v.clone(), term.instantiate(env, table));
            }
        }
        for (v, regions) in env.iter() {
            if !updated.contains_key(v) {
                updated.insert(v.clone(), regions.clone());
            }
        }
        updated
    }

    /// Recomputes every field-table entry reachable from this
    /// transformation's field keys. An entry no write contributes to
    /// defaults to the null region: the field was never definitely
    /// initialized along this path.
    fn field_instantiate(
        &self,
        program: &Program,
        env: &Environment,
        table: &FieldTable,
    ) -> FieldTable {
        let mut keys = field_keys(program, &self.mentioned_regions(env, table));
        keys.extend(table.keys().cloned());
        let mut updated = FieldTable::new();
        for key in keys {
            let mut regions = Regions::empty();
            if let Some(existing) = table.get(&key) {
                regions = regions.join(existing);
            }
            for (entry_key, term) in self.iter() {
                match entry_key {
                    Key::RegionField(r, g) => {
                        if table.reachable_fields(r, g).contains(&key) {
                            regions = regions.join(&term.instantiate(env, table));
                        }
                    }
                    Key::VariableField(v, g) => {
                        if let Some(var_regions) = env.get(v) {
                            for r in var_regions.iter() {
                                if table.reachable_fields(r, g).contains(&key) {
                                    regions = regions.join(&term.instantiate(env, table));
                                }
                            }
                        }
                    }
                    Key::Variable(_) => {}
                }
            }
            if regions.is_empty() {
                regions = Regions::singleton(Region::Null);
            }
            updated.insert(key, regions);
        }
        updated
    }

    /// Every region mentioned by this transformation, the environment or the
    /// field table.
    fn mentioned_regions(&self, env: &Environment, table: &FieldTable) -> BTreeSet<Region> {
        let mut regions = BTreeSet::new();
        for (key, term) in self.iter() {
            if let Key::RegionField(r, _) = key {
                regions.insert(r.clone());
            }
            for atom in term.atoms() {
                match atom {
                    Atom::Region(r) | Atom::RegionField(r, _) => {
                        regions.insert(r.clone());
                    }
                    _ => {}
                }
            }
        }
        for (_, rs) in env.iter() {
            regions.extend(rs.iter().cloned());
        }
        for (key, rs) in table.iter() {
            regions.insert(key.region.clone());
            regions.extend(rs.iter().cloned());
        }
        regions
    }
}

/// All (region, field) keys for the declared fields of the allocation-site
/// regions in the set.
fn field_keys(program: &Program, regions: &BTreeSet<Region>) -> BTreeSet<FieldKey> {
    let mut keys = BTreeSet::new();
    for region in regions {
        if let Some(class) = region.class() {
            for field in program.fields_of(class) {
                keys.insert(FieldKey {
                    region: region.clone(),
                    field: field.clone(),
                });
            }
        }
    }
    keys
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let assigns = match &self.assigns {
            None => return write!(f, "\u{22a5}"),
            Some(map) => map,
        };
        write!(
            f,
            "{{{}}}",
            assigns
                .iter()
                .map(|(key, term)| {
                    let op = if key.is_variable() { ":=" } else { ":>" };
                    format!("{} {} {}", key, op, term)
                })
                .join(", ")
        )
    }
}
