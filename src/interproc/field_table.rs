// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The concrete field table: region x field -> regions.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use itertools::Itertools;

use crate::ir::program::Field;
use crate::region::{Region, Regions};
use crate::transformation::field_graph::FieldGraph;

/// One field of the objects in one region.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct FieldKey {
    pub region: Region,
    pub field: Field,
}

/// Plain data: which regions may occupy each region's fields. No
/// well-formedness invariants are enforced here.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct FieldTable {
    map: BTreeMap<FieldKey, Regions>,
}

impl FieldTable {
    pub fn new() -> FieldTable {
        FieldTable::default()
    }

    pub fn insert(&mut self, key: FieldKey, regions: Regions) {
        self.map.insert(key, regions);
    }

    pub fn get(&self, key: &FieldKey) -> Option<&Regions> {
        self.map.get(key)
    }

    pub fn contains_key(&self, key: &FieldKey) -> bool {
        self.map.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.map.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &Regions)> {
        self.map.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// The set of field keys reachable from `region` along the access chains
    /// of `graph`, w.r.t. this table: the closure of the head field under
    /// one-step successor expansion.
    pub fn reachable_fields(&self, region: &Region, graph: &FieldGraph) -> BTreeSet<FieldKey> {
        let start = FieldKey {
            region: region.clone(),
            field: graph.head().clone(),
        };
        let mut result = BTreeSet::from([start]);
        let mut changed = true;
        while changed {
            changed = false;
            let frontier: Vec<FieldKey> = result.iter().cloned().collect();
            for key in frontier {
                for successor in self.successor_fields(graph, &key) {
                    if result.insert(successor) {
                        changed = true;
                    }
                }
            }
        }
        result
    }

    /// The immediate successors of `key`: table entries whose field may
    /// follow `key.field` in `graph` and whose occupying region set actually
    /// contains `key.region`.
    fn successor_fields(&self, graph: &FieldGraph, key: &FieldKey) -> BTreeSet<FieldKey> {
        self.map
            .iter()
            .filter(|(entry_key, regions)| {
                graph.contains_edge(&key.field, &entry_key.field) && regions.contains(&key.region)
            })
            .map(|(entry_key, _)| entry_key.clone())
            .collect()
    }
}

impl fmt::Display for FieldTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({})",
            self.map
                .iter()
                .map(|(key, regions)| format!("{}.{}: {}", key.region, key.field, regions))
                .join(", ")
        )
    }
}
