// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Compressed field-access chains.

use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;

use crate::ir::program::Field;

/// A nonempty field graph: one or more field-access chains collapsed into a
/// head field, a tail field and a set of may-follow edges. Collapsing is what
/// keeps unbounded access paths (`this.next.next...`) finite: concatenating
/// `next` onto a graph ending in `next` just closes the `next -> next` edge
/// instead of unrolling the path.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct FieldGraph {
    head: Field,
    tail: Field,
    edges: BTreeSet<(Field, Field)>,
}

impl FieldGraph {
    /// The graph of a single field access, with no edges.
    pub fn singleton(field: Field) -> FieldGraph {
        FieldGraph {
            head: field.clone(),
            tail: field,
            edges: BTreeSet::new(),
        }
    }

    pub fn new(head: Field, tail: Field, edges: BTreeSet<(Field, Field)>) -> FieldGraph {
        FieldGraph { head, tail, edges }
    }

    /// Concatenates with `next` on the right: appends an edge from this tail
    /// to the head of `next` and unions the edge sets.
    pub fn concat(&self, next: &FieldGraph) -> FieldGraph {
        let mut edges = self.edges.clone();
        edges.insert((self.tail.clone(), next.head.clone()));
        edges.extend(next.edges.iter().cloned());
        FieldGraph {
            head: self.head.clone(),
            tail: next.tail.clone(),
            edges,
        }
    }

    pub fn contains_edge(&self, source: &Field, target: &Field) -> bool {
        self.edges.contains(&(source.clone(), target.clone()))
    }

    pub fn head(&self) -> &Field {
        &self.head
    }

    pub fn tail(&self) -> &Field {
        &self.tail
    }

    pub fn edges(&self) -> &BTreeSet<(Field, Field)> {
        &self.edges
    }

    pub fn is_singleton(&self, field: &Field) -> bool {
        self.edges.is_empty() && &self.head == field
    }
}

impl fmt::Display for FieldGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.edges.is_empty() {
            return write!(f, "{}", self.head);
        }
        write!(
            f,
            "({},[{}],{})",
            self.head,
            self.edges
                .iter()
                .map(|(s, t)| format!("({}, {})", s, t))
                .join(", "),
            self.tail
        )
    }
}
