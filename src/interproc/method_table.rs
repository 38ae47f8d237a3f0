// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The global method summary table.
//!
//! The table is the single piece of long-lived mutable state of an analysis
//! run. It maintains the subtyping invariant that every class in the program
//! has an entry for every inherited method it does not override, so that
//! virtual and interface calls can be summarized without re-resolving
//! dispatch at each call site.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use log::*;

use crate::ir::body::{Body, Var};
use crate::ir::program::{ClassId, MethodRef, Program};
use crate::policy::Policy;
use crate::region::Region;
use crate::transformation::term::Term;
use crate::transformation::transformation::Transformation;

/// A method summary: the net effect of the method body on its parameters'
/// reachable field paths, and the term describing its return value, both
/// relative to the method's own parameters and `this`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MethodSummary {
    pub trans: Transformation,
    pub term: Term,
}

impl MethodSummary {
    pub fn new(trans: Transformation, term: Term) -> MethodSummary {
        MethodSummary { trans, term }
    }

    pub fn join(&self, other: &MethodSummary) -> MethodSummary {
        MethodSummary {
            trans: self.trans.join(&other.trans),
            term: self.term.join(&other.term),
        }
    }

    /// Projects the transformation down to the given variables; the callers
    /// of a method can only observe `this` and the parameters.
    pub fn clean(&self, keep: &BTreeSet<Var>) -> MethodSummary {
        MethodSummary {
            trans: self.trans.remove_locals(keep),
            term: self.term.clone(),
        }
    }
}

impl fmt::Display for MethodSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} & {}", self.trans, self.term)
    }
}

/// How a method's summary comes into being.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MethodKind {
    /// Analyzed iteratively from its body.
    Application,
    /// Summary supplied by the policy hook.
    Intrinsic,
    /// A constructor without a body: identity effect, base-type result.
    EmptyDefaultConstructor,
    /// A library method with a registered substitute body.
    MockedLibrary,
    /// A library method without a body: identity effect, unknown result.
    OpaqueLibrary,
}

pub struct MethodTable<'p> {
    program: &'p Program,
    policy: &'p dyn Policy,
    map: BTreeMap<MethodRef, MethodSummary>,
}

impl<'p> MethodTable<'p> {
    pub fn new(program: &'p Program, policy: &'p dyn Policy) -> MethodTable<'p> {
        MethodTable {
            program,
            policy,
            map: BTreeMap::new(),
        }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    /// Classifies a method reference.
    pub fn kind(&self, m: &MethodRef) -> MethodKind {
        // intrinsic methods are specified by the policy
        if self.policy.intrinsic_method(self.program, m).is_some() {
            return MethodKind::Intrinsic;
        }
        if self.program.is_library_class(m.class) {
            // the root default constructor
            if m.class == self.program.object_class && m.is_constructor() && m.sig.params.is_empty()
            {
                return MethodKind::EmptyDefaultConstructor;
            }
            if let Some(mock) = self.program.mock_method(m) {
                if self.program.body(&mock).is_some() {
                    return MethodKind::MockedLibrary;
                }
            }
            // anything else is treated conservatively
            return MethodKind::OpaqueLibrary;
        }
        // a constructor without a body is an implicit default constructor
        if self.program.body(m).is_none() && m.is_constructor() {
            return MethodKind::EmptyDefaultConstructor;
        }
        MethodKind::Application
    }

    /// The analyzable body behind `m`, if its kind has one.
    pub fn body(&self, m: &MethodRef) -> Option<&'p Body> {
        match self.kind(m) {
            MethodKind::Application => self.program.body(m),
            MethodKind::MockedLibrary => {
                let mock = self.program.mock_method(m)?;
                self.program.body(&mock)
            }
            _ => None,
        }
    }

    pub fn get(&self, m: &MethodRef) -> Option<&MethodSummary> {
        self.map.get(m)
    }

    /// The summary for `m`: its table entry, or its default summary if the
    /// table has none.
    pub fn summary(&self, m: &MethodRef) -> MethodSummary {
        self.map.get(m).cloned().unwrap_or_else(|| self.default_summary(m))
    }

    pub fn entries(&self) -> &BTreeMap<MethodRef, MethodSummary> {
        &self.map
    }

    /// Ensures the table has an entry for `m`, inserting the default summary
    /// for its classification. Idempotent. The entry is created under the
    /// most specific declared implementation. Except for constructors,
    /// which never dispatch virtually, every subclass or implementer not
    /// declaring its own override receives an entry as well, keeping the
    /// subtyping invariant.
    pub fn ensure_present(&mut self, m: &MethodRef) {
        if self.map.contains_key(m) {
            return;
        }
        let mut m = m.clone();
        if self.kind(&m) != MethodKind::OpaqueLibrary {
            match self.program.resolve(&m) {
                Some(resolved) => m = resolved,
                None => {
                    error!(
                        "cannot resolve method {}, all bets are off",
                        self.program.describe(&m)
                    );
                }
            }
        }
        let default = self.default_summary(&m);
        self.map.insert(m.clone(), default);
        if m.is_constructor() {
            return;
        }
        // close under subtyping
        let all: Vec<ClassId> = if self.program.is_interface(m.class) {
            let mut v = self.program.implementers_of(m.class);
            v.extend(self.program.subinterfaces_of(m.class));
            v
        } else {
            self.program.subclasses_of(m.class)
        };
        for sub in all {
            let sub_ref = m.with_class(sub);
            if !self.map.contains_key(&sub_ref) {
                let default = self.default_summary(&sub_ref);
                self.map.insert(sub_ref, default);
            }
        }
    }

    /// Joins `summary` into the entry for `m`, if one is present, and
    /// propagates the join through the hierarchy: downward into every
    /// subclass entry that does not declare its own override (overriding is
    /// modeled as summary inheritance), and upward into superclass and
    /// interface entries, since a call through a supertype reference must
    /// account for this subtype's behavior.
    pub fn join_if_present(&mut self, m: &MethodRef, summary: &MethodSummary) {
        self.join_at(m, summary);
        // downward: classes inheriting the method without overriding it
        let mut queue: VecDeque<ClassId> = if self.program.is_interface(m.class) {
            let mut v = self.program.direct_implementers(m.class);
            v.extend(self.program.direct_subinterfaces(m.class));
            v.into()
        } else {
            self.program.direct_subclasses(m.class).into()
        };
        while let Some(d) = queue.pop_front() {
            if self.program.declares_method(d, &m.sig) {
                continue;
            }
            self.join_at(&m.with_class(d), summary);
            if self.program.is_interface(d) {
                queue.extend(self.program.direct_implementers(d));
                queue.extend(self.program.direct_subinterfaces(d));
            } else {
                queue.extend(self.program.direct_subclasses(d));
            }
        }
        // upward: superclasses and implemented interfaces
        let mut interfaces: VecDeque<ClassId> = VecDeque::new();
        let mut c = m.class;
        interfaces.extend(self.program.interfaces(c).iter().copied());
        while let Some(sup) = self.program.superclass(c) {
            c = sup;
            self.join_at(&m.with_class(c), summary);
            interfaces.extend(self.program.interfaces(c).iter().copied());
        }
        while let Some(i) = interfaces.pop_front() {
            self.join_at(&m.with_class(i), summary);
            interfaces.extend(self.program.interfaces(i).iter().copied());
        }
    }

    fn join_at(&mut self, m: &MethodRef, summary: &MethodSummary) {
        if let Some(entry) = self.map.get_mut(m) {
            *entry = entry.join(summary);
        }
    }

    /// The default summary for a method's classification.
    fn default_summary(&self, m: &MethodRef) -> MethodSummary {
        match self.kind(m) {
            MethodKind::Intrinsic => {
                // kind() established the intrinsic exists
                let regions = self
                    .policy
                    .intrinsic_method(self.program, m)
                    .map(|i| i.return_regions().clone())
                    .unwrap_or_default();
                MethodSummary::new(Transformation::identity(), Term::regions(&regions))
            }
            MethodKind::EmptyDefaultConstructor => {
                MethodSummary::new(Transformation::identity(), Term::region(Region::Base))
            }
            MethodKind::OpaqueLibrary => {
                let region = if m.sig.ret.is_ref() {
                    Region::Unknown
                } else {
                    Region::Base
                };
                MethodSummary::new(Transformation::identity(), Term::region(region))
            }
            MethodKind::MockedLibrary | MethodKind::Application => {
                MethodSummary::new(Transformation::bottom(), Term::empty())
            }
        }
    }
}

impl fmt::Display for MethodTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (m, summary) in &self.map {
            writeln!(f, "  {}: {}", self.program.describe(m), summary)?;
        }
        Ok(())
    }
}
