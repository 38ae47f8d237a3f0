// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Abstract storage locations.
//!
//! A [`Region`] is either an allocation site or one of four sentinels:
//! static storage, the null reference, an unknown region standing for
//! opaque library results, and the base-type region for values that carry
//! no aliasing information.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use itertools::Itertools;

use crate::ir::body::Location;
use crate::ir::program::ClassId;

/// The call string under which an object was allocated. The analysis runs
/// with context depth 0, so contexts are currently always empty; the type
/// exists so that allocation sites stay ready for deeper contexts.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct CallingContext {
    sites: Vec<Location>,
}

impl CallingContext {
    pub fn empty() -> Self {
        CallingContext::default()
    }

    pub fn depth(&self) -> usize {
        self.sites.len()
    }
}

/// Identifies one `new` expression together with its calling context.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct AllocationSite {
    pub class: ClassId,
    pub class_name: Rc<str>,
    pub context: CallingContext,
    pub location: Location,
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Region {
    AllocationSite(Rc<AllocationSite>),
    /// Static storage.
    Static,
    /// The null reference.
    Null,
    /// Conservative top for results of opaque library code.
    Unknown,
    /// Primitive and other non-reference values.
    Base,
}

impl Region {
    pub fn allocation_site(
        class: ClassId,
        class_name: Rc<str>,
        context: CallingContext,
        location: Location,
    ) -> Region {
        Region::AllocationSite(Rc::new(AllocationSite {
            class,
            class_name,
            context,
            location,
        }))
    }

    /// The class allocated at this region, for allocation sites.
    pub fn class(&self) -> Option<ClassId> {
        match self {
            Region::AllocationSite(site) => Some(site.class),
            _ => None,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::AllocationSite(site) => {
                write!(f, "<created {} at {}>", site.class_name, site.location)
            }
            Region::Static => write!(f, "<static>"),
            Region::Null => write!(f, "null"),
            Region::Unknown => write!(f, "<unknown>"),
            Region::Base => write!(f, "<base>"),
        }
    }
}

/// A deduplicated set of regions; the join is set union and the empty set is
/// the bottom of this sub-lattice.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Regions {
    set: BTreeSet<Region>,
}

impl Regions {
    pub fn empty() -> Regions {
        Regions::default()
    }

    pub fn singleton(region: Region) -> Regions {
        Regions {
            set: BTreeSet::from([region]),
        }
    }

    pub fn from_set(set: BTreeSet<Region>) -> Regions {
        Regions { set }
    }

    pub fn join(&self, other: &Regions) -> Regions {
        let mut set = self.set.clone();
        set.extend(other.set.iter().cloned());
        Regions { set }
    }

    pub fn contains(&self, region: &Region) -> bool {
        self.set.contains(region)
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.set.iter()
    }
}

impl FromIterator<Region> for Regions {
    fn from_iter<I: IntoIterator<Item = Region>>(iter: I) -> Self {
        Regions {
            set: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Regions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.set.iter().map(|r| r.to_string()).join(", "))
    }
}
