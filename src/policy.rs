// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The policy hook: hand-specified summaries for designated methods.

use crate::ir::program::{MethodRef, Program};
use crate::region::Regions;

/// The hand-specified symbolic return value of an intrinsic method. For an
/// intrinsic constructor the regions are read as the type of the constructed
/// object itself, which lets a policy pin the region of designated
/// allocations.
#[derive(Clone, Debug)]
pub struct Intrinsic {
    return_regions: Regions,
}

impl Intrinsic {
    pub fn new(return_regions: Regions) -> Intrinsic {
        Intrinsic { return_regions }
    }

    pub fn return_regions(&self) -> &Regions {
        &self.return_regions
    }
}

/// Assigns intrinsic summaries to designated methods (e.g. taint sources),
/// bypassing body analysis entirely.
pub trait Policy {
    fn intrinsic_method(&self, program: &Program, method: &MethodRef) -> Option<Intrinsic>;
}

/// A policy with no intrinsic methods.
pub struct EmptyPolicy;

impl Policy for EmptyPolicy {
    fn intrinsic_method(&self, _program: &Program, _method: &MethodRef) -> Option<Intrinsic> {
        None
    }
}
