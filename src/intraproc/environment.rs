// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The concrete environment: variable -> regions.

use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;

use crate::ir::body::Var;
use crate::region::Regions;

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Environment {
    map: BTreeMap<Var, Regions>,
}

impl Environment {
    pub fn new() -> Environment {
        Environment::default()
    }

    pub fn insert(&mut self, var: Var, regions: Regions) {
        self.map.insert(var, regions);
    }

    pub fn get(&self, var: &Var) -> Option<&Regions> {
        self.map.get(var)
    }

    pub fn contains_key(&self, var: &Var) -> bool {
        self.map.contains_key(var)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Var, &Regions)> {
        self.map.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.map.values().all(|regions| regions.is_empty()) {
            return write!(f, "()");
        }
        write!(
            f,
            "({})",
            self.map
                .iter()
                .map(|(var, regions)| format!("{}: {}", var, regions))
                .join(", ")
        )
    }
}
