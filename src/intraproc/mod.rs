// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Per-method analysis: the abstract environment and the dataflow pass.

pub mod environment;
pub mod flow;

pub use environment::Environment;
