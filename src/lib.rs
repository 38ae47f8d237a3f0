// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! A symbolic region-based alias analysis for a small object-oriented
//! intermediate representation. Method bodies are summarized as
//! transformations: finite maps from variables and field paths to the sets
//! of symbolic references they may hold, composed along the control flow and
//! across calls until the whole method table stabilizes.

#![allow(
    clippy::single_match,
    clippy::needless_lifetimes,
    clippy::needless_return,
    clippy::len_zero
)]

pub mod interproc;
pub mod intraproc;
pub mod ir;
pub mod policy;
pub mod region;
pub mod transformation;
pub mod util;
