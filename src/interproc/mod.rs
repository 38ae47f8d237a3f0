// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Whole-program analysis: the method summary table, the concrete field
//! table, and the fixed-point driver.

pub mod analysis;
pub mod field_table;
pub mod method_table;

pub use analysis::{AnalysisResult, InterProcTransAnalysis};
pub use field_table::{FieldKey, FieldTable};
pub use method_table::{MethodKind, MethodSummary, MethodTable};
