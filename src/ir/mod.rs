// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The analyzed program representation.
//!
//! The analysis itself is front-end agnostic: it only consumes the narrow
//! surface exposed here, namely class/field/method declarations, a hierarchy
//! oracle on [`Program`], and per-method bodies with an explicit control-flow
//! graph. Bodies are constructed programmatically through [`builder`].

pub mod body;
pub mod builder;
pub mod program;

pub use body::{Body, Call, CallKind, Location, Operand, Rvalue, Statement, StmtId, Var};
pub use builder::{BodyBuilder, ProgramBuilder};
pub use program::{ClassId, Field, MethodId, MethodRef, Program, Signature, Type, CONSTRUCTOR_NAME};
