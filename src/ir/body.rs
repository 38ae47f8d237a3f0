// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Method bodies: local variables, statements and the control-flow graph.

use std::fmt;
use std::rc::Rc;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::ir::program::{ClassId, Field, MethodId, MethodRef, Type};

/// Index of a statement within its body; also the node id in the body's
/// control-flow graph.
pub type StmtId = usize;

/// A program point, used to tag allocation-site regions.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Location {
    pub method: MethodId,
    pub index: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}:{}", self.method.0, self.index)
    }
}

/// A local variable. Variables are identified by their owning method and
/// ordinal; the name is carried along for readable output only, but is fixed
/// per ordinal, so deriving equality over it is harmless.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Var {
    pub method: MethodId,
    pub ordinal: u32,
    pub name: Rc<str>,
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An immediate value.
#[derive(Clone, Debug)]
pub enum Operand {
    Var(Var),
    /// Numeric, boolean, null and similar constants of no aliasing interest.
    Constant,
    /// String constants are not tracked as distinguished regions.
    StringConstant,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CallKind {
    Special,
    Virtual,
    Interface,
    Static,
    /// Dynamic call sites are expected to be filtered out by the front end.
    Dynamic,
}

/// An invocation expression: `receiver.callee(args)` or `callee(args)`.
#[derive(Clone, Debug)]
pub struct Call {
    pub kind: CallKind,
    pub callee: MethodRef,
    pub receiver: Option<Var>,
    pub args: Vec<Operand>,
}

/// Right-hand sides of assignments.
#[derive(Clone, Debug)]
pub enum Rvalue {
    Use(Operand),
    /// `base.field`
    FieldAccess { base: Var, field: Field },
    /// `Class.field`
    StaticAccess { field: Field },
    /// `new C`
    New { class: ClassId },
    Call(Call),
    /// `(to) operand`
    Cast { to: Type, operand: Operand },
    /// `operand instanceof C`; the result is a boolean
    InstanceOf { operand: Operand },
    /// `base[i]`; array elements are not tracked
    ArrayAccess { base: Var },
    ArrayLength { base: Var },
    UnaryOp { operand: Operand },
    BinaryOp { left: Operand, right: Operand },
}

/// Statement kinds. Control successors are recorded in the body's graph, not
/// in the statements themselves.
#[derive(Clone, Debug)]
pub enum Statement {
    /// `lhs := @this`
    BindThis { lhs: Var },
    /// `lhs := @parameter[index]`
    BindParam { lhs: Var, index: usize },
    Assign { lhs: Var, rhs: Rvalue },
    /// `base.field = value` where `value` is an immediate
    FieldAssign { base: Var, field: Field, value: Operand },
    /// `Class.field = value` where `value` is an immediate
    StaticAssign { field: Field, value: Operand },
    /// `base[i] = value`; array elements are not tracked
    ArrayAssign { base: Var, value: Operand },
    Invoke(Call),
    Return(Operand),
    ReturnVoid,
    If,
    Goto,
    Switch,
    Throw(Operand),
    Nop,
}

/// A method body with its control-flow graph. Statement `0` is the entry
/// node; nodes without successors are the exit nodes.
pub struct Body {
    pub method: MethodId,
    pub this_var: Option<Var>,
    pub params: Vec<Var>,
    pub(crate) stmts: Vec<Statement>,
    pub(crate) var_types: Vec<Type>,
    pub(crate) graph: DiGraph<StmtId, ()>,
}

impl Body {
    pub fn entry(&self) -> StmtId {
        0
    }

    pub fn stmt(&self, id: StmtId) -> &Statement {
        &self.stmts[id]
    }

    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }

    pub fn successors(&self, id: StmtId) -> impl Iterator<Item = StmtId> + '_ {
        self.graph
            .neighbors_directed(NodeIndex::new(id), Direction::Outgoing)
            .map(|n| n.index())
    }

    pub fn predecessors(&self, id: StmtId) -> impl Iterator<Item = StmtId> + '_ {
        self.graph
            .neighbors_directed(NodeIndex::new(id), Direction::Incoming)
            .map(|n| n.index())
    }

    pub fn is_exit(&self, id: StmtId) -> bool {
        self.successors(id).next().is_none()
    }

    pub fn exit_nodes(&self) -> Vec<StmtId> {
        (0..self.stmts.len()).filter(|id| self.is_exit(*id)).collect()
    }

    pub fn var_type(&self, v: &Var) -> Type {
        self.var_types[v.ordinal as usize]
    }

    pub fn location(&self, id: StmtId) -> Location {
        Location {
            method: self.method,
            index: id as u32,
        }
    }
}
