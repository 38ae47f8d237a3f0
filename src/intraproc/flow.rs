// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The intraprocedural pass: a forward worklist iteration over a method's
//! control-flow graph that computes, for every program point, the
//! transformation from the method's entry state to that point, then joins
//! the exit effect into the method's table entry.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::*;

use crate::interproc::method_table::{MethodSummary, MethodTable};
use crate::ir::body::{Body, Call, CallKind, Operand, Rvalue, Statement, StmtId};
use crate::ir::program::{MethodRef, Program, Type};
use crate::region::{CallingContext, Region};
use crate::transformation::atom::{Atom, Key};
use crate::transformation::field_graph::FieldGraph;
use crate::transformation::term::Term;
use crate::transformation::transformation::Transformation;

/// Runs the pass for `current` and joins its exit summary into the table.
/// A method without an analyzable body is left to its default summary.
pub fn run(table: &mut MethodTable<'_>, current: &MethodRef) {
    let program = table.program();
    let body = match table.body(current) {
        Some(body) => body,
        None => return,
    };
    debug!("flowing through {}", program.describe(current));

    let n = body.stmt_count();
    let mut ins = vec![Transformation::bottom(); n];
    let mut outs = vec![Transformation::bottom(); n];
    let mut worklist: VecDeque<StmtId> = (0..n).collect();
    let mut queued = vec![true; n];

    while let Some(id) = worklist.pop_front() {
        queued[id] = false;
        let mut in_flow = if id == body.entry() {
            Transformation::identity()
        } else {
            Transformation::bottom()
        };
        for pred in body.predecessors(id) {
            in_flow = in_flow.join(&outs[pred]);
        }
        let (stmt_trans, _) = flow_through(program, table, body, id);
        let out = stmt_trans.concat(&in_flow);
        trace!("  {}: {} => {}", body.location(id), in_flow, out);
        ins[id] = in_flow;
        if out != outs[id] {
            outs[id] = out;
            for succ in body.successors(id) {
                if !queued[succ] {
                    queued[succ] = true;
                    worklist.push_back(succ);
                }
            }
        }
    }

    let mut summary: Option<MethodSummary> = None;
    for id in body.exit_nodes() {
        let (stmt_trans, stmt_term) = flow_through(program, table, body, id);
        let exit = MethodSummary::new(
            stmt_trans.concat(&ins[id]),
            stmt_term.substitute(&ins[id]),
        );
        summary = Some(match summary {
            Some(acc) => acc.join(&exit),
            None => exit,
        });
    }
    let summary = match summary {
        Some(summary) => summary,
        None => return,
    };

    // callers only see `this` and the parameters
    let mut keep: BTreeSet<_> = body.params.iter().cloned().collect();
    if let Some(this) = &body.this_var {
        keep.insert(this.clone());
    }
    let summary = summary.clean(&keep);
    table.ensure_present(current);
    table.join_if_present(current, &summary);
}

/// The effect of a single statement: the transformation it applies to the
/// incoming state, and the term for the value it returns, if any. Both are
/// expressed relative to the state at the statement's entry.
fn flow_through(
    program: &Program,
    table: &mut MethodTable<'_>,
    body: &Body,
    id: StmtId,
) -> (Transformation, Term) {
    match body.stmt(id) {
        // parameter bindings carry no information of their own
        Statement::BindThis { .. } | Statement::BindParam { .. } => {
            (Transformation::identity(), Term::empty())
        }
        Statement::Assign { lhs, rhs } => {
            let (rtrans, rterm) = eval_rvalue(program, table, body, id, rhs);
            let assign = Transformation::singleton(Key::Variable(lhs.clone()), rterm);
            (assign.concat(&rtrans), Term::empty())
        }
        Statement::FieldAssign { base, field, value } => {
            let key = Key::VariableField(base.clone(), FieldGraph::singleton(field.clone()));
            (
                Transformation::singleton(key, eval_operand(value)),
                Term::empty(),
            )
        }
        Statement::StaticAssign { field, value } => {
            let key = Key::RegionField(Region::Static, FieldGraph::singleton(field.clone()));
            (
                Transformation::singleton(key, eval_operand(value)),
                Term::empty(),
            )
        }
        // array elements are collapsed; the write is not tracked
        Statement::ArrayAssign { .. } => (Transformation::identity(), Term::empty()),
        Statement::Invoke(call) => {
            let (trans, _) = eval_call(program, table, call);
            (trans, Term::empty())
        }
        Statement::Return(operand) => (Transformation::identity(), eval_operand(operand)),
        Statement::ReturnVoid => (Transformation::identity(), Term::region(Region::Base)),
        Statement::Throw(_)
        | Statement::If
        | Statement::Goto
        | Statement::Switch
        | Statement::Nop => (Transformation::identity(), Term::empty()),
    }
}

fn eval_operand(operand: &Operand) -> Term {
    match operand {
        Operand::Var(v) => Term::var(v.clone()),
        Operand::Constant | Operand::StringConstant => Term::region(Region::Base),
    }
}

fn eval_rvalue(
    program: &Program,
    table: &mut MethodTable<'_>,
    body: &Body,
    id: StmtId,
    rvalue: &Rvalue,
) -> (Transformation, Term) {
    let term = match rvalue {
        Rvalue::Use(operand) => eval_operand(operand),
        Rvalue::FieldAccess { base, field } => Term::atom(Atom::VariableField(
            base.clone(),
            FieldGraph::singleton(field.clone()),
        )),
        Rvalue::StaticAccess { field } => Term::atom(Atom::RegionField(
            Region::Static,
            FieldGraph::singleton(field.clone()),
        )),
        Rvalue::New { class } => Term::region(Region::allocation_site(
            *class,
            program.class_name(*class),
            CallingContext::empty(),
            body.location(id),
        )),
        Rvalue::Call(call) => return eval_call(program, table, call),
        Rvalue::Cast { to, operand } => eval_cast(program, body, to, operand),
        Rvalue::InstanceOf { .. }
        | Rvalue::ArrayLength { .. }
        | Rvalue::UnaryOp { .. }
        | Rvalue::BinaryOp { .. } => Term::region(Region::Base),
        // array elements are collapsed; nothing flows out of a read
        Rvalue::ArrayAccess { .. } => Term::empty(),
    };
    (Transformation::identity(), term)
}

/// A cast passes its operand through when the classes are comparable and
/// yields nothing otherwise: an incomparable cast can only throw.
fn eval_cast(program: &Program, body: &Body, to: &Type, operand: &Operand) -> Term {
    match to {
        Type::Base => Term::region(Region::Base),
        Type::Ref(to_class) => match operand {
            Operand::Var(v) => match body.var_type(v) {
                Type::Base => Term::empty(),
                Type::Ref(from_class) => {
                    if program.comparable(from_class, *to_class) {
                        Term::var(v.clone())
                    } else {
                        warn!(
                            "cast from {} to {} cannot succeed",
                            program.class_name(from_class),
                            program.class_name(*to_class)
                        );
                        Term::empty()
                    }
                }
            },
            Operand::Constant | Operand::StringConstant => Term::empty(),
        },
    }
}

/// The caller-side effect of a call: the callee's summary with its
/// parameters and `this` substituted by the actual arguments and receiver.
fn eval_call(
    program: &Program,
    table: &mut MethodTable<'_>,
    call: &Call,
) -> (Transformation, Term) {
    let callee_atom = match call.kind {
        CallKind::Static => Atom::Region(Region::Static),
        CallKind::Dynamic => {
            unreachable!("dynamic call sites must be filtered by the front end")
        }
        CallKind::Special | CallKind::Virtual | CallKind::Interface => match &call.receiver {
            Some(receiver) => Atom::Variable(receiver.clone()),
            None => unreachable!("instance call without a receiver"),
        },
    };
    table.ensure_present(&call.callee);
    let summary = table.summary(&call.callee);
    let callee_body = match table.body(&call.callee) {
        Some(body) => body,
        // bodiless methods keep their default summaries as-is
        None => return (summary.trans, summary.term),
    };
    let mut map: BTreeMap<Key, Term> = BTreeMap::new();
    for (param, arg) in callee_body.params.iter().zip(&call.args) {
        map.insert(Key::Variable(param.clone()), eval_operand(arg));
    }
    if let Some(this) = &callee_body.this_var {
        map.insert(Key::Variable(this.clone()), Term::atom(callee_atom));
    }
    let pars_to_args = Transformation::create_after_cleanup(map);
    let trans = summary.trans.concat(&pars_to_args);
    let term = summary.term.substitute(&pars_to_args);
    trace!("call to {}: {} & {}", program.describe(&call.callee), trans, term);
    (trans, term)
}
