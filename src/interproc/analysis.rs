// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The interprocedural driver: re-analyzes every tabled method until the
//! whole table reaches a fixed point, then instantiates the entry method's
//! summary against an empty initial state.

use std::time::Instant;

use log::*;

use crate::interproc::field_table::FieldTable;
use crate::interproc::method_table::MethodTable;
use crate::intraproc::environment::Environment;
use crate::intraproc::flow;
use crate::ir::program::{MethodRef, Program};
use crate::policy::Policy;
use crate::region::Regions;
use crate::transformation::term::Term;
use crate::transformation::transformation::Transformation;

/// Everything the analysis can say about the entry method: its symbolic
/// summary, and that summary instantiated against an empty initial state.
pub struct AnalysisResult {
    pub transformation: Transformation,
    pub term: Term,
    pub environment: Environment,
    pub field_table: FieldTable,
    pub regions: Regions,
}

pub struct InterProcTransAnalysis<'p> {
    program: &'p Program,
    entry: MethodRef,
    table: MethodTable<'p>,
}

impl<'p> InterProcTransAnalysis<'p> {
    pub fn new(
        program: &'p Program,
        policy: &'p dyn Policy,
        entry: &MethodRef,
    ) -> InterProcTransAnalysis<'p> {
        let entry = program.resolve(entry).unwrap_or_else(|| entry.clone());
        let mut table = MethodTable::new(program, policy);
        table.ensure_present(&entry);
        InterProcTransAnalysis {
            program,
            entry,
            table,
        }
    }

    pub fn table(&self) -> &MethodTable<'p> {
        &self.table
    }

    pub fn entry(&self) -> &MethodRef {
        &self.entry
    }

    /// Iterates the intraprocedural pass over every tabled method until two
    /// consecutive table snapshots agree. Recursion makes summaries grow
    /// across rounds; the finite region and field-graph domains bound the
    /// growth, but a `max_iterations` guard is kept against summary
    /// explosion on degenerate inputs. Returns `None` when the guard trips.
    pub fn analyze(&mut self, max_iterations: u32) -> Option<AnalysisResult> {
        let start = Instant::now();
        let mut iteration = 1;
        loop {
            trace!("table at iteration {}:\n{}", iteration, self.table);
            let snapshot = self.table.entries().clone();
            for m in snapshot.keys() {
                flow::run(&mut self.table, m);
            }
            if *self.table.entries() == snapshot {
                info!(
                    "analysis of {} converged after {} iteration(s) in {}",
                    self.program.describe(&self.entry),
                    iteration,
                    humantime::format_duration(start.elapsed())
                );
                let summary = self.table.summary(&self.entry);
                let (environment, field_table) = summary.trans.instantiate(
                    self.program,
                    &Environment::new(),
                    &FieldTable::new(),
                );
                let regions = summary.term.instantiate(&environment, &field_table);
                return Some(AnalysisResult {
                    transformation: summary.trans,
                    term: summary.term,
                    environment,
                    field_table,
                    regions,
                });
            }
            iteration += 1;
            if iteration > max_iterations {
                warn!(
                    "analysis of {} did not converge within {} iterations",
                    self.program.describe(&self.entry),
                    max_iterations
                );
                return None;
            }
            debug!("table changed, starting iteration {}", iteration);
        }
    }
}

#[cfg(test)]
mod test {
    use crate::ir::body::{Call, CallKind, Operand, Rvalue, Statement};
    use crate::ir::builder::{BodyBuilder, ProgramBuilder};
    use crate::ir::program::Type;
    use crate::policy::EmptyPolicy;
    use crate::region::Region;

    use super::InterProcTransAnalysis;

    #[test]
    fn mutually_recursive_methods_converge() {
        // f(p) { if (..) return p; return g(p); }  g(q) { return f(q); }
        let mut pb = ProgramBuilder::new();
        let a = pb.add_class("A");
        let main = pb.add_class("Main");
        let f = pb.declare_static_method(main, "f", vec![Type::Ref(a)], Type::Ref(a));
        let g = pb.declare_static_method(main, "g", vec![Type::Ref(a)], Type::Ref(a));

        let mut bb = BodyBuilder::new(pb.method_id(&f));
        let p = bb.bind_param("p", Type::Ref(a));
        let r = bb.local("r", Type::Ref(a));
        let branch = bb.stmt(Statement::If);
        bb.stmt(Statement::Return(Operand::Var(p.clone())));
        let recurse = bb.stmt(Statement::Assign {
            lhs: r.clone(),
            rhs: Rvalue::Call(Call {
                kind: CallKind::Static,
                callee: g.clone(),
                receiver: None,
                args: vec![Operand::Var(p)],
            }),
        });
        bb.stmt(Statement::Return(Operand::Var(r)));
        bb.edge(branch, recurse);
        pb.attach_body(&f, bb.finish());

        let mut bb = BodyBuilder::new(pb.method_id(&g));
        let q = bb.bind_param("q", Type::Ref(a));
        let r = bb.local("r", Type::Ref(a));
        bb.stmt(Statement::Assign {
            lhs: r.clone(),
            rhs: Rvalue::Call(Call {
                kind: CallKind::Static,
                callee: f.clone(),
                receiver: None,
                args: vec![Operand::Var(q)],
            }),
        });
        bb.stmt(Statement::Return(Operand::Var(r)));
        pb.attach_body(&g, bb.finish());
        let program = pb.finish();

        let policy = EmptyPolicy;
        let mut analysis = InterProcTransAnalysis::new(&program, &policy, &f);
        let result = analysis.analyze(40).expect("fixed point");
        // the parameter flows all the way through; nothing else can come out
        assert_eq!(result.term.len(), 1);
    }

    #[test]
    fn iteration_guard_reports_non_convergence() {
        // a single round can never suffice once the entry grows the table
        let mut pb = ProgramBuilder::new();
        let a = pb.add_class("A");
        pb.declare_constructor(a, vec![]);
        let main = pb.add_class("Main");
        let m = pb.declare_static_method(main, "m", vec![], Type::Ref(a));
        let helper = pb.declare_static_method(main, "helper", vec![], Type::Ref(a));

        let mut bb = BodyBuilder::new(pb.method_id(&helper));
        let x = bb.local("x", Type::Ref(a));
        bb.stmt(Statement::Assign {
            lhs: x.clone(),
            rhs: Rvalue::New { class: a },
        });
        bb.stmt(Statement::Return(Operand::Var(x)));
        pb.attach_body(&helper, bb.finish());

        let mut bb = BodyBuilder::new(pb.method_id(&m));
        let y = bb.local("y", Type::Ref(a));
        bb.stmt(Statement::Assign {
            lhs: y.clone(),
            rhs: Rvalue::Call(Call {
                kind: CallKind::Static,
                callee: helper.clone(),
                receiver: None,
                args: vec![],
            }),
        });
        bb.stmt(Statement::Return(Operand::Var(y)));
        pb.attach_body(&m, bb.finish());
        let program = pb.finish();

        let policy = EmptyPolicy;
        let mut analysis = InterProcTransAnalysis::new(&program, &policy, &m);
        assert!(analysis.analyze(1).is_none());

        let mut analysis = InterProcTransAnalysis::new(&program, &policy, &m);
        let result = analysis.analyze(40).expect("fixed point");
        assert!(result
            .regions
            .iter()
            .any(|r| matches!(r, Region::AllocationSite(_))));
    }
}
