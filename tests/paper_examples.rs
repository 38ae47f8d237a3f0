// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.
//
// End-to-end runs of the analysis on the examples from the underlying paper.

use repta::interproc::InterProcTransAnalysis;
use repta::ir::{
    BodyBuilder, Call, CallKind, ClassId, MethodRef, Operand, ProgramBuilder, Rvalue, Statement,
    Type, Var,
};
use repta::policy::EmptyPolicy;
use repta::region::Region;
use repta::transformation::Atom;

const MAX_ITERATIONS: u32 = 40;

fn allocation_sites(regions: impl IntoIterator<Item = Region>, class: ClassId) -> usize {
    regions
        .into_iter()
        .filter(|r| matches!(r, Region::AllocationSite(site) if site.class == class))
        .count()
}

/// `D f() { C c = new C(); c.f = new D(); D d = new D(); return foo(d, c); }`
/// `D foo(D x, C y) { x = y.f; y = new C(); y.f = x; return y.f; }`
///
/// The object stored into `c.f` flows through `foo`'s fresh `C` and comes
/// back out; the fresh `C`'s field additionally keeps its initial null.
#[test]
fn running_example_threads_field_contents_through_a_call() {
    let mut pb = ProgramBuilder::new();
    let example = pb.add_class("RunningExample");
    let c = pb.add_class("C");
    let d = pb.add_class("D");
    let f_field = pb.add_field(c, "f", Type::Ref(d));
    let foo = pb.declare_method(example, "foo", vec![Type::Ref(d), Type::Ref(c)], Type::Ref(d));
    let f = pb.declare_method(example, "f", vec![], Type::Ref(d));

    let mut bb = BodyBuilder::new(pb.method_id(&foo));
    let _this = bb.bind_this("this", Type::Ref(example));
    let x = bb.bind_param("x", Type::Ref(d));
    let y = bb.bind_param("y", Type::Ref(c));
    bb.stmt(Statement::Assign {
        lhs: x.clone(),
        rhs: Rvalue::FieldAccess { base: y.clone(), field: f_field.clone() },
    });
    bb.stmt(Statement::Assign { lhs: y.clone(), rhs: Rvalue::New { class: c } });
    bb.stmt(Statement::FieldAssign {
        base: y.clone(),
        field: f_field.clone(),
        value: Operand::Var(x),
    });
    let r = bb.local("r", Type::Ref(d));
    bb.stmt(Statement::Assign {
        lhs: r.clone(),
        rhs: Rvalue::FieldAccess { base: y, field: f_field.clone() },
    });
    bb.stmt(Statement::Return(Operand::Var(r)));
    pb.attach_body(&foo, bb.finish());

    let mut bb = BodyBuilder::new(pb.method_id(&f));
    let this = bb.bind_this("this", Type::Ref(example));
    let cv = bb.local("c", Type::Ref(c));
    bb.stmt(Statement::Assign { lhs: cv.clone(), rhs: Rvalue::New { class: c } });
    let t = bb.local("t", Type::Ref(d));
    bb.stmt(Statement::Assign { lhs: t.clone(), rhs: Rvalue::New { class: d } });
    bb.stmt(Statement::FieldAssign { base: cv.clone(), field: f_field, value: Operand::Var(t) });
    let dv = bb.local("d", Type::Ref(d));
    bb.stmt(Statement::Assign { lhs: dv.clone(), rhs: Rvalue::New { class: d } });
    let r = bb.local("r", Type::Ref(d));
    bb.stmt(Statement::Assign {
        lhs: r.clone(),
        rhs: Rvalue::Call(Call {
            kind: CallKind::Virtual,
            callee: foo.clone(),
            receiver: Some(this),
            args: vec![Operand::Var(dv), Operand::Var(cv)],
        }),
    });
    bb.stmt(Statement::Return(Operand::Var(r)));
    pb.attach_body(&f, bb.finish());
    let program = pb.finish();

    let policy = EmptyPolicy;
    let mut analysis = InterProcTransAnalysis::new(&program, &policy, &f);
    let result = analysis.analyze(MAX_ITERATIONS).expect("fixed point");

    // the returned value is the D stored into c.f, or the fresh C's
    // uninitialized field
    assert_eq!(allocation_sites(result.regions.iter().cloned(), d), 1);
    assert!(result.regions.contains(&Region::Null));
    assert_eq!(allocation_sites(result.regions.iter().cloned(), c), 0);
}

/// Builds the `Node` class with `last`, returning the program builder and
/// the pieces the callers need.
fn node_class() -> (ProgramBuilder, ClassId, repta::ir::Field, MethodRef, Var) {
    let mut pb = ProgramBuilder::new();
    let node = pb.add_class("Node");
    let next = pb.add_field(node, "next", Type::Ref(node));
    let last = pb.declare_method(node, "last", vec![], Type::Ref(node));

    // Node last() { if (next == null) return this; return next.last(); }
    let mut bb = BodyBuilder::new(pb.method_id(&last));
    let this = bb.bind_this("this", Type::Ref(node));
    let n = bb.local("n", Type::Ref(node));
    bb.stmt(Statement::Assign {
        lhs: n.clone(),
        rhs: Rvalue::FieldAccess { base: this.clone(), field: next.clone() },
    });
    let branch = bb.stmt(Statement::If);
    bb.stmt(Statement::Return(Operand::Var(this.clone())));
    let r = bb.local("r", Type::Ref(node));
    let recurse = bb.stmt(Statement::Assign {
        lhs: r.clone(),
        rhs: Rvalue::Call(Call {
            kind: CallKind::Virtual,
            callee: last.clone(),
            receiver: Some(n),
            args: vec![],
        }),
    });
    bb.stmt(Statement::Return(Operand::Var(r)));
    bb.edge(branch, recurse);
    pb.attach_body(&last, bb.finish());

    (pb, node, next, last, this)
}

/// Traversal summaries stay finite: the unbounded `next.next. ... .next`
/// family is folded into a single atom whose field graph has a `next`-loop.
#[test]
fn list_traversal_folds_the_field_chain() {
    let (pb, _, next, last, this) = node_class();
    let program = pb.finish();

    let policy = EmptyPolicy;
    let mut analysis = InterProcTransAnalysis::new(&program, &policy, &last);
    let result = analysis.analyze(MAX_ITERATIONS).expect("fixed point");

    // {this, this.next, this.(next,[(next, next)],next)}
    assert_eq!(result.term.len(), 3);
    assert!(result.term.contains(&Atom::Variable(this.clone())));
    let has_cycle = result.term.atoms().any(|a| match a {
        Atom::VariableField(v, g) => *v == this && g.contains_edge(&next, &next),
        _ => false,
    });
    assert!(has_cycle);
}

#[test]
fn last_of_a_linear_list_reaches_both_nodes() {
    let (mut pb, node, next, last, _) = node_class();
    let test = pb.add_class("Test");
    let linear = pb.declare_static_method(test, "linear", vec![], Type::Ref(node));

    let mut bb = BodyBuilder::new(pb.method_id(&linear));
    let a = bb.local("a", Type::Ref(node));
    let b = bb.local("b", Type::Ref(node));
    bb.stmt(Statement::Assign { lhs: a.clone(), rhs: Rvalue::New { class: node } });
    bb.stmt(Statement::Assign { lhs: b.clone(), rhs: Rvalue::New { class: node } });
    bb.stmt(Statement::FieldAssign { base: a.clone(), field: next, value: Operand::Var(b) });
    let r = bb.local("r", Type::Ref(node));
    bb.stmt(Statement::Assign {
        lhs: r.clone(),
        rhs: Rvalue::Call(Call {
            kind: CallKind::Virtual,
            callee: last,
            receiver: Some(a),
            args: vec![],
        }),
    });
    bb.stmt(Statement::Return(Operand::Var(r)));
    pb.attach_body(&linear, bb.finish());
    let program = pb.finish();

    let policy = EmptyPolicy;
    let mut analysis = InterProcTransAnalysis::new(&program, &policy, &linear);
    let result = analysis.analyze(MAX_ITERATIONS).expect("fixed point");

    assert_eq!(allocation_sites(result.regions.iter().cloned(), node), 2);
}

/// A cyclic list: the traversal can only ever reach the single node.
#[test]
fn last_of_a_cyclic_list_stays_on_the_node() {
    let (mut pb, node, next, last, _) = node_class();
    let test = pb.add_class("Test");
    let cyclic = pb.declare_static_method(test, "cyclic", vec![], Type::Ref(node));

    let mut bb = BodyBuilder::new(pb.method_id(&cyclic));
    let a = bb.local("a", Type::Ref(node));
    bb.stmt(Statement::Assign { lhs: a.clone(), rhs: Rvalue::New { class: node } });
    bb.stmt(Statement::FieldAssign {
        base: a.clone(),
        field: next,
        value: Operand::Var(a.clone()),
    });
    let r = bb.local("r", Type::Ref(node));
    bb.stmt(Statement::Assign {
        lhs: r.clone(),
        rhs: Rvalue::Call(Call {
            kind: CallKind::Virtual,
            callee: last,
            receiver: Some(a),
            args: vec![],
        }),
    });
    bb.stmt(Statement::Return(Operand::Var(r)));
    pb.attach_body(&cyclic, bb.finish());
    let program = pb.finish();

    let policy = EmptyPolicy;
    let mut analysis = InterProcTransAnalysis::new(&program, &policy, &cyclic);
    let result = analysis.analyze(MAX_ITERATIONS).expect("fixed point");

    assert_eq!(result.regions.len(), 1);
    assert_eq!(allocation_sites(result.regions.iter().cloned(), node), 1);
}

/// `A h() { A x = new A(); x = new A(); x = new A(); return x; }`
#[test]
fn repeated_variable_writes_keep_only_the_last() {
    let mut pb = ProgramBuilder::new();
    let a = pb.add_class("A");
    let holder = pb.add_class("Variable");
    let h = pb.declare_method(holder, "h", vec![], Type::Ref(a));

    let mut bb = BodyBuilder::new(pb.method_id(&h));
    let _this = bb.bind_this("this", Type::Ref(holder));
    let x = bb.local("x", Type::Ref(a));
    for _ in 0..3 {
        bb.stmt(Statement::Assign { lhs: x.clone(), rhs: Rvalue::New { class: a } });
    }
    let last_alloc = bb.stmt(Statement::Return(Operand::Var(x))) - 1;
    pb.attach_body(&h, bb.finish());
    let program = pb.finish();

    let policy = EmptyPolicy;
    let mut analysis = InterProcTransAnalysis::new(&program, &policy, &h);
    let result = analysis.analyze(MAX_ITERATIONS).expect("fixed point");

    assert_eq!(result.regions.len(), 1);
    let survivor = result.regions.iter().next().unwrap();
    match survivor {
        Region::AllocationSite(site) => assert_eq!(site.location.index as usize, last_alloc),
        other => panic!("unexpected region {:?}", other),
    }
}

/// `M h() { N y = new N(); y.f = new M(); M x = y.f; y.f = new M(); return x; }`
#[test]
fn repeated_field_writes_accumulate() {
    let mut pb = ProgramBuilder::new();
    let m = pb.add_class("M");
    let n = pb.add_class("N");
    let f_field = pb.add_field(n, "f", Type::Ref(m));
    let holder = pb.add_class("Field");
    let h = pb.declare_method(holder, "h", vec![], Type::Ref(m));

    let mut bb = BodyBuilder::new(pb.method_id(&h));
    let _this = bb.bind_this("this", Type::Ref(holder));
    let y = bb.local("y", Type::Ref(n));
    bb.stmt(Statement::Assign { lhs: y.clone(), rhs: Rvalue::New { class: n } });
    let t = bb.local("t", Type::Ref(m));
    bb.stmt(Statement::Assign { lhs: t.clone(), rhs: Rvalue::New { class: m } });
    bb.stmt(Statement::FieldAssign {
        base: y.clone(),
        field: f_field.clone(),
        value: Operand::Var(t),
    });
    let x = bb.local("x", Type::Ref(m));
    bb.stmt(Statement::Assign {
        lhs: x.clone(),
        rhs: Rvalue::FieldAccess { base: y.clone(), field: f_field.clone() },
    });
    let u = bb.local("u", Type::Ref(m));
    bb.stmt(Statement::Assign { lhs: u.clone(), rhs: Rvalue::New { class: m } });
    bb.stmt(Statement::FieldAssign { base: y, field: f_field, value: Operand::Var(u) });
    bb.stmt(Statement::Return(Operand::Var(x)));
    pb.attach_body(&h, bb.finish());
    let program = pb.finish();

    let policy = EmptyPolicy;
    let mut analysis = InterProcTransAnalysis::new(&program, &policy, &h);
    let result = analysis.analyze(MAX_ITERATIONS).expect("fixed point");

    // the read of y.f sees both writes
    assert_eq!(allocation_sites(result.regions.iter().cloned(), m), 2);
}

/// `A f() { A a = new A(); return id2(a); }` with `id2` delegating to `id`.
#[test]
fn parameters_pass_through_identity_methods() {
    let mut pb = ProgramBuilder::new();
    let a = pb.add_class("A");
    let params = pb.add_class("Parameters");
    let f = pb.declare_method(params, "f", vec![], Type::Ref(a));
    let id = pb.declare_method(params, "id", vec![Type::Ref(a)], Type::Ref(a));
    let id2 = pb.declare_method(params, "id2", vec![Type::Ref(a)], Type::Ref(a));

    let mut bb = BodyBuilder::new(pb.method_id(&id));
    let _this = bb.bind_this("this", Type::Ref(params));
    let x = bb.bind_param("x", Type::Ref(a));
    bb.stmt(Statement::Return(Operand::Var(x)));
    pb.attach_body(&id, bb.finish());

    let mut bb = BodyBuilder::new(pb.method_id(&id2));
    let this = bb.bind_this("this", Type::Ref(params));
    let x = bb.bind_param("x", Type::Ref(a));
    let r = bb.local("r", Type::Ref(a));
    bb.stmt(Statement::Assign {
        lhs: r.clone(),
        rhs: Rvalue::Call(Call {
            kind: CallKind::Virtual,
            callee: id,
            receiver: Some(this),
            args: vec![Operand::Var(x)],
        }),
    });
    bb.stmt(Statement::Return(Operand::Var(r)));
    pb.attach_body(&id2, bb.finish());

    let mut bb = BodyBuilder::new(pb.method_id(&f));
    let this = bb.bind_this("this", Type::Ref(params));
    let av = bb.local("a", Type::Ref(a));
    bb.stmt(Statement::Assign { lhs: av.clone(), rhs: Rvalue::New { class: a } });
    let r = bb.local("r", Type::Ref(a));
    bb.stmt(Statement::Assign {
        lhs: r.clone(),
        rhs: Rvalue::Call(Call {
            kind: CallKind::Virtual,
            callee: id2,
            receiver: Some(this),
            args: vec![Operand::Var(av)],
        }),
    });
    bb.stmt(Statement::Return(Operand::Var(r)));
    pb.attach_body(&f, bb.finish());
    let program = pb.finish();

    let policy = EmptyPolicy;
    let mut analysis = InterProcTransAnalysis::new(&program, &policy, &f);
    let result = analysis.analyze(MAX_ITERATIONS).expect("fixed point");

    assert_eq!(result.regions.len(), 1);
    assert_eq!(allocation_sites(result.regions.iter().cloned(), a), 1);
}
