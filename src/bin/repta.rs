// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The main routine of `repta`.
//!
//! Runs the transformation analysis on one of the built-in testcase
//! programs and prints the entry method's summary together with its
//! instantiation against an empty initial state.

use log::*;
use std::env;
use std::process;

use repta::interproc::InterProcTransAnalysis;
use repta::ir::{
    BodyBuilder, Call, CallKind, MethodRef, Operand, Program, ProgramBuilder, Rvalue, Statement,
    Type,
};
use repta::policy::EmptyPolicy;
use repta::util::options::AnalysisOptions;

fn main() {
    // Initialize the logger.
    if env::var("REPTA_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("REPTA_LOG")
            .write_style("REPTA_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    // Get any options specified via the REPTA_FLAGS environment variable.
    let mut options = AnalysisOptions::default();
    let repta_flags = env::var("REPTA_FLAGS").unwrap_or_default();
    let flag_args: Vec<String> = serde_json::from_str(&repta_flags).unwrap_or_default();
    options.parse_from_args(&flag_args[..]);

    // Let arguments supplied on the command line override the environment variable.
    let args = env::args().skip(1).collect::<Vec<_>>();
    options.parse_from_args(&args[..]);
    info!("Options: {:?}", options);

    let (program, default_entry) = testcase(&options.testcase);
    let entry = match &options.entry_func {
        None => default_entry,
        Some(name) => match program.find_method(name) {
            Some(m) => m,
            None => {
                eprintln!("no method named `{name}` in testcase {}", options.testcase);
                process::exit(1);
            }
        },
    };

    println!("Analysis result of the method {}", program.describe(&entry));
    let policy = EmptyPolicy;
    let mut analysis = InterProcTransAnalysis::new(&program, &policy, &entry);
    match analysis.analyze(options.max_iterations) {
        Some(result) => {
            if options.show_table {
                println!("Resulting table:");
                println!("{}", analysis.table());
            }
            println!("  Transformation: {}", result.transformation);
            println!("  Type term: {}", result.term);
            println!("  Environment: {}", result.environment);
            println!("  Field table: {}", result.field_table);
            println!("  Type: {}", result.regions);
        }
        None => {
            println!(
                "Failed: the computation doesn't converge within {} iterations.",
                options.max_iterations
            );
            process::exit(1);
        }
    }
}

fn testcase(name: &str) -> (Program, MethodRef) {
    match name {
        "running-example" => running_example(),
        "list-last" | "list-linear" | "list-cyclic" => linked_lists(name),
        "variable" => variable(),
        "field" => field(),
        "parameters" => parameters(),
        // the options parser restricts the value
        _ => unreachable!(),
    }
}

/// The running example:
/// ```text
/// D f() { C c = new C(); c.f = new D(); D d = new D(); return foo(d, c); }
/// D foo(D x, C y) { x = y.f; y = new C(); y.f = x; return y.f; }
/// ```
fn running_example() -> (Program, MethodRef) {
    let mut pb = ProgramBuilder::new();
    let example = pb.add_class("RunningExample");
    let c = pb.add_class("C");
    let d = pb.add_class("D");
    let f_field = pb.add_field(c, "f", Type::Ref(d));
    let c_init = pb.declare_constructor(c, vec![]);
    let d_init = pb.declare_constructor(d, vec![]);
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
    bb.stmt(Statement::Invoke(Call {
        kind: CallKind::Special,
        callee: c_init.clone(),
        receiver: Some(y.clone()),
        args: vec![],
    }));
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
    bb.stmt(Statement::Invoke(Call {
        kind: CallKind::Special,
        callee: c_init,
        receiver: Some(cv.clone()),
        args: vec![],
    }));
    let t = bb.local("t", Type::Ref(d));
    bb.stmt(Statement::Assign { lhs: t.clone(), rhs: Rvalue::New { class: d } });
    bb.stmt(Statement::Invoke(Call {
        kind: CallKind::Special,
        callee: d_init.clone(),
        receiver: Some(t.clone()),
        args: vec![],
    }));
    bb.stmt(Statement::FieldAssign { base: cv.clone(), field: f_field, value: Operand::Var(t) });
    let dv = bb.local("d", Type::Ref(d));
    bb.stmt(Statement::Assign { lhs: dv.clone(), rhs: Rvalue::New { class: d } });
    bb.stmt(Statement::Invoke(Call {
        kind: CallKind::Special,
        callee: d_init,
        receiver: Some(dv.clone()),
        args: vec![],
    }));
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

    (pb.finish(), foo)
}

/// Linked lists:
/// ```text
/// class Node { Node next; Node last() { if (next == null) return this; return next.last(); } }
/// static Node linear() { a = new Node(); a.next = new Node(); return a.last(); }
/// static Node cyclic() { a = new Node(); a.next = a; return a.last(); }
/// ```
fn linked_lists(name: &str) -> (Program, MethodRef) {
    let mut pb = ProgramBuilder::new();
    let node = pb.add_class("Node");
    let next = pb.add_field(node, "next", Type::Ref(node));
    let node_init = pb.declare_constructor(node, vec![]);
    let last = pb.declare_method(node, "last", vec![], Type::Ref(node));
    let test = pb.add_class("Test");
    let linear = pb.declare_static_method(test, "linear", vec![], Type::Ref(node));
    let cyclic = pb.declare_static_method(test, "cyclic", vec![], Type::Ref(node));

    let mut bb = BodyBuilder::new(pb.method_id(&last));
    let this = bb.bind_this("this", Type::Ref(node));
    let n = bb.local("n", Type::Ref(node));
    bb.stmt(Statement::Assign {
        lhs: n.clone(),
        rhs: Rvalue::FieldAccess { base: this.clone(), field: next.clone() },
    });
    let branch = bb.stmt(Statement::If);
    bb.stmt(Statement::Return(Operand::Var(this)));
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

    let mut bb = BodyBuilder::new(pb.method_id(&linear));
    let a = bb.local("a", Type::Ref(node));
    let b = bb.local("b", Type::Ref(node));
    bb.stmt(Statement::Assign { lhs: a.clone(), rhs: Rvalue::New { class: node } });
    bb.stmt(Statement::Invoke(Call {
        kind: CallKind::Special,
        callee: node_init.clone(),
        receiver: Some(a.clone()),
        args: vec![],
    }));
    bb.stmt(Statement::Assign { lhs: b.clone(), rhs: Rvalue::New { class: node } });
    bb.stmt(Statement::Invoke(Call {
        kind: CallKind::Special,
        callee: node_init.clone(),
        receiver: Some(b.clone()),
        args: vec![],
    }));
    bb.stmt(Statement::FieldAssign {
        base: a.clone(),
        field: next.clone(),
        value: Operand::Var(b),
    });
    let r = bb.local("r", Type::Ref(node));
    bb.stmt(Statement::Assign {
        lhs: r.clone(),
        rhs: Rvalue::Call(Call {
            kind: CallKind::Virtual,
            callee: last.clone(),
            receiver: Some(a),
            args: vec![],
        }),
    });
    bb.stmt(Statement::Return(Operand::Var(r)));
    pb.attach_body(&linear, bb.finish());

    let mut bb = BodyBuilder::new(pb.method_id(&cyclic));
    let a = bb.local("a", Type::Ref(node));
    bb.stmt(Statement::Assign { lhs: a.clone(), rhs: Rvalue::New { class: node } });
    bb.stmt(Statement::Invoke(Call {
        kind: CallKind::Special,
        callee: node_init,
        receiver: Some(a.clone()),
        args: vec![],
    }));
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
            callee: last.clone(),
            receiver: Some(a),
            args: vec![],
        }),
    });
    bb.stmt(Statement::Return(Operand::Var(r)));
    pb.attach_body(&cyclic, bb.finish());

    let entry = match name {
        "list-last" => last,
        "list-linear" => linear,
        _ => cyclic,
    };
    (pb.finish(), entry)
}

/// Strong updates: only the last of three assignments to `x` survives.
fn variable() -> (Program, MethodRef) {
    let mut pb = ProgramBuilder::new();
    let a = pb.add_class("A");
    let a_init = pb.declare_constructor(a, vec![]);
    let variable = pb.add_class("Variable");
    let h = pb.declare_method(variable, "h", vec![], Type::Ref(a));

    let mut bb = BodyBuilder::new(pb.method_id(&h));
    let _this = bb.bind_this("this", Type::Ref(variable));
    let x = bb.local("x", Type::Ref(a));
    for _ in 0..3 {
        bb.stmt(Statement::Assign { lhs: x.clone(), rhs: Rvalue::New { class: a } });
        bb.stmt(Statement::Invoke(Call {
            kind: CallKind::Special,
            callee: a_init.clone(),
            receiver: Some(x.clone()),
            args: vec![],
        }));
    }
    bb.stmt(Statement::Return(Operand::Var(x)));
    pb.attach_body(&h, bb.finish());

    (pb.finish(), h)
}

/// Weak updates: both writes to `y.f` survive in the field table.
/// ```text
/// M h() { N y = new N(); y.f = new M(); M x = y.f; y.f = new M(); return x; }
/// ```
fn field() -> (Program, MethodRef) {
    let mut pb = ProgramBuilder::new();
    let m = pb.add_class("M");
    let m_init = pb.declare_constructor(m, vec![]);
    let n = pb.add_class("N");
    let n_init = pb.declare_constructor(n, vec![]);
    let f_field = pb.add_field(n, "f", Type::Ref(m));
    let holder = pb.add_class("Field");
    let h = pb.declare_method(holder, "h", vec![], Type::Ref(m));

    let mut bb = BodyBuilder::new(pb.method_id(&h));
    let _this = bb.bind_this("this", Type::Ref(holder));
    let y = bb.local("y", Type::Ref(n));
    bb.stmt(Statement::Assign { lhs: y.clone(), rhs: Rvalue::New { class: n } });
    bb.stmt(Statement::Invoke(Call {
        kind: CallKind::Special,
        callee: n_init,
        receiver: Some(y.clone()),
        args: vec![],
    }));
    let t = bb.local("t", Type::Ref(m));
    bb.stmt(Statement::Assign { lhs: t.clone(), rhs: Rvalue::New { class: m } });
    bb.stmt(Statement::Invoke(Call {
        kind: CallKind::Special,
        callee: m_init.clone(),
        receiver: Some(t.clone()),
        args: vec![],
    }));
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
    bb.stmt(Statement::Invoke(Call {
        kind: CallKind::Special,
        callee: m_init,
        receiver: Some(u.clone()),
        args: vec![],
    }));
    bb.stmt(Statement::FieldAssign { base: y, field: f_field, value: Operand::Var(u) });
    bb.stmt(Statement::Return(Operand::Var(x)));
    pb.attach_body(&h, bb.finish());

    (pb.finish(), h)
}

/// Parameter passing: an object threaded through two identity methods.
fn parameters() -> (Program, MethodRef) {
    let mut pb = ProgramBuilder::new();
    let a = pb.add_class("A");
    let a_init = pb.declare_constructor(a, vec![]);
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
    bb.stmt(Statement::Invoke(Call {
        kind: CallKind::Special,
        callee: a_init,
        receiver: Some(av.clone()),
        args: vec![],
    }));
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

    (pb.finish(), f)
}
