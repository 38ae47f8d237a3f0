// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.
//
// Tests of the three ways library code enters the analysis: intrinsic
// summaries from the policy, mock substitute bodies, and opaque defaults.

use repta::interproc::InterProcTransAnalysis;
use repta::ir::{
    BodyBuilder, Call, CallKind, MethodRef, Operand, Program, ProgramBuilder, Rvalue, Statement,
    Type,
};
use repta::policy::{EmptyPolicy, Intrinsic, Policy};
use repta::region::{Region, Regions};

const MAX_ITERATIONS: u32 = 40;

/// Marks every method named `source` as intrinsic, returning the static
/// region.
struct SourcePolicy;

impl Policy for SourcePolicy {
    fn intrinsic_method(&self, _program: &Program, method: &MethodRef) -> Option<Intrinsic> {
        if method.sig.name.as_ref() == "source" {
            Some(Intrinsic::new(Regions::singleton(Region::Static)))
        } else {
            None
        }
    }
}

/// `m()` forwards the result of a library call; the entry summary depends
/// entirely on how that library method is modeled.
fn forwarding_program(lib_body: bool) -> (Program, MethodRef, repta::ir::ClassId) {
    let mut pb = ProgramBuilder::new();
    let a = pb.add_class("A");
    let lib = pb.add_library_class("Lib");
    let source = pb.declare_static_method(lib, "source", vec![], Type::Ref(a));
    let main = pb.add_class("Main");
    let m = pb.declare_static_method(main, "m", vec![], Type::Ref(a));

    if lib_body {
        // a same-named application twin carrying the substitute body
        let mock = pb.add_class("Lib");
        pb.register_mock(lib, mock);
        let mock_source = pb.declare_static_method(mock, "source", vec![], Type::Ref(a));
        let mut bb = BodyBuilder::new(pb.method_id(&mock_source));
        let x = bb.local("x", Type::Ref(a));
        bb.stmt(Statement::Assign { lhs: x.clone(), rhs: Rvalue::New { class: a } });
        bb.stmt(Statement::Return(Operand::Var(x)));
        pb.attach_body(&mock_source, bb.finish());
    }

    let mut bb = BodyBuilder::new(pb.method_id(&m));
    let r = bb.local("r", Type::Ref(a));
    bb.stmt(Statement::Assign {
        lhs: r.clone(),
        rhs: Rvalue::Call(Call {
            kind: CallKind::Static,
            callee: source,
            receiver: None,
            args: vec![],
        }),
    });
    bb.stmt(Statement::Return(Operand::Var(r)));
    pb.attach_body(&m, bb.finish());

    (pb.finish(), m, a)
}

#[test]
fn intrinsic_summaries_override_everything() {
    let (program, m, _) = forwarding_program(false);
    let policy = SourcePolicy;
    let mut analysis = InterProcTransAnalysis::new(&program, &policy, &m);
    let result = analysis.analyze(MAX_ITERATIONS).expect("fixed point");

    assert_eq!(result.regions, Regions::singleton(Region::Static));
}

#[test]
fn mocked_library_methods_are_analyzed_from_their_substitute() {
    let (program, m, a) = forwarding_program(true);
    let policy = EmptyPolicy;
    let mut analysis = InterProcTransAnalysis::new(&program, &policy, &m);
    let result = analysis.analyze(MAX_ITERATIONS).expect("fixed point");

    assert_eq!(result.regions.len(), 1);
    let region = result.regions.iter().next().unwrap();
    match region {
        Region::AllocationSite(site) => assert_eq!(site.class, a),
        other => panic!("unexpected region {:?}", other),
    }
}

#[test]
fn opaque_library_methods_default_to_unknown() {
    let (program, m, _) = forwarding_program(false);
    let policy = EmptyPolicy;
    let mut analysis = InterProcTransAnalysis::new(&program, &policy, &m);
    let result = analysis.analyze(MAX_ITERATIONS).expect("fixed point");

    assert_eq!(result.regions, Regions::singleton(Region::Unknown));
}

/// A default constructor without a body behaves as the identity on the
/// receiver: the allocation's region is untouched by the `<init>` call.
#[test]
fn bodiless_constructors_are_the_identity() {
    let mut pb = ProgramBuilder::new();
    let a = pb.add_class("A");
    let a_init = pb.declare_constructor(a, vec![]);
    let main = pb.add_class("Main");
    let m = pb.declare_static_method(main, "m", vec![], Type::Ref(a));

    let mut bb = BodyBuilder::new(pb.method_id(&m));
    let x = bb.local("x", Type::Ref(a));
    bb.stmt(Statement::Assign { lhs: x.clone(), rhs: Rvalue::New { class: a } });
    bb.stmt(Statement::Invoke(Call {
        kind: CallKind::Special,
        callee: a_init,
        receiver: Some(x.clone()),
        args: vec![],
    }));
    bb.stmt(Statement::Return(Operand::Var(x)));
    pb.attach_body(&m, bb.finish());
    let program = pb.finish();

    let policy = EmptyPolicy;
    let mut analysis = InterProcTransAnalysis::new(&program, &policy, &m);
    let result = analysis.analyze(MAX_ITERATIONS).expect("fixed point");

    assert_eq!(result.regions.len(), 1);
    assert!(matches!(
        result.regions.iter().next().unwrap(),
        Region::AllocationSite(_)
    ));
}
