// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Programmatic construction of analyzed programs.
//!
//! Stands in for a bytecode front end: fixtures and tests declare classes,
//! fields and methods, then assemble bodies statement by statement. The
//! builder wires fall-through edges automatically; branch and loop edges are
//! added explicitly with [`BodyBuilder::edge`].

use std::collections::HashMap;
use std::rc::Rc;

use petgraph::graph::{DiGraph, NodeIndex};

use crate::ir::body::{Body, Statement, StmtId, Var};
use crate::ir::program::{
    ClassData, ClassId, Field, MethodData, MethodId, MethodRef, Program, Signature, Type,
    CONSTRUCTOR_NAME,
};

pub struct ProgramBuilder {
    classes: Vec<ClassData>,
    methods: Vec<MethodData>,
    mocks: HashMap<ClassId, ClassId>,
    object_class: ClassId,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    /// Creates a builder with the hierarchy root (a library class named
    /// `Object` with an empty default constructor) already declared.
    pub fn new() -> Self {
        let mut pb = ProgramBuilder {
            classes: Vec::new(),
            methods: Vec::new(),
            mocks: HashMap::new(),
            object_class: ClassId(0),
        };
        let object = pb.new_class("Object", None, false, true);
        pb.object_class = object;
        pb.declare_constructor(object, vec![]);
        pb
    }

    pub fn object_class(&self) -> ClassId {
        self.object_class
    }

    fn new_class(
        &mut self,
        name: &str,
        superclass: Option<ClassId>,
        is_interface: bool,
        is_library: bool,
    ) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(ClassData {
            name: Rc::from(name),
            superclass,
            interfaces: Vec::new(),
            is_interface,
            is_library,
            fields: Vec::new(),
            methods: HashMap::new(),
        });
        id
    }

    /// Declares an application class extending the hierarchy root.
    pub fn add_class(&mut self, name: &str) -> ClassId {
        let object = self.object_class;
        self.new_class(name, Some(object), false, false)
    }

    pub fn add_library_class(&mut self, name: &str) -> ClassId {
        let object = self.object_class;
        self.new_class(name, Some(object), false, true)
    }

    pub fn add_interface(&mut self, name: &str) -> ClassId {
        self.new_class(name, None, true, false)
    }

    pub fn set_superclass(&mut self, class: ClassId, superclass: ClassId) {
        self.classes[class.0 as usize].superclass = Some(superclass);
    }

    pub fn add_implements(&mut self, class: ClassId, interface: ClassId) {
        self.classes[class.0 as usize].interfaces.push(interface);
    }

    /// Registers `mock` as the substitute implementation for the library
    /// class `library`.
    pub fn register_mock(&mut self, library: ClassId, mock: ClassId) {
        self.mocks.insert(library, mock);
    }

    pub fn add_field(&mut self, class: ClassId, name: &str, ty: Type) -> Field {
        let field = Field {
            class,
            name: Rc::from(name),
            ty,
        };
        self.classes[class.0 as usize].fields.push(field.clone());
        field
    }

    fn declare(&mut self, class: ClassId, sig: Signature) -> MethodRef {
        let sig = Rc::new(sig);
        let id = MethodId(self.methods.len() as u32);
        self.methods.push(MethodData {
            class,
            sig: sig.clone(),
            body: None,
        });
        self.classes[class.0 as usize].methods.insert(sig.clone(), id);
        MethodRef::new(class, sig)
    }

    pub fn declare_method(
        &mut self,
        class: ClassId,
        name: &str,
        params: Vec<Type>,
        ret: Type,
    ) -> MethodRef {
        self.declare(
            class,
            Signature {
                name: Rc::from(name),
                params,
                ret,
                is_static: false,
            },
        )
    }

    pub fn declare_static_method(
        &mut self,
        class: ClassId,
        name: &str,
        params: Vec<Type>,
        ret: Type,
    ) -> MethodRef {
        self.declare(
            class,
            Signature {
                name: Rc::from(name),
                params,
                ret,
                is_static: true,
            },
        )
    }

    pub fn declare_constructor(&mut self, class: ClassId, params: Vec<Type>) -> MethodRef {
        self.declare(
            class,
            Signature {
                name: Rc::from(CONSTRUCTOR_NAME),
                params,
                ret: Type::Base,
                is_static: false,
            },
        )
    }

    /// The id of a method declared directly on `m.class`.
    pub fn method_id(&self, m: &MethodRef) -> MethodId {
        *self.classes[m.class.0 as usize]
            .methods
            .get(&m.sig)
            .unwrap_or_else(|| panic!("method {} not declared", m.sig.name))
    }

    pub fn attach_body(&mut self, m: &MethodRef, body: Body) {
        let id = self.method_id(m);
        assert_eq!(id, body.method, "body built for a different method");
        self.methods[id.0 as usize].body = Some(body);
    }

    pub fn finish(self) -> Program {
        Program {
            classes: self.classes,
            methods: self.methods,
            mocks: self.mocks,
            object_class: self.object_class,
        }
    }
}

/// Assembles one method body. Statements fall through to the next appended
/// statement unless they end a block (`Return`, `ReturnVoid`, `Goto`,
/// `Switch`, `Throw`).
pub struct BodyBuilder {
    method: MethodId,
    stmts: Vec<Statement>,
    var_types: Vec<Type>,
    this_var: Option<Var>,
    params: Vec<Var>,
    edges: Vec<(StmtId, StmtId)>,
    fallthrough_from: Option<StmtId>,
}

impl BodyBuilder {
    pub fn new(method: MethodId) -> Self {
        BodyBuilder {
            method,
            stmts: Vec::new(),
            var_types: Vec::new(),
            this_var: None,
            params: Vec::new(),
            edges: Vec::new(),
            fallthrough_from: None,
        }
    }

    pub fn local(&mut self, name: &str, ty: Type) -> Var {
        let ordinal = self.var_types.len() as u32;
        self.var_types.push(ty);
        Var {
            method: self.method,
            ordinal,
            name: Rc::from(name),
        }
    }

    /// Declares the `this` local and appends its identity statement.
    pub fn bind_this(&mut self, name: &str, ty: Type) -> Var {
        let v = self.local(name, ty);
        self.this_var = Some(v.clone());
        self.stmt(Statement::BindThis { lhs: v.clone() });
        v
    }

    /// Declares the next parameter local and appends its identity statement.
    pub fn bind_param(&mut self, name: &str, ty: Type) -> Var {
        let v = self.local(name, ty);
        let index = self.params.len();
        self.params.push(v.clone());
        self.stmt(Statement::BindParam {
            lhs: v.clone(),
            index,
        });
        v
    }

    pub fn stmt(&mut self, s: Statement) -> StmtId {
        let id = self.stmts.len();
        if let Some(prev) = self.fallthrough_from {
            self.edges.push((prev, id));
        }
        let falls_through = !matches!(
            s,
            Statement::Return(_)
                | Statement::ReturnVoid
                | Statement::Goto
                | Statement::Switch
                | Statement::Throw(_)
        );
        self.fallthrough_from = falls_through.then_some(id);
        self.stmts.push(s);
        id
    }

    /// Adds an explicit control edge, e.g. a branch target or a loop back
    /// edge.
    pub fn edge(&mut self, from: StmtId, to: StmtId) {
        self.edges.push((from, to));
    }

    pub fn finish(self) -> Body {
        let mut graph: DiGraph<StmtId, ()> = DiGraph::new();
        for id in 0..self.stmts.len() {
            graph.add_node(id);
        }
        for (from, to) in self.edges {
            graph.add_edge(NodeIndex::new(from), NodeIndex::new(to), ());
        }
        Body {
            method: self.method,
            this_var: self.this_var,
            params: self.params,
            stmts: self.stmts,
            var_types: self.var_types,
            graph,
        }
    }
}
