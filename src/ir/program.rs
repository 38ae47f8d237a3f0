// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Classes, fields, method references and the type-hierarchy oracle.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use crate::ir::body::Body;

/// The name under which constructors are declared.
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Unique identifier for a class or interface.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ClassId(pub u32);

/// Unique identifier for a declared method.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct MethodId(pub u32);

/// The analysis only distinguishes reference types from everything else.
/// Primitives, `void` and other non-reference values carry no aliasing
/// information and collapse into `Base`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Type {
    Base,
    Ref(ClassId),
}

impl Type {
    pub fn is_ref(&self) -> bool {
        matches!(self, Type::Ref(_))
    }
}

/// A field declaration. Two fields are the same exactly when their declaring
/// class, name and type agree.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Field {
    pub class: ClassId,
    pub name: Rc<str>,
    pub ty: Type,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A method sub-signature: everything that identifies a method within a class.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Signature {
    pub name: Rc<str>,
    pub params: Vec<Type>,
    pub ret: Type,
    pub is_static: bool,
}

/// A reference to a method as seen at a call site or table key: a declaring
/// class paired with a sub-signature. The referenced class does not need to
/// declare the method itself; see [`Program::resolve`].
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct MethodRef {
    pub class: ClassId,
    pub sig: Rc<Signature>,
}

impl MethodRef {
    pub fn new(class: ClassId, sig: Rc<Signature>) -> Self {
        MethodRef { class, sig }
    }

    /// The same sub-signature referenced on a different class.
    pub fn with_class(&self, class: ClassId) -> Self {
        MethodRef {
            class,
            sig: self.sig.clone(),
        }
    }

    pub fn is_constructor(&self) -> bool {
        &*self.sig.name == CONSTRUCTOR_NAME
    }
}

pub(crate) struct ClassData {
    pub name: Rc<str>,
    pub superclass: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    pub is_interface: bool,
    pub is_library: bool,
    pub fields: Vec<Field>,
    pub methods: HashMap<Rc<Signature>, MethodId>,
}

pub(crate) struct MethodData {
    pub class: ClassId,
    pub sig: Rc<Signature>,
    pub body: Option<Body>,
}

/// A closed-world program: every class the analysis will ever see is declared
/// up front. Mirrors the host environment contract of a bytecode front end
/// with hierarchy resolution already performed.
pub struct Program {
    pub(crate) classes: Vec<ClassData>,
    pub(crate) methods: Vec<MethodData>,
    /// Library classes with a substitute implementation carrying analyzable bodies.
    pub(crate) mocks: HashMap<ClassId, ClassId>,
    /// The root of the class hierarchy.
    pub object_class: ClassId,
}

impl Program {
    fn class(&self, c: ClassId) -> &ClassData {
        &self.classes[c.0 as usize]
    }

    pub fn class_name(&self, c: ClassId) -> Rc<str> {
        self.class(c).name.clone()
    }

    pub fn is_interface(&self, c: ClassId) -> bool {
        self.class(c).is_interface
    }

    pub fn is_library_class(&self, c: ClassId) -> bool {
        self.class(c).is_library
    }

    pub fn superclass(&self, c: ClassId) -> Option<ClassId> {
        self.class(c).superclass
    }

    pub fn interfaces(&self, c: ClassId) -> &[ClassId] {
        &self.class(c).interfaces
    }

    /// The fields declared directly on `c` (inherited fields live on the
    /// superclass entry).
    pub fn fields_of(&self, c: ClassId) -> &[Field] {
        &self.class(c).fields
    }

    pub fn declares_method(&self, c: ClassId, sig: &Signature) -> bool {
        self.class(c).methods.contains_key(sig)
    }

    /// The method declared directly on `m.class`, if any.
    pub fn declared_method(&self, m: &MethodRef) -> Option<MethodId> {
        self.class(m.class).methods.get(&m.sig).copied()
    }

    /// Resolves a method reference to its most specific declared
    /// implementation: the superclass chain first, then transitively the
    /// implemented interfaces.
    pub fn resolve(&self, m: &MethodRef) -> Option<MethodRef> {
        let mut c = Some(m.class);
        while let Some(cur) = c {
            if self.declares_method(cur, &m.sig) {
                return Some(m.with_class(cur));
            }
            c = self.class(cur).superclass;
        }
        let mut queue: VecDeque<ClassId> = self.collect_all_interfaces(m.class).into();
        while let Some(i) = queue.pop_front() {
            if self.declares_method(i, &m.sig) {
                return Some(m.with_class(i));
            }
            queue.extend(self.class(i).interfaces.iter().copied());
        }
        None
    }

    /// The body of the most specific implementation of `m`, if one exists.
    pub fn body(&self, m: &MethodRef) -> Option<&Body> {
        let resolved = self.resolve(m)?;
        let id = self.declared_method(&resolved)?;
        self.methods[id.0 as usize].body.as_ref()
    }

    pub fn body_of_id(&self, m: MethodId) -> Option<&Body> {
        self.methods[m.0 as usize].body.as_ref()
    }

    /// Looks a method up by bare name, anywhere in the program. Intended for
    /// entry-point selection; ambiguous names resolve to the first declaring
    /// class in declaration order.
    pub fn find_method(&self, name: &str) -> Option<MethodRef> {
        self.methods
            .iter()
            .find(|m| m.sig.name.as_ref() == name)
            .map(|m| MethodRef {
                class: m.class,
                sig: m.sig.clone(),
            })
    }

    /// The substitute reference for a mocked library method, if a mock class
    /// is registered for its declaring class.
    pub fn mock_method(&self, m: &MethodRef) -> Option<MethodRef> {
        self.mocks.get(&m.class).map(|mock| m.with_class(*mock))
    }

    pub fn direct_subclasses(&self, c: ClassId) -> Vec<ClassId> {
        self.class_ids()
            .filter(|d| self.class(*d).superclass == Some(c))
            .collect()
    }

    pub fn direct_subinterfaces(&self, i: ClassId) -> Vec<ClassId> {
        self.class_ids()
            .filter(|d| self.class(*d).is_interface && self.class(*d).interfaces.contains(&i))
            .collect()
    }

    pub fn direct_implementers(&self, i: ClassId) -> Vec<ClassId> {
        self.class_ids()
            .filter(|d| !self.class(*d).is_interface && self.class(*d).interfaces.contains(&i))
            .collect()
    }

    /// All classes below `c`, excluding `c` itself.
    pub fn subclasses_of(&self, c: ClassId) -> Vec<ClassId> {
        let mut result = Vec::new();
        let mut queue: VecDeque<ClassId> = self.direct_subclasses(c).into();
        while let Some(d) = queue.pop_front() {
            queue.extend(self.direct_subclasses(d));
            result.push(d);
        }
        result
    }

    /// All interfaces below `i`, excluding `i` itself.
    pub fn subinterfaces_of(&self, i: ClassId) -> Vec<ClassId> {
        let mut result = Vec::new();
        let mut queue: VecDeque<ClassId> = self.direct_subinterfaces(i).into();
        while let Some(d) = queue.pop_front() {
            queue.extend(self.direct_subinterfaces(d));
            result.push(d);
        }
        result
    }

    /// All classes implementing `i` or any of its subinterfaces, together
    /// with their subclasses.
    pub fn implementers_of(&self, i: ClassId) -> Vec<ClassId> {
        let mut interfaces = vec![i];
        interfaces.extend(self.subinterfaces_of(i));
        let mut result = Vec::new();
        for iface in interfaces {
            for c in self.direct_implementers(iface) {
                result.push(c);
                result.extend(self.subclasses_of(c));
            }
        }
        result.sort();
        result.dedup();
        result
    }

    pub fn is_subclass_of(&self, c: ClassId, sup: ClassId) -> bool {
        let mut cur = Some(c);
        while let Some(d) = cur {
            if d == sup {
                return true;
            }
            cur = self.class(d).superclass;
        }
        false
    }

    fn collect_all_interfaces(&self, c: ClassId) -> Vec<ClassId> {
        let mut result = Vec::new();
        let mut cur = Some(c);
        while let Some(d) = cur {
            result.extend(self.class(d).interfaces.iter().copied());
            cur = self.class(d).superclass;
        }
        result
    }

    pub fn implements_interface(&self, c: ClassId, i: ClassId) -> bool {
        let mut queue: VecDeque<ClassId> = self.collect_all_interfaces(c).into();
        while let Some(d) = queue.pop_front() {
            if d == i {
                return true;
            }
            queue.extend(self.class(d).interfaces.iter().copied());
        }
        false
    }

    /// Whether a cast between the two classes can succeed. The hierarchy root
    /// is comparable to everything, and a class is comparable to its
    /// same-named mock twin.
    pub fn comparable(&self, c1: ClassId, c2: ClassId) -> bool {
        if c1 == self.object_class || c2 == self.object_class {
            return true;
        }
        if self.class(c1).name == self.class(c2).name {
            return true;
        }
        if self.class(c1).is_interface && self.implements_interface(c2, c1) {
            return true;
        }
        if self.class(c2).is_interface {
            self.implements_interface(c1, c2)
        } else {
            self.is_subclass_of(c1, c2) || self.is_subclass_of(c2, c1)
        }
    }

    /// Human-readable `Class.method` form for logs and reports.
    pub fn describe(&self, m: &MethodRef) -> String {
        format!("{}.{}", self.class(m.class).name, m.sig.name)
    }

    fn class_ids(&self) -> impl Iterator<Item = ClassId> + '_ {
        (0..self.classes.len() as u32).map(ClassId)
    }
}
