use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::fmt::Debug;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::Vm;
use crate::throw;

use super::{Typeof, Value};

/// Downcasting support for every object kind.
///
/// Implemented for all sized `'static` types, so object implementations never have to spell it out.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

pub trait Object: AsAny + Debug {
    /// Reads a property. This may run arbitrary code (a getter) and can therefore throw.
    fn get_property(&self, vm: &mut Vm, key: &str) -> Result<Value, Value>;

    fn apply(&self, vm: &mut Vm, this: Value, args: Vec<Value>) -> Result<Value, Value> {
        let _ = (vm, this, args);
        throw!(TypeError, "object is not a function")
    }

    fn type_of(&self) -> Typeof {
        Typeof::Object
    }

    /// How this object renders through `Display` on [`Value`].
    fn display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[object Object]")
    }
}

/// A shared reference to an object. Two handles are equal iff they point to the same object.
#[derive(Clone)]
pub struct Handle(Rc<dyn Object>);

impl Handle {
    pub fn new<O: Object + 'static>(object: O) -> Self {
        Self(Rc::new(object))
    }

    pub fn ptr_eq(&self, other: &Handle) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }

    pub fn downcast_ref<T: Object + 'static>(&self) -> Option<&T> {
        AsAny::as_any(&*self.0).downcast_ref::<T>()
    }

    pub fn downcast<T: Object + 'static>(&self) -> Option<Rc<T>> {
        AsAny::into_any_rc(Rc::clone(&self.0)).downcast::<T>().ok()
    }

    pub fn as_object(&self) -> &dyn Object {
        &*self.0
    }
}

impl<O: Object + 'static> From<Rc<O>> for Handle {
    fn from(object: Rc<O>) -> Self {
        Self(object)
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.display(f)
    }
}

/// An ordinary object: a bag of string-keyed properties.
#[derive(Debug, Default)]
pub struct NamedObject {
    values: RefCell<FxHashMap<Rc<str>, Value>>,
}

impl NamedObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(self, key: &str, value: impl Into<Value>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&self, key: &str, value: impl Into<Value>) {
        self.values.borrow_mut().insert(key.into(), value.into());
    }

    pub fn own_keys(&self) -> Vec<Rc<str>> {
        let mut keys: Vec<_> = self.values.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Object for NamedObject {
    fn get_property(&self, _: &mut Vm, key: &str) -> Result<Value, Value> {
        Ok(self.values.borrow().get(key).cloned().unwrap_or_default())
    }

    fn display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.values.borrow();
        if values.is_empty() {
            return f.write_str("{}");
        }

        f.write_str("{ ")?;
        for (i, key) in self.own_keys().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {}", values[key])?;
        }
        f.write_str(" }")
    }
}
