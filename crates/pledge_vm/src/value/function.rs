use std::fmt;
use std::rc::Rc;

use crate::Vm;

use super::object::Object;
use super::{Typeof, Value};

pub type NativeFunction = fn(cx: CallContext) -> Result<Value, Value>;
pub type ClosureFunction = dyn Fn(CallContext) -> Result<Value, Value>;

pub struct CallContext<'a> {
    pub args: Vec<Value>,
    pub vm: &'a mut Vm,
    pub this: Value,
}

impl<'a> CallContext<'a> {
    pub fn call(args: Vec<Value>, vm: &'a mut Vm, this: Value) -> Self {
        Self { args, vm, this }
    }
}

pub enum FunctionKind {
    Native(NativeFunction),
    Closure(Box<ClosureFunction>),
}

impl fmt::Debug for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(_) => f.write_str("Native"),
            Self::Closure(_) => f.write_str("Closure"),
        }
    }
}

#[derive(Debug)]
pub struct Function {
    name: Rc<str>,
    kind: FunctionKind,
}

impl Function {
    pub fn new(name: &str, kind: FunctionKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn native(name: &str, fun: NativeFunction) -> Self {
        Self::new(name, FunctionKind::Native(fun))
    }

    pub fn closure<F>(name: &str, fun: F) -> Self
    where
        F: Fn(CallContext) -> Result<Value, Value> + 'static,
    {
        Self::new(name, FunctionKind::Closure(Box::new(fun)))
    }
}

impl Object for Function {
    fn get_property(&self, _: &mut Vm, key: &str) -> Result<Value, Value> {
        Ok(match key {
            "name" => Value::String(self.name.clone()),
            _ => Value::Undefined,
        })
    }

    fn apply(&self, vm: &mut Vm, this: Value, args: Vec<Value>) -> Result<Value, Value> {
        let cx = CallContext::call(args, vm, this);
        match &self.kind {
            FunctionKind::Native(fun) => fun(cx),
            FunctionKind::Closure(fun) => fun(cx),
        }
    }

    fn type_of(&self) -> Typeof {
        Typeof::Function
    }

    fn display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            f.write_str("[Function (anonymous)]")
        } else {
            write!(f, "[Function: {}]", self.name)
        }
    }
}
