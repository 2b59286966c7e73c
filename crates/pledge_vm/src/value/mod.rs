pub mod error;
pub mod function;
pub mod object;

use std::fmt;
use std::rc::Rc;

use crate::Vm;
use crate::pledge::Pledge;
use crate::throw;

use self::object::{Handle, Object};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// The undefined type
    #[default]
    Undefined,
    /// The null type
    Null,
    /// The boolean type
    Boolean(bool),
    /// The number type
    Number(f64),
    /// The string type
    String(Rc<str>),
    /// The object type
    Object(Handle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Typeof {
    Undefined,
    Object,
    Boolean,
    Number,
    String,
    Function,
}

impl Value {
    pub fn number(n: f64) -> Self {
        Self::Number(n)
    }

    pub fn string(s: &str) -> Self {
        Self::String(s.into())
    }

    pub fn object<O: Object + 'static>(object: O) -> Self {
        Self::Object(Handle::new(object))
    }

    pub fn type_of(&self) -> Typeof {
        match self {
            Self::Undefined => Typeof::Undefined,
            Self::Null => Typeof::Object,
            Self::Boolean(_) => Typeof::Boolean,
            Self::Number(_) => Typeof::Number,
            Self::String(_) => Typeof::String,
            Self::Object(o) => o.as_object().type_of(),
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.type_of(), Typeof::Function)
    }

    /// The handle of a callable value, or `None` for anything that cannot be called.
    pub fn into_callable(self) -> Option<Handle> {
        match self {
            Self::Object(o) if matches!(o.as_object().type_of(), Typeof::Function) => Some(o),
            _ => None,
        }
    }

    pub fn as_pledge(&self) -> Option<Pledge> {
        match self {
            Self::Object(o) => Pledge::from_handle(o),
            _ => None,
        }
    }

    pub fn get_property(&self, vm: &mut Vm, key: &str) -> Result<Value, Value> {
        match self {
            Self::Object(o) => o.as_object().get_property(vm, key),
            Self::Undefined | Self::Null => {
                throw!(TypeError, "Cannot read property {} of {}", key, self)
            }
            _ => Ok(Value::Undefined),
        }
    }

    pub fn apply(&self, vm: &mut Vm, this: Value, args: Vec<Value>) -> Result<Value, Value> {
        match self {
            Self::Object(o) => o.as_object().apply(vm, this, args),
            _ => throw!(TypeError, "{} is not a function", self),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => fmt_number(*n, f),
            Self::String(s) => f.write_str(s),
            Self::Object(o) => fmt::Display::fmt(o, f),
        }
    }
}

fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n == 0.0 {
        // -0 prints as 0
        f.write_str("0")
    } else {
        write!(f, "{n}")
    }
}

pub trait ValueContext {
    fn unwrap_or_undefined(self) -> Value;
}

impl ValueContext for Option<&Value> {
    fn unwrap_or_undefined(self) -> Value {
        self.cloned().unwrap_or_default()
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s.into())
    }
}

impl From<Handle> for Value {
    fn from(handle: Handle) -> Self {
        Self::Object(handle)
    }
}

impl From<Pledge> for Value {
    fn from(pledge: Pledge) -> Self {
        Self::Object(pledge.into_handle())
    }
}
