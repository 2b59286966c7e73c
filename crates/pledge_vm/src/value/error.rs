use std::fmt;
use std::rc::Rc;

use crate::Vm;

use super::Value;
use super::object::Object;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TypeError,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::TypeError => "TypeError",
        }
    }
}

/// A thrown error object, the value pledges usually reject with when the core itself fails.
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: Rc<str>,
}

impl Error {
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into().into(),
        }
    }

    pub fn type_error<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }
}

impl Object for Error {
    fn get_property(&self, _: &mut Vm, key: &str) -> Result<Value, Value> {
        Ok(match key {
            "name" => Value::string(self.kind.name()),
            "message" => Value::String(self.message.clone()),
            _ => Value::Undefined,
        })
    }

    fn display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(self.kind.name())
        } else {
            write!(f, "{}: {}", self.kind.name(), self.message)
        }
    }
}
