use crate::js_std;
use crate::value::function::Function;
use crate::value::object::Handle;

/// Builtin function objects shared by every pledge of a [`Vm`](crate::Vm).
pub struct Statics {
    pub pledge_ctor: Handle,
    pub pledge_then: Handle,
    pub pledge_catch: Handle,
    pub pledge_finally: Handle,
    pub pledge_resolve: Handle,
    pub pledge_reject: Handle,
}

impl Statics {
    pub fn new() -> Self {
        Self {
            pledge_ctor: Handle::new(Function::native("Pledge", js_std::pledge::constructor)),
            pledge_then: Handle::new(Function::native("then", js_std::pledge::then)),
            pledge_catch: Handle::new(Function::native("catch", js_std::pledge::catch)),
            pledge_finally: Handle::new(Function::native("finally", js_std::pledge::finally)),
            pledge_resolve: Handle::new(Function::native("resolve", js_std::pledge::resolve)),
            pledge_reject: Handle::new(Function::native("reject", js_std::pledge::reject)),
        }
    }
}

impl Default for Statics {
    fn default() -> Self {
        Self::new()
    }
}
