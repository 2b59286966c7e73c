/// Returns early with a freshly created error object, e.g. `throw!(TypeError, "{} is not a function", v)`.
#[macro_export]
macro_rules! throw {
    ($err:ident, $msg:expr) => {
        return Err($crate::value::Value::object($crate::value::error::Error::new(
            $crate::value::error::ErrorKind::$err,
            $msg,
        )))
    };
    ($err:ident, $msg:expr, $($arg:expr),*) => {
        return Err($crate::value::Value::object($crate::value::error::Error::new(
            $crate::value::error::ErrorKind::$err,
            format!($msg, $($arg),*),
        )))
    };
}
