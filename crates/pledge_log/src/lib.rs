//! Logging facade for the pledge crates.
//!
//! The library crates log only through these macros. Each one compiles down to a
//! constant-false branch unless the workspace was built with `PLEDGE_LOG` set.

#[doc(hidden)]
pub use tracing as __tracing;

/// Whether logging was switched on at build time (`PLEDGE_LOG=1 cargo build`).
pub const ENABLED: bool = matches!(option_env!("PLEDGE_LOG"), Some(..));

pub use tracing::Level;

#[macro_export]
macro_rules! trace {
    ($($tok:tt)*) => {
        if $crate::ENABLED {
            $crate::__tracing::trace!($($tok)*)
        }
    };
}

#[macro_export]
macro_rules! debug {
    ($($tok:tt)*) => {
        if $crate::ENABLED {
            $crate::__tracing::debug!($($tok)*)
        }
    };
}

#[macro_export]
macro_rules! warn {
    ($($tok:tt)*) => {
        if $crate::ENABLED {
            $crate::__tracing::warn!($($tok)*)
        }
    };
}

#[macro_export]
macro_rules! error {
    ($($tok:tt)*) => {
        if $crate::ENABLED {
            $crate::__tracing::error!($($tok)*)
        }
    };
}

#[macro_export]
macro_rules! span {
    ($($tok:tt)*) => {
        if $crate::ENABLED {
            $crate::Span::Enabled($crate::__tracing::span!($($tok)*))
        } else {
            $crate::Span::Disabled
        }
    };
}

/// A span that only exists when logging is enabled.
pub enum Span {
    Enabled(tracing::Span),
    Disabled,
}

impl Span {
    pub fn enter(&self) -> Entered<'_> {
        match self {
            Self::Enabled(s) => Entered::Enabled(s.enter()),
            Self::Disabled => Entered::Disabled,
        }
    }
}

pub enum Entered<'a> {
    Enabled(tracing::span::Entered<'a>),
    Disabled,
}
