//! Logging macros
//!
//! Forwards to `defmt` with the `defmt` feature. Without it every macro
//! only borrows its arguments, so host tests need no logger.

#![allow(unused_imports, unused_macros)]

#[cfg(feature = "defmt")]
pub(crate) use defmt::{debug, error, info, warn};

#[cfg(not(feature = "defmt"))]
macro_rules! debug_noop {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        $( let _ = &$arg; )*
    }};
}

#[cfg(not(feature = "defmt"))]
macro_rules! info_noop {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        $( let _ = &$arg; )*
    }};
}

#[cfg(not(feature = "defmt"))]
macro_rules! warn_noop {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        $( let _ = &$arg; )*
    }};
}

#[cfg(not(feature = "defmt"))]
macro_rules! error_noop {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        $( let _ = &$arg; )*
    }};
}

#[cfg(not(feature = "defmt"))]
pub(crate) use debug_noop as debug;
#[cfg(not(feature = "defmt"))]
pub(crate) use error_noop as error;
#[cfg(not(feature = "defmt"))]
pub(crate) use info_noop as info;
#[cfg(not(feature = "defmt"))]
pub(crate) use warn_noop as warn;
