//! Input transport health

pub mod guard;

pub use guard::{GuardVerdict, TransportGuard};
