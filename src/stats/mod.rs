//! Karlin-Altschul statistics: parameter tables, bit scores, e-values and
//! the length-adjustment iteration.

pub mod karlin;
pub mod length_adjustment;
pub mod tables;

pub use karlin::*;
pub use length_adjustment::*;
pub use tables::*;
