//! State layout and strided iteration
//!
//! Every species stores its variables — cohort positions, densities or
//! counts, and extra per-cohort state — concatenated inside one flat
//! numeric buffer shared by the whole solver. This module describes *where*
//! each logical variable lives:
//!
//! - [`StateLayout`]: ordered list of variable descriptors
//!   (name, offset, stride, count) plus name resolution
//! - [`VarSlot`]: a resolved descriptor — hot loops address elements
//!   through slots, never through names
//! - [`StridedIter`] / [`Columns`]: read-only traversal by variable or by
//!   cohort column
//!
//! # Two arrangements
//!
//! *Packed* variables occupy a contiguous block with stride 1:
//!
//! ```text
//! x x x x … u u u u …
//! ```
//!
//! *Interleaved* variables (the extras) share a block column by column,
//! each with stride equal to the number of extras:
//!
//! ```text
//! a b c  a b c  a b c …      (cohort 0) (cohort 1) (cohort 2)
//! ```

mod iterators;
mod layout;

pub use iterators::{Column, Columns, StridedIter};
pub use layout::{StateLayout, VarSlot, VariableDef};
