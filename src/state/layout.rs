//! Layout descriptors for the flat state buffer

use crate::state::iterators::{Columns, StridedIter};

// =================================================================================================
// Variable descriptors
// =================================================================================================

/// One logical variable inside a species' state block
#[derive(Debug, Clone)]
pub struct VariableDef {
    /// Logical name ("x", "u", "X", "N", or a user extra name)
    pub name: String,

    /// Index of the first element, relative to the species block
    pub offset: usize,

    /// Distance between consecutive elements (1 for packed variables,
    /// the extras count for interleaved ones)
    pub stride: usize,

    /// Number of elements
    pub count: usize,
}

/// A resolved variable descriptor
///
/// Name lookup happens once at setup; derivative kernels and cohort
/// bookkeeping address elements through the resolved slot:
///
/// ```rust
/// use pspm_rs::state::StateLayout;
///
/// let mut layout = StateLayout::new();
/// layout.push_packed("x", 4);
/// layout.push_packed("u", 4);
///
/// let u = layout.slot("u").unwrap();
/// assert_eq!(layout.position(u, 0), 4);
/// assert_eq!(layout.position(u, 3), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarSlot {
    pub offset: usize,
    pub stride: usize,
    pub count: usize,
}

// =================================================================================================
// StateLayout
// =================================================================================================

/// Maps logically named variables onto offsets and strides of one species'
/// slice of the flat state buffer
///
/// Variables are appended in order; the layout length grows accordingly.
/// The layout itself holds no data — it is consulted with a data slice
/// whenever values are traversed.
#[derive(Debug, Clone, Default)]
pub struct StateLayout {
    vars: Vec<VariableDef>,
    len: usize,
}

impl StateLayout {
    /// Create an empty layout
    pub fn new() -> Self {
        Self {
            vars: Vec::new(),
            len: 0,
        }
    }

    /// Append a packed variable: `count` contiguous elements, stride 1
    pub fn push_packed(&mut self, name: impl Into<String>, count: usize) {
        self.vars.push(VariableDef {
            name: name.into(),
            offset: self.len,
            stride: 1,
            count,
        });
        self.len += count;
    }

    /// Append a family of interleaved variables
    ///
    /// All `names` share one block of `names.len() * count` elements,
    /// arranged column by column: element `i` of variable `j` lives at
    /// `base + i * names.len() + j`.
    pub fn push_interleaved(&mut self, names: &[String], count: usize) {
        let width = names.len();
        for (j, name) in names.iter().enumerate() {
            self.vars.push(VariableDef {
                name: name.clone(),
                offset: self.len + j,
                stride: width,
                count,
            });
        }
        self.len += width * count;
    }

    // ========================================= Queries ==========================================

    /// Total number of elements described by the layout
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the layout describes no elements
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All variable descriptors, in declaration order
    pub fn vars(&self) -> &[VariableDef] {
        &self.vars
    }

    /// Resolve a variable by name
    pub fn slot(&self, name: &str) -> Option<VarSlot> {
        self.vars.iter().find(|v| v.name == name).map(|v| VarSlot {
            offset: v.offset,
            stride: v.stride,
            count: v.count,
        })
    }

    /// Buffer index of element `i` of a resolved variable
    #[inline]
    pub fn position(&self, slot: VarSlot, i: usize) -> usize {
        debug_assert!(i < slot.count, "element {} out of {}", i, slot.count);
        slot.offset + i * slot.stride
    }

    // ======================================== Traversal =========================================

    /// Strided read iterator over one variable's values in `data`
    ///
    /// `data` is the species-local slice of the state buffer.
    pub fn iter<'a>(&self, data: &'a [f64], name: &str) -> Option<StridedIter<'a>> {
        self.slot(name)
            .map(|slot| StridedIter::new(data, slot.offset, slot.stride, slot.count))
    }

    /// Iterate cohort columns: at each column, the values of every variable
    ///
    /// The column count is the minimum element count over all variables, so
    /// layouts mixing counts (e.g. J+1 breakpoints with J densities) yield
    /// only complete columns.
    pub fn columns<'a>(&'a self, data: &'a [f64]) -> Columns<'a> {
        let cols = self.vars.iter().map(|v| v.count).min().unwrap_or(0);
        Columns::new(self, data, cols)
    }
}

// =================================================================================================
// Tests
// =================================================================================================
