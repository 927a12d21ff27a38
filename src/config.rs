//! Per-array settings chosen when an array is built.
//!
//! There is no global configuration. Settings travel with the
//! [`ArrayBuilder`] that creates an array and are fixed once the array is
//! built.
//!
//! [`ArrayBuilder`]: super::ArrayBuilder

/// Whether [`Array::value()`] checks each index against its axis length.
///
/// Arity is always checked. Disabling range checks is an explicit opt-out for
/// hot loops over data that is already known to be in range; an out-of-range
/// index on an unchecked array reads some other element of the array or fails
/// with [`Error::IndexOutOfBounds`] if it falls outside the backing store. The
/// default is the same in debug and release builds.
///
/// [`Array::value()`]: super::Array::value()
/// [`Error::IndexOutOfBounds`]: super::Error::IndexOutOfBounds
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq)]
pub enum RangeCheck {
    #[default]
    Enabled,
    Disabled,
}

impl RangeCheck {
    pub fn is_enabled(self) -> bool { self == RangeCheck::Enabled }
}
