//! The vocabulary of property names and how each name is classified.
//!
//! The classification drives [`propagate`]: structural properties are renamed
//! when an axis disappears, dimension properties survive almost everything,
//! correlative properties are reshaped in lockstep with the data, and plane
//! properties are extra columns correlated with axis 0.
//!
//! [`propagate`]: super::propagate

use smol_str::SmolStr;

/// The highest rank supported by [`Array`](super::Array).
pub const MAX_RANK: usize = 4;

// Structural.
pub const DEPEND_0: &str = "DEPEND_0";
pub const DEPEND_1: &str = "DEPEND_1";
pub const DEPEND_2: &str = "DEPEND_2";
pub const DEPEND_3: &str = "DEPEND_3";
pub const BUNDLE_0: &str = "BUNDLE_0";
pub const BUNDLE_1: &str = "BUNDLE_1";
pub const BUNDLE_2: &str = "BUNDLE_2";
pub const BUNDLE_3: &str = "BUNDLE_3";
pub const BINS_0: &str = "BINS_0";
pub const BINS_1: &str = "BINS_1";
pub const BINS_2: &str = "BINS_2";
pub const BINS_3: &str = "BINS_3";
pub const JOIN_0: &str = "JOIN_0";

// Dimension.
pub const UNITS: &str = "UNITS";
pub const NAME: &str = "NAME";
pub const LABEL: &str = "LABEL";
pub const TITLE: &str = "TITLE";
pub const DESCRIPTION: &str = "DESCRIPTION";
pub const FORMAT: &str = "FORMAT";
pub const VALID_MIN: &str = "VALID_MIN";
pub const VALID_MAX: &str = "VALID_MAX";
pub const TYPICAL_MIN: &str = "TYPICAL_MIN";
pub const TYPICAL_MAX: &str = "TYPICAL_MAX";
pub const FILL_VALUE: &str = "FILL_VALUE";
pub const SCALE_TYPE: &str = "SCALE_TYPE";
pub const CADENCE: &str = "CADENCE";
pub const MONOTONIC: &str = "MONOTONIC";
pub const USER_PROPERTIES: &str = "USER_PROPERTIES";
pub const METADATA: &str = "METADATA";
pub const QUBE: &str = "QUBE";

// Bundle descriptor rows.
pub const ELEMENT_DIMENSIONS: &str = "ELEMENT_DIMENSIONS";
pub const START_INDEX: &str = "START_INDEX";
pub const ELEMENT_NAME: &str = "ELEMENT_NAME";
pub const ELEMENT_LABEL: &str = "ELEMENT_LABEL";

// Correlative.
pub const DELTA_PLUS: &str = "DELTA_PLUS";
pub const DELTA_MINUS: &str = "DELTA_MINUS";
pub const BIN_PLUS: &str = "BIN_PLUS";
pub const BIN_MINUS: &str = "BIN_MINUS";
pub const BIN_MIN: &str = "BIN_MIN";
pub const BIN_MAX: &str = "BIN_MAX";
pub const WEIGHTS: &str = "WEIGHTS";

/// Value of a `BINS_<k>` marker: the axis holds a lower and an upper bound.
pub const BINS_MIN_MAX: &str = "min,max";
/// Value of a `BINS_<k>` marker whose upper bound is inclusive.
pub const BINS_MIN_MAX_INCLUSIVE: &str = "min,maxInclusive";

const DIMENSION: &[&str] = &[
    UNITS, NAME, LABEL, TITLE, DESCRIPTION, FORMAT, VALID_MIN, VALID_MAX, TYPICAL_MIN,
    TYPICAL_MAX, FILL_VALUE, SCALE_TYPE, CADENCE, MONOTONIC, USER_PROPERTIES, METADATA, QUBE,
    ELEMENT_DIMENSIONS, START_INDEX, ELEMENT_NAME, ELEMENT_LABEL,
];

const CORRELATIVE: &[&str] = &[DELTA_PLUS, DELTA_MINUS, BIN_PLUS, BIN_MINUS, BIN_MIN, BIN_MAX, WEIGHTS];

/// The names of the dimension properties, which describe the physical quantity
/// held by an array as a whole.
pub fn dimension_properties() -> &'static [&'static str] { DIMENSION }

/// The names of the correlative properties, which hold one value per element.
pub fn correlative_properties() -> &'static [&'static str] { CORRELATIVE }

// ----------------------------------------------------------------------------

/// The role of a structural property.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum Structure {
    /// `DEPEND_<k>`: the tags of axis `k`.
    Depend,
    /// `BUNDLE_<k>`: the descriptor of columns packed along axis `k`.
    Bundle,
    /// `BINS_<k>`: axis `k` holds bin boundaries.
    Bins,
    /// `JOIN_0`: axis 0 was made by joining arrays.
    Join,
}

impl Structure {
    /// The property name for this role on `axis`.
    pub fn name(self, axis: usize) -> SmolStr {
        match self {
            Structure::Depend => depend(axis),
            Structure::Bundle => bundle(axis),
            Structure::Bins => bins(axis),
            Structure::Join => SmolStr::from(format!("JOIN_{}", axis)),
        }
    }
}

/// How a property name behaves under reshaping.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum PropertyKind {
    Structural { role: Structure, axis: usize },
    Dimension,
    Correlative,
    /// `PLANE_<n>`.
    Plane(usize),
    /// `CONTEXT_<n>`.
    Context(usize),
    /// Not part of the vocabulary. Such properties do not survive reshaping.
    Other,
}

fn numbered(name: &str, prefix: &str) -> Option<usize> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) { return None; }
    digits.parse().ok()
}

/// Classify a property name.
///
/// ```
/// use qube::names::{classify, PropertyKind, Structure};
/// assert_eq!(classify("DEPEND_1"), PropertyKind::Structural {role: Structure::Depend, axis: 1});
/// assert_eq!(classify("UNITS"), PropertyKind::Dimension);
/// assert_eq!(classify("DELTA_PLUS"), PropertyKind::Correlative);
/// assert_eq!(classify("PLANE_2"), PropertyKind::Plane(2));
/// assert_eq!(classify("CONTEXT_0"), PropertyKind::Context(0));
/// assert_eq!(classify("colour"), PropertyKind::Other);
/// ```
pub fn classify(name: &str) -> PropertyKind {
    if DIMENSION.contains(&name) { return PropertyKind::Dimension; }
    if CORRELATIVE.contains(&name) { return PropertyKind::Correlative; }
    for (prefix, role) in [
        ("DEPEND_", Structure::Depend),
        ("BUNDLE_", Structure::Bundle),
        ("BINS_", Structure::Bins),
        ("JOIN_", Structure::Join),
    ] {
        if let Some(axis) = numbered(name, prefix) {
            if axis < MAX_RANK { return PropertyKind::Structural {role, axis}; }
        }
    }
    if let Some(n) = numbered(name, "PLANE_") { return PropertyKind::Plane(n); }
    if let Some(n) = numbered(name, "CONTEXT_") { return PropertyKind::Context(n); }
    PropertyKind::Other
}

pub fn depend(axis: usize) -> SmolStr { SmolStr::from(format!("DEPEND_{}", axis)) }

pub fn bundle(axis: usize) -> SmolStr { SmolStr::from(format!("BUNDLE_{}", axis)) }

pub fn bins(axis: usize) -> SmolStr { SmolStr::from(format!("BINS_{}", axis)) }

pub fn plane(n: usize) -> SmolStr { SmolStr::from(format!("PLANE_{}", n)) }

pub fn context(n: usize) -> SmolStr { SmolStr::from(format!("CONTEXT_{}", n)) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_names() {
        assert_eq!(classify("DEPEND_3"), PropertyKind::Structural {role: Structure::Depend, axis: 3});
        assert_eq!(classify("DEPEND_4"), PropertyKind::Other);
        assert_eq!(classify("DEPEND_"), PropertyKind::Other);
        assert_eq!(classify("DEPEND_x"), PropertyKind::Other);
        assert_eq!(classify("BINS_1"), PropertyKind::Structural {role: Structure::Bins, axis: 1});
        assert_eq!(classify("JOIN_0"), PropertyKind::Structural {role: Structure::Join, axis: 0});
        assert_eq!(classify("CONTEXT_12"), PropertyKind::Context(12));
    }

    #[test]
    fn names_round_trip() {
        for axis in 0..MAX_RANK {
            for role in [Structure::Depend, Structure::Bundle, Structure::Bins] {
                assert_eq!(classify(&role.name(axis)), PropertyKind::Structural {role, axis});
            }
        }
        assert_eq!(classify(&plane(0)), PropertyKind::Plane(0));
        assert_eq!(classify(&context(5)), PropertyKind::Context(5));
    }
}
