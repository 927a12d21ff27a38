//! An opaque handle for physical units.
//!
//! Conversion and formatting belong to a units system outside this crate. The
//! array core only attaches a [`Units`] to an array through the `UNITS`
//! property, compares units for equality, and asks whether they locate points in
//! time (which decides whether a bundled column defaults to being tagged by the
//! first column).

use std::fmt::{self, Display};

use smol_str::SmolStr;

/// What sort of quantity a [`Units`] measures, as far as the core cares.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum UnitsKind {
    /// A location in time, such as microseconds since 2000-01-01.
    TimeLocation,
    /// A ratio with no physical dimension.
    Dimensionless,
    /// Anything else.
    Physical,
}

/// Names that are recognised as time locations by [`Units::new()`].
const TIME_LOCATION_NAMES: &[&str] = &[
    "us2000", "t2000", "t1970", "ms1970", "us1980", "mj1958", "cdfEpoch", "cdfTT2000",
];

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct Units {
    name: SmolStr,
    kind: UnitsKind,
}

impl Units {
    /// Look up units by name, classifying well-known time bases.
    ///
    /// ```
    /// use qube::{Units, UnitsKind};
    /// assert_eq!(Units::new("us2000").kind(), UnitsKind::TimeLocation);
    /// assert_eq!(Units::new("nT").kind(), UnitsKind::Physical);
    /// assert_eq!(Units::new("").kind(), UnitsKind::Dimensionless);
    /// ```
    pub fn new(name: impl Into<SmolStr>) -> Self {
        let name = name.into();
        let kind = if name.is_empty() {
            UnitsKind::Dimensionless
        } else if TIME_LOCATION_NAMES.contains(&name.as_str()) {
            UnitsKind::TimeLocation
        } else {
            UnitsKind::Physical
        };
        Self {name, kind}
    }

    /// Declare units that locate points in time under a custom name.
    pub fn time_location(name: impl Into<SmolStr>) -> Self {
        Self {name: name.into(), kind: UnitsKind::TimeLocation}
    }

    pub fn dimensionless() -> Self { Self::new("") }

    pub fn name(&self) -> &str { &self.name }

    pub fn kind(&self) -> UnitsKind { self.kind }

    pub fn is_time_location(&self) -> bool { self.kind == UnitsKind::TimeLocation }
}

impl Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.write_str(&self.name) }
}
