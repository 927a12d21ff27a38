//! Rank 0 to 4 arrays of scientific measurements that carry their metadata
//! with them.
//!
//! An [`Array`] is a read-only handle on `f64` values together with a
//! [`Properties`] bag: units, labels, the tags of each axis (`DEPEND_<k>`),
//! uncertainties and so on. Arrays are built once with an [`ArrayBuilder`]
//! and never change afterwards. Reshaping operations such as
//! [`Array::slice()`], [`Array::trim()`], [`Array::transpose()`] and
//! [`Array::join()`] don't copy anything, but return views that compute
//! values on demand from their sources. Each view also derives its own
//! properties from those of its sources, as described in [`propagate`]. Call
//! [`Array::materialize()`] at the end of a chain of views to get a dense
//! copy.
//!
//! Arrays may be ragged: the rows of a joined array need not have the same
//! length. Use [`Array::length_at()`] to measure an axis below a fixed
//! prefix of indices, or [`Array::shape()`] when the array is known to be a
//! qube (rectangular).
//!
//! ```
//! use qube::{Array, Units};
//! let times = Array::from_vec(vec![0.0, 4.0, 8.0]).with_property("UNITS", Units::new("t2000"));
//! let energies = Array::from_vec(vec![10.0, 20.0, 40.0, 80.0]).with_property("UNITS", Units::new("eV"));
//! let flux = Array::from_shape_vec(&[3, 4], (0..12).map(f64::from).collect()).unwrap()
//!     .with_property("UNITS", Units::new("nT"))
//!     .with_property("DEPEND_0", times)
//!     .with_property("DEPEND_1", &energies);
//! let spectrum = flux.slice(1).unwrap();
//! assert_eq!(spectrum.rank(), 1);
//! assert_eq!(spectrum.value(&[2]).unwrap(), 6.0);
//! assert_eq!(spectrum.units().unwrap().name(), "nT");
//! assert_eq!(spectrum.properties().depend(0).unwrap(), &energies);
//! ```
//!
//! [`Cursor`] walks arbitrary subsets of an array's indices, and
//! [`bundle()`] packs several arrays that share axis 0 into one.

mod error;
pub use error::{Error, Result};

mod config;
pub use config::{RangeCheck};

mod units;
pub use units::{Units, UnitsKind};

pub mod names;

mod property;
pub use property::{Properties, PropertyValue};

mod dense;
pub use dense::{ArrayBuilder, DataType, IntegerValues, Values};

mod array;
pub use array::{Array, Capability, CapabilityKind};
pub(crate) use array::{Kind};

mod view;

pub mod propagate;

pub mod iter;
pub use iter::{apply_index, subset, Cursor, DimensionSpec, Index};

mod bundle;
pub use bundle::{
    bundle, unbundle, unbundle_all, unbundle_by_name, unbundle_with, BundleDescriptorBuilder,
    ColumnRef,
};

mod validate;
pub use validate::{validate};
