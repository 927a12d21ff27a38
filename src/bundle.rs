//! Packing arrays that share axis 0 side by side, and taking them apart again.
//!
//! A bundle is a rank-2 array whose axis 1 holds the flattened trailing axes
//! of each source, one after another. Its `BUNDLE_1` property is a descriptor
//! array with one row per source. The row overrides of the descriptor carry
//! each source's dimension properties, its tags for axes 1 and up, its
//! correlatives, the `START_INDEX` of its first column and, for sources of
//! rank 2 or more, its `ELEMENT_DIMENSIONS`. Properties set on the descriptor
//! itself apply to every row that does not override them.
//!
//! Bundling rank-0 sources gives a rank-1 bundle described by `BUNDLE_0`.
//!
//! ```
//! use qube::{bundle, unbundle, unbundle_by_name, Array, Units};
//! let bx = Array::from_vec(vec![1.0, 2.0]).with_property("NAME", "Bx").with_property("UNITS", Units::new("nT"));
//! let n = Array::from_vec(vec![5.0, 6.0]).with_property("NAME", "density").with_property("UNITS", Units::new("cm^-3"));
//! let b = bundle(&[bx.clone(), n.clone()]).unwrap();
//! assert_eq!(b.rank(), 2);
//! assert_eq!(b.value(&[1, 1]).unwrap(), 6.0);
//! assert_eq!(unbundle(&b, 0).unwrap(), bx);
//! let density = unbundle_by_name(&b, "density").unwrap();
//! assert_eq!(density, n);
//! assert_eq!(density.units().unwrap().name(), "cm^-3");
//! ```

use smallvec::SmallVec;
use smol_str::SmolStr;
use tracing::debug;

use super::names::{self, classify, PropertyKind, Structure};
use super::view::{BundleView, ColumnView, ReformView};
use super::{Array, ArrayBuilder, Error, Kind, Properties, PropertyValue, Result, Units};

type Shape = SmallVec<[usize; 3]>;

/// Builds the descriptor of a bundle, one row per packed quantity.
///
/// This is for producers that already hold data laid out as a bundle.
///
/// ```
/// use qube::{unbundle, ArrayBuilder, BundleDescriptorBuilder, Units};
/// let descriptor = BundleDescriptorBuilder::new()
///     .add("time", Units::new("us2000"))
///     .add_with_dims("B", Units::new("nT"), &[3])
///     .property("LABEL", "B_GSE")
///     .build()
///     .unwrap();
/// assert_eq!(descriptor.rank(), 2);
/// let data = ArrayBuilder::from_values(&[2, 4], vec![0.0, 1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 13.0]).unwrap()
///     .with_property("BUNDLE_1", descriptor)
///     .build();
/// let b = unbundle(&data, 1).unwrap();
/// assert_eq!(b.rank(), 2);
/// assert_eq!(b.value(&[1, 2]).unwrap(), 13.0);
/// assert_eq!(b.properties().str("LABEL"), Some("B_GSE"));
/// // The time column tags the others.
/// assert_eq!(b.properties().depend(0).unwrap().flat_values().unwrap(), [0.0, 10.0]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct BundleDescriptorBuilder {
    rows: Vec<(Properties, Shape)>,
}

impl BundleDescriptorBuilder {
    pub fn new() -> Self { Self::default() }

    /// Describe a quantity occupying one column.
    pub fn add(self, name: &str, units: Units) -> Self { self.add_with_dims(name, units, &[]) }

    /// Describe a quantity whose elements have shape `dims`, flattened
    /// row-major into consecutive columns.
    pub fn add_with_dims(mut self, name: &str, units: Units, dims: &[usize]) -> Self {
        let properties = Properties::new().with(names::NAME, name).with(names::UNITS, units);
        self.rows.push((properties, dims.into()));
        self
    }

    /// Set a property of the most recently added quantity.
    pub fn property(mut self, name: impl Into<SmolStr>, value: impl Into<PropertyValue>) -> Self {
        if let Some((properties, _)) = self.rows.last_mut() { properties.insert(name, value); }
        self
    }

    fn push(&mut self, properties: Properties, dims: &[usize]) { self.rows.push((properties, dims.into())); }

    /// The descriptor. It is rank 1 holding the start columns if no quantity
    /// has `dims`, otherwise rank 2 holding each quantity's `dims` padded
    /// with ones.
    pub fn build(self) -> Result<Array> {
        let n = self.rows.len();
        let sub_rank = self.rows.iter().map(|(_, d)| d.len()).max().unwrap_or(0);
        let mut values = Vec::with_capacity(n * sub_rank.max(1));
        let mut rows = Vec::with_capacity(n);
        let mut start = 0;
        for (mut properties, dims) in self.rows {
            if sub_rank == 0 {
                values.push(start as f64);
            } else {
                values.extend(dims.iter().map(|&d| d as f64));
                values.extend(std::iter::repeat(1.0).take(sub_rank - dims.len()));
            }
            properties.insert(names::START_INDEX, start);
            if !dims.is_empty() { properties.insert(names::ELEMENT_DIMENSIONS, &dims[..]); }
            start += dims.iter().product::<usize>();
            rows.push(properties);
        }
        let shape = [n, sub_rank];
        let shape = if sub_rank == 0 { &shape[..1] } else { &shape[..] };
        let mut builder = ArrayBuilder::from_values(shape, values)?;
        for (j, row) in rows.into_iter().enumerate() { *builder.properties_mut().row_mut(j) = row; }
        Ok(builder.build())
    }
}

// ----------------------------------------------------------------------------

/// Pack `sources` side by side.
///
/// The sources must all be rank 0, or all be qubes of rank 1 or more with the
/// same length. The bundle's `DEPEND_0` is that of the first source.
pub fn bundle(sources: &[Array]) -> Result<Array> {
    let first = sources.first()
        .ok_or_else(|| Error::UnsupportedScheme("nothing to bundle".into()))?;
    let scalar = first.rank() == 0;
    if sources.iter().any(|s| (s.rank() == 0) != scalar) {
        return Err(Error::UnsupportedScheme("cannot bundle rank-0 arrays with higher-rank arrays".into()));
    }
    let length = if scalar { 0 } else { first.length()? };
    let mut describe = BundleDescriptorBuilder::new();
    for (j, s) in sources.iter().enumerate() {
        if !s.is_qube() { return Err(Error::NotAQube); }
        if !scalar && s.length()? != length {
            return Err(Error::UnsupportedScheme(format!(
                "bundled arrays must have the same length: source {} has length {}, expected {}",
                j, s.length()?, length,
            )));
        }
        let dims: Shape = if s.rank() >= 2 { s.shape()?[1..].into() } else { Shape::new() };
        describe.push(source_row(s, first), &dims);
    }
    let view = BundleView::new(sources)?;
    let axis = if scalar { 0 } else { 1 };
    let mut properties = Properties::new().with(names::bundle(axis), describe.build()?);
    if let Some(tags) = first.properties().depend(0) {
        if !scalar { properties.insert(names::DEPEND_0, tags); }
    }
    debug!(count = sources.len(), width = view.width(), "bundled arrays");
    Ok(Array::from_view(Kind::Bundle(view), properties))
}

/// The descriptor row for `source`.
fn source_row(source: &Array, first: &Array) -> Properties {
    let mut row = Properties::new();
    for (name, value) in source.properties().iter() {
        match classify(name) {
            PropertyKind::Dimension => if name != names::QUBE { row.insert(name.clone(), value.clone()); },
            PropertyKind::Structural {role: Structure::Join, ..} => {}
            PropertyKind::Structural {axis: 0, ..} => {
                if first.property(name) != Some(value) { row.insert(name.clone(), value.clone()); }
            }
            PropertyKind::Structural {..} | PropertyKind::Correlative | PropertyKind::Context(_) => {
                row.insert(name.clone(), value.clone());
            }
            PropertyKind::Plane(_) | PropertyKind::Other => {}
        }
    }
    row
}

// ----------------------------------------------------------------------------

/// A column of a bundle, by position or by name.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ColumnRef<'a> {
    Index(usize),
    /// A `ch_<n>` index, a `NAME`, or a `LABEL`.
    Name(&'a str),
}

/// The descriptor of the last axis of `bundle`.
fn descriptor(bundle: &Array) -> Result<&Array> {
    let axis = bundle.rank().checked_sub(1).ok_or(Error::InvalidRank {expected: 1, actual: 0})?;
    bundle.properties().bundle(axis)
        .ok_or_else(|| Error::UnsupportedScheme(format!("array has no {}", names::bundle(axis))))
}

fn strip(s: &str) -> String { s.chars().filter(|&c| c != ' ' && c != '_').collect() }

/// Find the row of `descriptor` that `column` refers to.
fn resolve(descriptor: &Array, column: ColumnRef) -> Result<usize> {
    let n = descriptor.length()?;
    let name = match column {
        ColumnRef::Index(j) if j < n => return Ok(j),
        ColumnRef::Index(j) => return Err(Error::MalformedBundleReference(format!("column {} of {}", j, n))),
        ColumnRef::Name(name) => name,
    };
    if let Some(j) = name.strip_prefix("ch_").and_then(|d| d.parse::<usize>().ok()) {
        if j < n { return Ok(j); }
    }
    let find = |key: &str, matches: &dyn Fn(&str) -> bool| {
        (0..n).find(|&j| descriptor.property_at(key, j).and_then(PropertyValue::as_str).map_or(false, matches))
    };
    if let Some(j) = find(names::NAME, &|s: &str| s == name) { return Ok(j); }
    if let Some(j) = find(names::LABEL, &|s: &str| s == name) { return Ok(j); }
    let stripped = strip(name);
    if let Some(j) = find(names::NAME, &|s: &str| strip(s) == stripped)
        .or_else(|| find(names::LABEL, &|s: &str| strip(s) == stripped)) {
        debug!(name, column = j, "matched bundled column ignoring spaces and underscores");
        return Ok(j);
    }
    Err(Error::MalformedBundleReference(name.into()))
}

/// Column `column` of `bundle`, reshaped to the bundled array it came from.
pub fn unbundle(bundle: &Array, column: usize) -> Result<Array> { unbundle_with(bundle, ColumnRef::Index(column), true) }

/// The column of `bundle` called `name`, reshaped to the bundled array it
/// came from.
pub fn unbundle_by_name(bundle: &Array, name: &str) -> Result<Array> {
    unbundle_with(bundle, ColumnRef::Name(name), true)
}

/// Every column of `bundle`.
pub fn unbundle_all(bundle: &Array) -> Result<Vec<Array>> {
    (0..descriptor(bundle)?.length()?).map(|j| unbundle(bundle, j)).collect()
}

/// The column of `bundle` that `column` refers to.
///
/// If `high_rank` is false, or the column has no `ELEMENT_DIMENSIONS`, the
/// result is the single column at the column's `START_INDEX`. Otherwise it is
/// the run of columns holding the bundled array, reshaped to its own rank
/// less any axes sliced off the bundle.
pub fn unbundle_with(bundle: &Array, column: ColumnRef, high_rank: bool) -> Result<Array> {
    let descriptor = descriptor(bundle)?;
    let j = resolve(descriptor, column)?;
    let row = descriptor.slice(j)?;
    let row = row.properties();
    let start = match row.get(names::START_INDEX).and_then(PropertyValue::as_int) {
        Some(s) => usize::try_from(s).map_err(|_| Error::UnsupportedScheme(format!("bad START_INDEX {}", s)))?,
        None => j,
    };
    let dims = row.get(names::ELEMENT_DIMENSIONS).and_then(PropertyValue::as_shape).filter(|d| !d.is_empty());
    let kind = match dims {
        Some(dims) if high_rank => Some(Kind::Reform(ReformView::new(bundle, start, dims)?)),
        _ if bundle.rank() == 1 => None,
        _ => Some(Kind::Column(ColumnView::new(bundle, start)?)),
    };
    let rank = kind.as_ref().map_or(0, Kind::rank);
    let mut properties = Properties::new();
    for (name, value) in row.iter() {
        let keep = match classify(name) {
            PropertyKind::Dimension => {
                ![names::START_INDEX, names::ELEMENT_DIMENSIONS, names::QUBE].contains(&name.as_str())
            }
            PropertyKind::Structural {axis, ..} => axis < rank,
            PropertyKind::Correlative => value.as_array().map_or(true, |a| a.rank() == rank),
            PropertyKind::Context(_) => true,
            PropertyKind::Plane(_) | PropertyKind::Other => false,
        };
        if keep { properties.insert(name.clone(), value.clone()); }
    }
    for (name, value) in bundle.properties().iter() {
        if let PropertyKind::Context(_) = classify(name) {
            if !properties.contains(name) { properties.insert(name.clone(), value.clone()); }
        }
    }
    // Once axis 0 of the bundle has been sliced away, its tags are gone.
    if rank > 0 && bundle.rank() > 1 && !properties.contains(names::DEPEND_0) {
        if let Some(tags) = bundle.properties().depend(0) {
            properties.insert(names::DEPEND_0, tags);
        } else if j > 0 && descriptor.property_at(names::UNITS, 0).and_then(PropertyValue::as_units).map_or(false, Units::is_time_location) {
            properties.insert(names::DEPEND_0, unbundle_with(bundle, ColumnRef::Index(0), false)?);
        }
    }
    Ok(match kind {
        Some(kind) => Array::from_view(kind, properties),
        None => bundle.slice(start)?.with_properties(properties),
    })
}
