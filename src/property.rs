//! The property bag attached to every [`Array`].
//!
//! A [`Properties`] maps names to [`PropertyValue`]s. Besides the global
//! (unindexed) map, it holds an optional table of per-row overrides keyed by
//! the axis-0 index. [`Properties::get_at()`] consults the override for the row
//! first and falls back to the global value. Overrides are themselves
//! `Properties`, so an override may in turn carry overrides for the next axis;
//! slicing an array at row `i` promotes row `i`'s overrides to the global map
//! of the slice.

use std::collections::BTreeMap;
use std::collections::btree_map;

use smallvec::SmallVec;
use smol_str::SmolStr;

use super::{names, Array, Units};

/// The value of a single property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Int(i64),
    Double(f64),
    Bool(bool),
    Str(SmolStr),
    Units(Units),
    /// A list of axis lengths, e.g. `ELEMENT_DIMENSIONS`.
    Shape(SmallVec<[usize; 4]>),
    Map(BTreeMap<SmolStr, PropertyValue>),
    /// Properties such as `DEPEND_0` are themselves arrays.
    Array(Array),
}

impl PropertyValue {
    /// Numeric properties as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            PropertyValue::Int(i) => Some(i as f64),
            PropertyValue::Double(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match *self {
            PropertyValue::Int(i) => Some(i),
            PropertyValue::Double(x) if x.fract() == 0.0 => Some(x as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let PropertyValue::Bool(b) = *self { Some(b) } else { None }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let PropertyValue::Str(s) = self { Some(s) } else { None }
    }

    pub fn as_units(&self) -> Option<&Units> {
        if let PropertyValue::Units(u) = self { Some(u) } else { None }
    }

    pub fn as_shape(&self) -> Option<&[usize]> {
        if let PropertyValue::Shape(s) = self { Some(s) } else { None }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<SmolStr, PropertyValue>> {
        if let PropertyValue::Map(m) = self { Some(m) } else { None }
    }

    pub fn as_array(&self) -> Option<&Array> {
        if let PropertyValue::Array(a) = self { Some(a) } else { None }
    }
}

impl From<i64> for PropertyValue { fn from(x: i64) -> Self { PropertyValue::Int(x) } }
impl From<usize> for PropertyValue { fn from(x: usize) -> Self { PropertyValue::Int(x as i64) } }
impl From<f64> for PropertyValue { fn from(x: f64) -> Self { PropertyValue::Double(x) } }
impl From<bool> for PropertyValue { fn from(x: bool) -> Self { PropertyValue::Bool(x) } }
impl From<&str> for PropertyValue { fn from(x: &str) -> Self { PropertyValue::Str(x.into()) } }
impl From<String> for PropertyValue { fn from(x: String) -> Self { PropertyValue::Str(x.into()) } }
impl From<SmolStr> for PropertyValue { fn from(x: SmolStr) -> Self { PropertyValue::Str(x) } }
impl From<Units> for PropertyValue { fn from(x: Units) -> Self { PropertyValue::Units(x) } }
impl From<&[usize]> for PropertyValue { fn from(x: &[usize]) -> Self { PropertyValue::Shape(x.into()) } }
impl From<Array> for PropertyValue { fn from(x: Array) -> Self { PropertyValue::Array(x) } }
impl From<&Array> for PropertyValue { fn from(x: &Array) -> Self { PropertyValue::Array(x.clone()) } }

impl From<BTreeMap<SmolStr, PropertyValue>> for PropertyValue {
    fn from(x: BTreeMap<SmolStr, PropertyValue>) -> Self { PropertyValue::Map(x) }
}

// ----------------------------------------------------------------------------

/// A property bag: global properties plus per-row overrides.
///
/// ```
/// use qube::{Properties, Units};
/// let mut p = Properties::new()
///     .with("UNITS", Units::new("nT"))
///     .with("LABEL", "B");
/// p.insert_at(2, "LABEL", "Bz");
/// assert_eq!(p.get_at("LABEL", 0).and_then(|v| v.as_str()), Some("B"));
/// assert_eq!(p.get_at("LABEL", 2).and_then(|v| v.as_str()), Some("Bz"));
/// assert_eq!(p.units().map(|u| u.name()), Some("nT"));
/// ```
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Properties {
    global: BTreeMap<SmolStr, PropertyValue>,
    rows: BTreeMap<usize, Properties>,
}

impl Properties {
    pub fn new() -> Self { Self::default() }

    /// Builder-style [`insert()`](Self::insert).
    pub fn with(mut self, name: impl Into<SmolStr>, value: impl Into<PropertyValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a global property, returning the previous value.
    pub fn insert(
        &mut self,
        name: impl Into<SmolStr>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.global.insert(name.into(), value.into())
    }

    /// Set a property that applies only to row `row` of axis 0.
    pub fn insert_at(
        &mut self,
        row: usize,
        name: impl Into<SmolStr>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.row_mut(row).insert(name, value)
    }

    pub fn remove(&mut self, name: &str) -> Option<PropertyValue> { self.global.remove(name) }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> { self.global.get(name) }

    /// The value of `name` for row `row`: the row's override if there is one,
    /// otherwise the global value.
    pub fn get_at(&self, name: &str, row: usize) -> Option<&PropertyValue> {
        self.rows.get(&row).and_then(|r| r.get(name)).or_else(|| self.get(name))
    }

    pub fn contains(&self, name: &str) -> bool { self.global.contains_key(name) }

    /// The number of global properties.
    pub fn len(&self) -> usize { self.global.len() }

    pub fn is_empty(&self) -> bool { self.global.is_empty() && self.rows.is_empty() }

    /// The global properties, in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, SmolStr, PropertyValue> { self.global.iter() }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ { self.global.keys().map(|k| k.as_str()) }

    /// The overrides of row `row`, if any.
    pub fn row(&self, row: usize) -> Option<&Properties> { self.rows.get(&row) }

    pub fn row_mut(&mut self, row: usize) -> &mut Properties { self.rows.entry(row).or_default() }

    /// All rows that have overrides, in index order.
    pub fn rows(&self) -> btree_map::Iter<'_, usize, Properties> { self.rows.iter() }

    pub(crate) fn set_rows(&mut self, rows: BTreeMap<usize, Properties>) { self.rows = rows; }

    /// Copy every global entry of `other` over the entries of `self`.
    pub fn extend(&mut self, other: &Properties) {
        for (k, v) in other.iter() { self.global.insert(k.clone(), v.clone()); }
    }

    pub fn retain(&mut self, mut f: impl FnMut(&str, &PropertyValue) -> bool) {
        self.global.retain(|k, v| f(k, v));
    }

    // Typed accessors.

    pub fn array(&self, name: &str) -> Option<&Array> { self.get(name).and_then(|v| v.as_array()) }

    pub fn str(&self, name: &str) -> Option<&str> { self.get(name).and_then(|v| v.as_str()) }

    pub fn units(&self) -> Option<&Units> { self.get(names::UNITS).and_then(|v| v.as_units()) }

    /// The `DEPEND_<axis>` tag array.
    pub fn depend(&self, axis: usize) -> Option<&Array> { self.array(&names::depend(axis)) }

    /// The `BUNDLE_<axis>` descriptor.
    pub fn bundle(&self, axis: usize) -> Option<&Array> { self.array(&names::bundle(axis)) }

    /// The `BINS_<axis>` marker.
    pub fn bins(&self, axis: usize) -> Option<&str> { self.str(&names::bins(axis)) }

    /// The dimension properties of `self`, with no overrides.
    pub fn dimension_properties(&self) -> Properties {
        let mut ret = Properties::new();
        for &name in names::dimension_properties() {
            if let Some(v) = self.get(name) { ret.insert(name, v.clone()); }
        }
        ret
    }
}

impl<K: Into<SmolStr>, V: Into<PropertyValue>> FromIterator<(K, V)> for Properties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut ret = Properties::new();
        for (k, v) in iter { ret.insert(k, v); }
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_fall_back_to_global() {
        let mut p = Properties::new().with(names::NAME, "flux");
        p.insert_at(1, names::NAME, "flux_1");
        assert_eq!(p.get_at(names::NAME, 0).and_then(PropertyValue::as_str), Some("flux"));
        assert_eq!(p.get_at(names::NAME, 1).and_then(PropertyValue::as_str), Some("flux_1"));
        assert_eq!(p.get(names::NAME).and_then(PropertyValue::as_str), Some("flux"));
        assert_eq!(p.get_at(names::LABEL, 1), None);
    }

    #[test]
    fn typed_accessors() {
        let p = Properties::new()
            .with(names::BINS_1, names::BINS_MIN_MAX)
            .with(names::START_INDEX, 3usize)
            .with(names::ELEMENT_DIMENSIONS, &[2usize, 3][..]);
        assert_eq!(p.bins(1), Some("min,max"));
        assert_eq!(p.get(names::START_INDEX).and_then(PropertyValue::as_int), Some(3));
        assert_eq!(p.get(names::ELEMENT_DIMENSIONS).and_then(PropertyValue::as_shape), Some(&[2, 3][..]));
        assert!(p.depend(0).is_none());
    }

    #[test]
    fn dimension_properties_only() {
        let p = Properties::new()
            .with(names::UNITS, Units::new("nT"))
            .with(names::DELTA_PLUS, 1.0)
            .with("colour", "red");
        let d = p.dimension_properties();
        assert_eq!(d.len(), 1);
        assert!(d.contains(names::UNITS));
    }
}
