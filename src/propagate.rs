//! How properties follow the data through slicing, trimming, transposing and
//! joining.
//!
//! Each function here takes the property bag(s) of the source(s) of a view and
//! returns the property bag of the view. They are called once, when the view
//! is made. What happens to each property depends on its
//! [`PropertyKind`](names::PropertyKind):
//!
//! | kind | slice | trim | transpose | join |
//! |------|-------|------|-----------|------|
//! | `DEPEND_0` | becomes `CONTEXT_n` | trimmed | becomes `DEPEND_1` | becomes `DEPEND_1` |
//! | `DEPEND_k`, `BUNDLE_k`, `BINS_k` | becomes `_k-1` | kept | `0` and `1` swap | becomes `_k+1` |
//! | dimension | kept | kept, except `TYPICAL_MIN/MAX` | kept | kept if common |
//! | correlative, plane | sliced | trimmed | transposed / dropped | joined |
//! | other | dropped | dropped | dropped | dropped |

use std::collections::BTreeMap;

use tracing::debug;

use super::names::{self, classify, PropertyKind, Structure, MAX_RANK};
use super::{Array, Kind, Properties, PropertyValue, Result};

/// Whether `tags` holds a lower and an upper bound per bin, rather than one
/// row of tags per index of the tagged axis.
pub(crate) fn is_bins(tags: &Array) -> bool { tags.rank() == 2 && tags.properties().bins(1).is_some() }

/// Whether `tags` is a `DEPEND_k` (`k > 0`) whose tags vary along axis 0.
pub(crate) fn is_per_row(tags: &Array) -> bool { tags.rank() >= 2 && !is_bins(tags) }

/// One more than the highest `CONTEXT_n` in `properties`.
fn next_context(properties: &Properties) -> usize {
    properties.names().filter_map(|name| match classify(name) {
        PropertyKind::Context(n) => Some(n + 1),
        _ => None,
    }).max().unwrap_or(0)
}

/// `QUBE=false` describes the source, not any part of it.
fn is_stale_qube(name: &str, value: &PropertyValue) -> bool {
    name == names::QUBE && value.as_bool() == Some(false)
}

fn slice_value(value: &PropertyValue, index: usize) -> Result<PropertyValue> {
    Ok(match value {
        PropertyValue::Array(a) if a.rank() > 0 => a.slice(index)?.into(),
        _ => value.clone(),
    })
}

fn trim_value(value: &PropertyValue, start: usize, end: usize) -> Result<PropertyValue> {
    Ok(match value {
        PropertyValue::Array(a) if a.rank() > 0 => a.trim(start, end)?.into(),
        _ => value.clone(),
    })
}

/// `descriptor` with each of its row overrides passed through `f`.
///
/// The rows of a `BUNDLE_k` descriptor (`k > 0`) hold properties of the
/// bundled arrays, whose axis 0 is axis 0 of the bundle. When the bundle is
/// reshaped along axis 0 they must follow.
pub(crate) fn reshape_rows(
    descriptor: &Array,
    f: impl Fn(&Properties) -> Result<Properties>,
) -> Result<Array> {
    let mut properties = descriptor.properties().clone();
    let rows = descriptor.properties().rows()
        .map(|(&r, p)| -> Result<(usize, Properties)> { Ok((r, f(p)?)) })
        .collect::<Result<BTreeMap<_, _>>>()?;
    properties.set_rows(rows);
    Ok(descriptor.with_properties(properties))
}

/// `row` with its `START_INDEX` moved back by `by` columns.
fn shift_start(row: &Properties, by: usize) -> Properties {
    let mut ret = row.clone();
    if let Some(s) = row.get(names::START_INDEX).and_then(PropertyValue::as_int) {
        ret.insert(names::START_INDEX, s - by as i64);
    }
    ret
}

// ----------------------------------------------------------------------------

/// The properties of `source.slice(index)`.
///
/// ```
/// use qube::{Array, ArrayBuilder, Units};
/// let times = Array::from_vec(vec![0.0, 4.0, 8.0]).with_property("UNITS", Units::new("t2000"));
/// let m = ArrayBuilder::from_values(&[3, 2], vec![0.0; 6]).unwrap()
///     .with_property("DEPEND_0", &times)
///     .with_property("DEPEND_1", Array::from_vec(vec![1.0, 2.0]))
///     .build();
/// let row = m.slice(1).unwrap();
/// assert!(row.properties().depend(1).is_none());
/// assert_eq!(row.properties().depend(0).unwrap().length().unwrap(), 2);
/// let context = row.properties().array("CONTEXT_0").unwrap();
/// assert_eq!(context.rank(), 0);
/// assert_eq!(context.value(&[]).unwrap(), 4.0);
/// assert_eq!(context.units().unwrap().name(), "t2000");
/// ```
pub fn slice_properties(properties: &Properties, index: usize) -> Result<Properties> {
    let mut ret = Properties::new();
    let mut context = None;
    for (name, value) in properties.iter() {
        match classify(name) {
            PropertyKind::Structural {role: Structure::Depend, axis: 0} => {
                if let Some(tags) = value.as_array() {
                    if tags.rank() == 1 { context = Some(tags.slice(index)?); }
                }
            }
            PropertyKind::Structural {axis: 0, ..} => {}
            PropertyKind::Structural {role, axis} => {
                let value = match value {
                    PropertyValue::Array(tags) if role == Structure::Depend && is_per_row(tags) => {
                        tags.slice(index)?.into()
                    }
                    PropertyValue::Array(descriptor) if role == Structure::Bundle => {
                        reshape_rows(descriptor, |row| slice_properties(row, index))?.into()
                    }
                    _ => value.clone(),
                };
                ret.insert(role.name(axis - 1), value);
            }
            PropertyKind::Dimension => {
                if !is_stale_qube(name, value) { ret.insert(name.clone(), value.clone()); }
            }
            PropertyKind::Correlative | PropertyKind::Plane(_) => {
                ret.insert(name.clone(), slice_value(value, index)?);
            }
            PropertyKind::Context(_) => { ret.insert(name.clone(), value.clone()); }
            PropertyKind::Other => {}
        }
    }
    if let Some(context) = context { ret.insert(names::context(next_context(properties)), context); }
    if let Some(row) = properties.row(index) {
        ret.extend(row);
        ret.set_rows(row.rows().map(|(&r, p)| (r, p.clone())).collect());
    }
    Ok(ret)
}

/// The properties of `source.trim(start, end)`.
pub fn trim_properties(properties: &Properties, start: usize, end: usize) -> Result<Properties> {
    let mut ret = Properties::new();
    for (name, value) in properties.iter() {
        let value = match classify(name) {
            PropertyKind::Structural {role: Structure::Depend, axis: 0} => trim_value(value, start, end)?,
            PropertyKind::Structural {role: Structure::Bundle, axis: 0} => match value {
                PropertyValue::Array(descriptor) if descriptor.rank() > 0 => {
                    let trimmed = descriptor.trim(start, end)?;
                    reshape_rows(&trimmed, |row| Ok(shift_start(row, start)))?.into()
                }
                _ => value.clone(),
            },
            PropertyKind::Structural {role: Structure::Depend, ..} => match value {
                PropertyValue::Array(tags) if is_per_row(tags) => tags.trim(start, end)?.into(),
                _ => value.clone(),
            },
            PropertyKind::Structural {role: Structure::Bundle, ..} => match value {
                PropertyValue::Array(descriptor) => {
                    reshape_rows(descriptor, |row| trim_properties(row, start, end))?.into()
                }
                _ => value.clone(),
            },
            PropertyKind::Structural {..} | PropertyKind::Context(_) => value.clone(),
            PropertyKind::Dimension => {
                if name == names::TYPICAL_MIN || name == names::TYPICAL_MAX { continue; }
                if is_stale_qube(name, value) { continue; }
                value.clone()
            }
            PropertyKind::Correlative | PropertyKind::Plane(_) => trim_value(value, start, end)?,
            PropertyKind::Other => continue,
        };
        ret.insert(name.clone(), value);
    }
    ret.set_rows(
        properties.rows()
            .filter(|&(&r, _)| start <= r && r < end)
            .map(|(&r, p)| (r - start, p.clone()))
            .collect(),
    );
    Ok(ret)
}

/// The properties of `source.transpose()`.
pub fn transpose_properties(properties: &Properties) -> Result<Properties> {
    let mut ret = Properties::new();
    for (name, value) in properties.iter() {
        match classify(name) {
            PropertyKind::Structural {role: Structure::Join, ..} => {}
            PropertyKind::Structural {role, axis} if axis < 2 => {
                if let (Structure::Depend, PropertyValue::Array(tags)) = (role, value) {
                    if tags.rank() != 1 && !is_bins(tags) { continue; }
                }
                ret.insert(role.name(1 - axis), value.clone());
            }
            PropertyKind::Structural {..} | PropertyKind::Plane(_) | PropertyKind::Other => {}
            PropertyKind::Dimension | PropertyKind::Context(_) => { ret.insert(name.clone(), value.clone()); }
            PropertyKind::Correlative => match value {
                PropertyValue::Array(a) if a.rank() == 2 => { ret.insert(name.clone(), a.transpose()?); }
                PropertyValue::Array(a) if a.rank() != 0 => {}
                _ => { ret.insert(name.clone(), value.clone()); }
            },
        }
    }
    Ok(ret)
}

/// The properties of `Array::join(elements)`.
///
/// Properties that every element holds with equal values become properties of
/// the join, with structural properties moving up one axis. The rest become
/// overrides of the rows of axis 0, so that slicing the join gives back each
/// element's own properties.
pub fn join_properties(elements: &[Array]) -> Result<Properties> {
    let mut ret = Properties::new();
    ret.insert(names::JOIN_0, true);
    let mut rows: BTreeMap<usize, Properties> = BTreeMap::new();
    let mut seen = Vec::new();
    for e in elements {
        for name in e.properties().names() {
            if !seen.iter().any(|s: &&str| *s == name) { seen.push(name); }
        }
    }
    for name in seen {
        let values: Option<Vec<&PropertyValue>> = elements.iter().map(|e| e.property(name)).collect();
        let common = values.as_ref().filter(|vs| vs.iter().all(|v| *v == vs[0])).map(|vs| vs[0]);
        match (classify(name), common) {
            (PropertyKind::Other, _) | (PropertyKind::Structural {role: Structure::Join, ..}, _) => continue,
            (PropertyKind::Structural {role, axis}, Some(v)) => {
                if axis + 1 < MAX_RANK { ret.insert(role.name(axis + 1), v.clone()); }
                continue;
            }
            (PropertyKind::Structural {role: Structure::Depend, axis: 0}, None) => {
                if let Some(tags) = join_arrays(values.as_deref(), |t| t.rank() == 1)? {
                    ret.insert(names::DEPEND_1, tags);
                    continue;
                }
            }
            (PropertyKind::Dimension, Some(v)) => {
                if !is_stale_qube(name, v) { ret.insert(name, v.clone()); }
                continue;
            }
            (PropertyKind::Dimension, None) => {
                if name == names::UNITS {
                    debug!(count = elements.len(), "joining arrays with different units");
                    ret.insert(names::QUBE, false);
                }
            }
            (PropertyKind::Correlative | PropertyKind::Plane(_), _) => {
                if let Some(joined) = join_arrays(values.as_deref(), |_| true)? {
                    ret.insert(name, joined);
                    continue;
                }
            }
            (PropertyKind::Context(_), Some(v)) => {
                ret.insert(name, v.clone());
                continue;
            }
            _ => {}
        }
        for (i, e) in elements.iter().enumerate() {
            if let Some(v) = e.property(name) { rows.entry(i).or_default().insert(name, v.clone()); }
        }
    }
    for (i, e) in elements.iter().enumerate() {
        let nested: BTreeMap<usize, Properties> = e.properties().rows().map(|(&r, p)| (r, p.clone())).collect();
        if !nested.is_empty() { rows.entry(i).or_default().set_rows(nested); }
    }
    ret.set_rows(rows);
    Ok(ret)
}

/// Join `values` if all of them are arrays of equal rank accepted by `accept`.
fn join_arrays(values: Option<&[&PropertyValue]>, accept: impl Fn(&Array) -> bool) -> Result<Option<Array>> {
    let Some(values) = values else { return Ok(None) };
    let arrays: Option<Vec<Array>> = values.iter().map(|v| v.as_array().cloned()).collect();
    let Some(arrays) = arrays else { return Ok(None) };
    let rank = arrays[0].rank();
    if rank + 1 > MAX_RANK || !arrays.iter().all(|a| a.rank() == rank && accept(a)) { return Ok(None); }
    Array::join(&arrays).map(Some)
}

// ----------------------------------------------------------------------------

/// Whether `array` is a qube. Called once per array by [`Array::is_qube()`].
///
/// An explicit `QUBE` property wins. Otherwise arrays of rank below 2, dense
/// arrays and views of qubes are qubes, and anything else is checked by
/// comparing the shapes and property names of its slices.
pub(crate) fn is_qube(array: &Array) -> bool {
    let rank = array.rank();
    if rank < 2 { return true; }
    if let Some(q) = array.property(names::QUBE).and_then(PropertyValue::as_bool) { return q; }
    match array.kind() {
        Kind::Dense(_) | Kind::Transpose(_) | Kind::Bundle(_) => return true,
        Kind::Slice(v) if v.source().is_qube() => return true,
        Kind::Trim(v) if v.source().is_qube() => return true,
        Kind::Column(v) if v.source().is_qube() => return true,
        Kind::Reform(v) if v.source().is_qube() => return true,
        Kind::Annotated(a) => return a.is_qube(),
        _ => {}
    }
    if rank == 2 && array.properties().depend(1).map_or(false, |tags| tags.rank() == 1) { return true; }
    let Ok(length) = array.length() else { return false };
    debug!(rank, length, "checking qube by walking slices");
    let mut first: Option<(_, Vec<&str>)> = None;
    let mut slices = Vec::with_capacity(length);
    for i in 0..length {
        let Ok(slice) = array.slice(i) else { return false };
        slices.push(slice);
    }
    for slice in &slices {
        let Ok(shape) = slice.shape() else { return false };
        let names: Vec<&str> = slice.properties().names()
            .filter(|name| !matches!(classify(name), PropertyKind::Plane(_)))
            .collect();
        if let Some((s, n)) = &first {
            if *s != shape || *n != names { return false; }
            continue;
        }
        first = Some((shape, names));
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArrayBuilder, Units};

    fn tags(values: &[f64], units: &str) -> Array {
        Array::from_vec(values.to_vec()).with_property(names::UNITS, Units::new(units))
    }

    fn spectrogram() -> Array {
        ArrayBuilder::from_values(&[4, 3], (0..12).map(f64::from).collect()).unwrap()
            .with_property(names::UNITS, Units::new("counts"))
            .with_property(names::TYPICAL_MIN, 0.0)
            .with_property(names::TYPICAL_MAX, 11.0)
            .with_property(names::DEPEND_0, tags(&[0.0, 1.0, 2.0, 3.0], "t2000"))
            .with_property(names::DEPEND_1, tags(&[10.0, 20.0, 30.0], "eV"))
            .with_property(names::DELTA_PLUS, Array::from_shape_vec(&[4, 3], vec![0.5; 12]).unwrap())
            .with_property("colour", "red")
            .build()
    }

    #[test]
    fn slice_renames_and_adds_context() {
        let s = spectrogram().slice(2).unwrap();
        let p = s.properties();
        assert_eq!(p.depend(0).unwrap().units().unwrap().name(), "eV");
        assert!(p.depend(1).is_none());
        assert_eq!(p.array("CONTEXT_0").unwrap().value(&[]).unwrap(), 2.0);
        assert_eq!(p.array(names::DELTA_PLUS).unwrap().rank(), 1);
        assert_eq!(p.get(names::TYPICAL_MAX), Some(&PropertyValue::Double(11.0)));
        assert!(!p.contains("colour"));
        let ss = s.slice(1).unwrap();
        let p = ss.properties();
        assert_eq!(p.array("CONTEXT_0").unwrap().value(&[]).unwrap(), 2.0);
        assert_eq!(p.array("CONTEXT_1").unwrap().value(&[]).unwrap(), 20.0);
        assert_eq!(p.array(names::DELTA_PLUS).unwrap().rank(), 0);
    }

    #[test]
    fn trim_clears_typical_range() {
        let t = spectrogram().trim(1, 3).unwrap();
        let p = t.properties();
        assert!(!p.contains(names::TYPICAL_MIN));
        assert!(!p.contains(names::TYPICAL_MAX));
        assert_eq!(p.depend(0).unwrap().flat_values().unwrap(), [1.0, 2.0]);
        assert_eq!(p.depend(1).unwrap().length().unwrap(), 3);
        assert_eq!(p.array(names::DELTA_PLUS).unwrap().length().unwrap(), 2);
    }

    #[test]
    fn trim_renumbers_rows() {
        let mut p = Properties::new();
        p.insert_at(1, names::LABEL, "one");
        p.insert_at(3, names::LABEL, "three");
        let t = trim_properties(&p, 1, 3).unwrap();
        assert_eq!(t.get_at(names::LABEL, 0).and_then(PropertyValue::as_str), Some("one"));
        assert!(t.row(2).is_none());
    }

    #[test]
    fn transpose_swaps_depends() {
        let t = spectrogram().transpose().unwrap();
        let p = t.properties();
        assert_eq!(p.depend(0).unwrap().units().unwrap().name(), "eV");
        assert_eq!(p.depend(1).unwrap().units().unwrap().name(), "t2000");
        assert_eq!(p.array(names::DELTA_PLUS).unwrap().length().unwrap(), 3);
    }

    #[test]
    fn join_common_and_differing_properties() {
        let x = tags(&[0.0, 1.0], "s");
        let a = Array::from_vec(vec![1.0, 2.0])
            .with_property(names::UNITS, Units::new("nT"))
            .with_property(names::LABEL, "a")
            .with_property(names::DEPEND_0, &x);
        let b = Array::from_vec(vec![3.0, 4.0])
            .with_property(names::UNITS, Units::new("nT"))
            .with_property(names::LABEL, "b")
            .with_property(names::DEPEND_0, &x);
        let j = Array::join(&[a, b]).unwrap();
        let p = j.properties();
        assert_eq!(p.get(names::JOIN_0), Some(&PropertyValue::Bool(true)));
        assert_eq!(p.units().unwrap().name(), "nT");
        assert!(p.depend(1).unwrap().ptr_eq(&x));
        assert!(!p.contains(names::LABEL));
        assert_eq!(p.get_at(names::LABEL, 1).and_then(PropertyValue::as_str), Some("b"));
        assert_eq!(j.slice(1).unwrap().properties().str(names::LABEL), Some("b"));
        assert!(j.slice(0).unwrap().properties().depend(0).unwrap().ptr_eq(&x));
    }

    #[test]
    fn join_with_different_units_is_not_a_qube() {
        let a = Array::from_shape_vec(&[2], vec![1.0, 2.0]).unwrap().with_property(names::UNITS, Units::new("nT"));
        let b = Array::from_shape_vec(&[2], vec![1.0, 2.0]).unwrap().with_property(names::UNITS, Units::new("eV"));
        let j = Array::join(&[a, b]).unwrap();
        assert_eq!(j.property(names::QUBE), Some(&PropertyValue::Bool(false)));
        assert!(!j.is_qube());
        assert_eq!(j.slice(1).unwrap().units().unwrap().name(), "eV");
        assert!(!j.slice(1).unwrap().properties().contains(names::QUBE));
    }

    #[test]
    fn join_of_different_tags_makes_per_row_depend() {
        let a = Array::from_vec(vec![1.0, 2.0]).with_property(names::DEPEND_0, Array::from_vec(vec![0.0, 1.0]));
        let b = Array::from_vec(vec![3.0, 4.0, 5.0]).with_property(names::DEPEND_0, Array::from_vec(vec![5.0, 6.0, 7.0]));
        let j = Array::join(&[a, b]).unwrap();
        let d1 = j.properties().depend(1).unwrap();
        assert_eq!(d1.rank(), 2);
        assert!(!j.is_qube());
        let tags = j.slice(1).unwrap();
        assert_eq!(tags.properties().depend(0).unwrap().flat_values().unwrap(), [5.0, 6.0, 7.0]);
    }

    #[test]
    fn per_row_tags_follow_axis_0() {
        let tags = Array::from_shape_vec(&[3, 2], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let a = ArrayBuilder::from_values(&[3, 2], vec![0.0; 6]).unwrap()
            .with_property(names::DEPEND_1, &tags)
            .build();
        let row = a.slice(1).unwrap();
        assert_eq!(row.properties().depend(0).unwrap().flat_values().unwrap(), [3.0, 4.0]);
        let t = a.trim(1, 3).unwrap();
        let d1 = t.properties().depend(1).unwrap();
        assert_eq!(d1.length().unwrap(), 2);
        assert_eq!(d1.flat_values().unwrap(), [3.0, 4.0, 5.0, 6.0]);
        assert!(crate::validate(&t).is_empty());
    }

    #[test]
    fn bin_edges_are_not_per_row() {
        let edges = ArrayBuilder::from_values(&[2, 2], vec![0.0, 1.0, 1.0, 2.0]).unwrap()
            .with_property(names::BINS_1, names::BINS_MIN_MAX)
            .build();
        let a = ArrayBuilder::from_values(&[3, 2], vec![0.0; 6]).unwrap()
            .with_property(names::DEPEND_1, &edges)
            .build();
        assert!(a.slice(1).unwrap().properties().depend(0).unwrap().ptr_eq(&edges));
        assert!(a.trim(0, 2).unwrap().properties().depend(1).unwrap().ptr_eq(&edges));
        assert!(a.transpose().unwrap().properties().depend(0).unwrap().ptr_eq(&edges));
    }

    #[test]
    fn qube_detection() {
        assert!(spectrogram().is_qube());
        let ragged = Array::join(&[Array::from_vec(vec![1.0]), Array::from_vec(vec![1.0, 2.0])]).unwrap();
        assert!(!ragged.is_qube());
        let square = Array::join(&[Array::from_vec(vec![1.0, 2.0]), Array::from_vec(vec![3.0, 4.0])]).unwrap();
        assert!(square.is_qube());
        let forced = spectrogram().with_property(names::QUBE, false);
        assert!(!forced.is_qube());
    }
}
