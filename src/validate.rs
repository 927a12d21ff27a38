//! Structural checks on an array's properties.

use super::names::{self, classify, PropertyKind, Structure, MAX_RANK};
use super::{Array, PropertyValue};

/// Describe everything wrong with the structural properties of `array`.
///
/// Checks that tag arrays, bundle descriptors, correlatives and planes fit the
/// axes they describe, that `BINS_<k>` markers are well formed and that
/// `UNITS` are [`Units`](super::Units). Tag arrays are checked in turn. An
/// empty result means no problems were found.
///
/// ```
/// use qube::{validate, Array};
/// let a = Array::from_vec(vec![1.0, 2.0, 3.0]);
/// assert!(validate(&a).is_empty());
/// let bad = a.with_property("DEPEND_0", Array::from_vec(vec![0.0, 1.0]));
/// assert_eq!(validate(&bad), ["DEPEND_0 has length 2 but axis 0 has length 3"]);
/// ```
pub fn validate(array: &Array) -> Vec<String> {
    let mut problems = Vec::new();
    check(array, "", &mut problems);
    problems
}

/// The length of axis `axis`, if it is the same for every row.
fn axis_length(array: &Array, axis: usize) -> Option<usize> {
    if axis == 0 { return array.length().ok(); }
    if !array.is_qube() { return None; }
    array.shape().ok().map(|shape| shape[axis])
}

fn check(array: &Array, prefix: &str, problems: &mut Vec<String>) {
    let rank = array.rank();
    let length = if rank > 0 { array.length().ok() } else { None };
    let mut report = |message: String| problems.push(format!("{}{}", prefix, message));
    let mut nested = Vec::new();
    for (name, value) in array.properties().iter() {
        match classify(name) {
            PropertyKind::Structural {role: Structure::Join, ..} => {}
            PropertyKind::Structural {axis, ..} if axis >= rank => {
                report(format!("{} refers to axis {} of a rank {} array", name, axis, rank));
            }
            PropertyKind::Structural {role: Structure::Depend, axis} => {
                let Some(tags) = value.as_array() else {
                    report(format!("{} is not an array", name));
                    continue;
                };
                check_depend(array, axis, tags, &mut report);
                nested.push((name.clone(), tags.clone()));
            }
            PropertyKind::Structural {role: Structure::Bundle, axis} => {
                let Some(descriptor) = value.as_array() else {
                    report(format!("{} is not an array", name));
                    continue;
                };
                check_bundle(array, axis, descriptor, &mut report);
            }
            PropertyKind::Structural {role: Structure::Bins, axis} => {
                match value.as_str() {
                    Some(names::BINS_MIN_MAX) | Some(names::BINS_MIN_MAX_INCLUSIVE) => {}
                    _ => report(format!("{} is not a bins marker: {:?}", name, value)),
                }
                if let Some(n) = axis_length(array, axis) {
                    if n != 2 { report(format!("{} marks axis {} of length {}, not 2", name, axis, n)); }
                }
            }
            PropertyKind::Correlative | PropertyKind::Plane(_) => {
                let Some(other) = value.as_array() else { continue };
                if other.rank() == 0 { continue; }
                if matches!(classify(name), PropertyKind::Correlative) && other.rank() != rank {
                    report(format!("{} has rank {} but the array has rank {}", name, other.rank(), rank));
                }
                let n = other.length().ok();
                if n != length {
                    report(format!("{} has length {} but axis 0 has length {}", name, show(n), show(length)));
                }
            }
            PropertyKind::Dimension if name == names::UNITS => {
                if !matches!(value, PropertyValue::Units(_)) {
                    report(format!("UNITS is not a units value: {:?}", value));
                }
            }
            _ => {}
        }
    }
    if let Some(n) = length {
        if let Some((&r, _)) = array.properties().rows().find(|&(&r, _)| r >= n) {
            report(format!("row override for index {} but axis 0 has length {}", r, n));
        }
    }
    if rank > MAX_RANK { report(format!("rank {} exceeds {}", rank, MAX_RANK)); }
    for (name, tags) in nested { check(&tags, &format!("{}{}.", prefix, name), problems); }
}

fn show(n: Option<usize>) -> String { n.map_or_else(|| "?".into(), |n| n.to_string()) }

fn check_depend(array: &Array, axis: usize, tags: &Array, report: &mut impl FnMut(String)) {
    let name = names::depend(axis);
    let bins = tags.properties().bins(1).is_some();
    match (tags.rank(), axis) {
        (1, _) => {
            if let (Some(n), Ok(t)) = (axis_length(array, axis), tags.length()) {
                if n != t { report(format!("{} has length {} but axis {} has length {}", name, t, axis, n)); }
            }
        }
        (2, _) if bins => {
            if let (Some(n), Ok(t)) = (axis_length(array, axis), tags.length()) {
                if n != t { report(format!("{} has {} bins but axis {} has length {}", name, t, axis, n)); }
            }
            if tags.length_at(&[0]).map_or(false, |w| w != 2) {
                report(format!("{} holds bins but axis 1 of it is not of length 2", name));
            }
        }
        (_, 0) => report(format!("{} has rank {}; tags of axis 0 must be rank 1", name, tags.rank())),
        (r, _) if r > axis + 1 => {
            report(format!("{} has rank {} but describes axis {}", name, r, axis));
        }
        _ => {
            // Tags that vary along axis 0.
            let (Ok(n), Ok(t)) = (array.length(), tags.length()) else { return };
            if n != t {
                report(format!("{} has length {} but axis 0 has length {}", name, t, n));
                return;
            }
            if tags.rank() == 2 && axis == 1 {
                for i in 0..n {
                    if let (Ok(a), Ok(b)) = (array.length_at(&[i]), tags.length_at(&[i])) {
                        if a != b {
                            report(format!("{} row {} has length {} but the array row has length {}", name, i, b, a));
                            return;
                        }
                    }
                }
            }
        }
    }
}

fn check_bundle(array: &Array, axis: usize, descriptor: &Array, report: &mut impl FnMut(String)) {
    let name = names::bundle(axis);
    if descriptor.rank() != 1 && descriptor.rank() != 2 {
        report(format!("{} has rank {}; descriptors must be rank 1 or 2", name, descriptor.rank()));
        return;
    }
    let Ok(rows) = descriptor.length() else { return };
    let width: usize = (0..rows).map(|j| {
        descriptor.property_at(names::ELEMENT_DIMENSIONS, j)
            .and_then(PropertyValue::as_shape)
            .map_or(1, |dims| dims.iter().product())
    }).sum();
    if let Some(n) = axis_length(array, axis) {
        if n != width { report(format!("{} describes {} columns but axis {} has length {}", name, width, axis, n)); }
    }
}
