use std::cell::OnceCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use smol_str::SmolStr;
use tracing::trace;

use super::dense::{element_count, Dense, Shape};
use super::view::{
    self, BundleView, ColumnView, JoinView, ReformView, SliceView, TransposeView, TrimView, View,
};
use super::{
    propagate, ArrayBuilder, Cursor, Error, IntegerValues, Properties, PropertyValue, Result,
    Units, Values,
};

/// A rank 0 to 4 array of `f64` measurements with a property bag.
///
/// An `Array` is a cheap handle: cloning it clones a reference-counted
/// pointer. Arrays are immutable once built. Reshaping operations such as
/// [`slice()`] and [`trim()`] return views that share the backing store of
/// their source and compute values on demand, but whose properties are worked
/// out once, when the view is made.
///
/// For rank `r > 0`, the length of axis `k` may depend on the indices already
/// chosen on axes `0..k`; see [`length_at()`]. Arrays for which it never does
/// are called qubes, see [`is_qube()`].
///
/// ```
/// use qube::{Array, ArrayBuilder, Units};
/// let m = ArrayBuilder::from_values(&[3, 4], (0..12).map(f64::from).collect()).unwrap()
///     .with_property("UNITS", Units::new("nT"))
///     .with_property("DEPEND_1", Array::from_vec(vec![10.0, 20.0, 30.0, 40.0]))
///     .build();
/// let row = m.slice(1).unwrap();
/// assert_eq!(row.rank(), 1);
/// assert_eq!(row.length().unwrap(), 4);
/// assert_eq!(row.value(&[2]).unwrap(), 6.0);
/// assert_eq!(row.properties().depend(0).unwrap().value(&[3]).unwrap(), 40.0);
/// assert_eq!(row.units().unwrap().name(), "nT");
/// ```
///
/// [`slice()`]: Self::slice()
/// [`trim()`]: Self::trim()
/// [`length_at()`]: Self::length_at()
/// [`is_qube()`]: Self::is_qube()
#[derive(Clone)]
pub struct Array(Rc<Node>);

pub(crate) struct Node {
    kind: Kind,
    properties: Properties,
    qube: OnceCell<bool>,
}

/// The closed set of array representations.
pub(crate) enum Kind {
    Dense(Dense),
    Slice(SliceView),
    Trim(TrimView),
    Transpose(TransposeView),
    Join(JoinView),
    Bundle(BundleView),
    Column(ColumnView),
    Reform(ReformView),
    /// The source with a different property bag.
    Annotated(Array),
}

/// Run `$body` with `$v` bound to the representation inside `$kind`.
macro_rules! each_kind {
    ($kind:expr, $v:ident => $body:expr) => {
        match $kind {
            Kind::Dense($v) => $body,
            Kind::Slice($v) => $body,
            Kind::Trim($v) => $body,
            Kind::Transpose($v) => $body,
            Kind::Join($v) => $body,
            Kind::Bundle($v) => $body,
            Kind::Column($v) => $body,
            Kind::Reform($v) => $body,
            Kind::Annotated($v) => $body,
        }
    };
}

impl Kind {
    fn name(&self) -> &'static str {
        match self {
            Kind::Dense(_) => "dense",
            Kind::Slice(_) => "slice",
            Kind::Trim(_) => "trim",
            Kind::Transpose(_) => "transpose",
            Kind::Join(_) => "join",
            Kind::Bundle(_) => "bundle",
            Kind::Column(_) => "column",
            Kind::Reform(_) => "reform",
            Kind::Annotated(_) => "annotated",
        }
    }

    pub(crate) fn rank(&self) -> usize { each_kind!(self, v => v.rank()) }

    fn value(&self, index: &[usize]) -> Result<f64> { each_kind!(self, v => v.value(index)) }

    fn length_at(&self, outer: &[usize]) -> Result<usize> { each_kind!(self, v => v.length_at(outer)) }
}

// ----------------------------------------------------------------------------

/// Narrower interfaces that some arrays offer, see [`Array::capability()`].
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum CapabilityKind {
    /// Integer access to an integral backing store.
    IntegerValues,
    /// The elements as one contiguous row-major `&[f64]`.
    FlatValues,
}

/// The answer to a successful [`Array::capability()`] query.
#[derive(Debug, Clone)]
pub enum Capability<'a> {
    IntegerValues(IntegerValues<'a>),
    FlatValues(&'a [f64]),
}

// ----------------------------------------------------------------------------

impl Array {
    fn new(kind: Kind, properties: Properties) -> Self {
        Array(Rc::new(Node {kind, properties, qube: OnceCell::new()}))
    }

    pub(crate) fn from_dense(dense: Dense, properties: Properties) -> Self {
        Self::new(Kind::Dense(dense), properties)
    }

    pub(crate) fn from_view(kind: Kind, properties: Properties) -> Self {
        trace!(kind = kind.name(), rank = kind.rank(), "created view");
        Self::new(kind, properties)
    }

    pub(crate) fn kind(&self) -> &Kind { &self.0.kind }

    /// A rank-0 array holding `value`.
    pub fn scalar(value: f64) -> Self { Self::from_dense(Dense::scalar(value), Properties::new()) }

    /// A rank-1 array holding `values`.
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self::from_dense(Dense::vector(values.into()), Properties::new())
    }

    /// An array of shape `shape` holding `values` in row-major order.
    pub fn from_shape_vec(shape: &[usize], values: Vec<f64>) -> Result<Self> {
        Ok(ArrayBuilder::from_values(shape, values)?.build())
    }

    /// The number of indices needed to address one value.
    pub fn rank(&self) -> usize { self.0.kind.rank() }

    /// The value at `index`, which must have exactly [`rank()`](Self::rank)
    /// elements, each within the length of its axis.
    pub fn value(&self, index: &[usize]) -> Result<f64> {
        let rank = self.rank();
        if index.len() != rank { return Err(Error::InvalidRank {expected: rank, actual: index.len()}); }
        self.0.kind.value(index)
    }

    /// The length of axis 0.
    pub fn length(&self) -> Result<usize> { self.length_at(&[]) }

    /// The length of axis `outer.len()` given the indices `outer` already
    /// chosen on the axes before it.
    ///
    /// ```
    /// use qube::Array;
    /// let ragged = Array::join(&[
    ///     Array::from_vec(vec![1.0, 2.0]),
    ///     Array::from_vec(vec![3.0, 4.0, 5.0]),
    /// ]).unwrap();
    /// assert_eq!(ragged.length().unwrap(), 2);
    /// assert_eq!(ragged.length_at(&[0]).unwrap(), 2);
    /// assert_eq!(ragged.length_at(&[1]).unwrap(), 3);
    /// assert!(!ragged.is_qube());
    /// ```
    pub fn length_at(&self, outer: &[usize]) -> Result<usize> {
        let rank = self.rank();
        if outer.len() >= rank {
            return Err(Error::InvalidRank {expected: rank, actual: outer.len() + 1});
        }
        self.0.kind.length_at(outer)
    }

    /// The lengths of every axis. Fails with [`Error::NotAQube`] for ragged
    /// arrays. Axes after an empty axis are reported as empty.
    pub fn shape(&self) -> Result<Shape> {
        if !self.is_qube() { return Err(Error::NotAQube); }
        if let Kind::Dense(d) = &self.0.kind { return Ok(d.shape().into()); }
        let mut shape = Shape::new();
        let mut outer = Shape::new();
        for _ in 0..self.rank() {
            let length = if shape.contains(&0) { 0 } else { self.length_at(&outer)? };
            shape.push(length);
            outer.push(0);
        }
        Ok(shape)
    }

    /// Whether every axis has a length that does not depend on the indices
    /// chosen on earlier axes. Computed once and cached.
    pub fn is_qube(&self) -> bool { *self.0.qube.get_or_init(|| propagate::is_qube(self)) }

    pub fn properties(&self) -> &Properties { &self.0.properties }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> { self.0.properties.get(name) }

    /// The value of property `name` for row `row` of axis 0.
    pub fn property_at(&self, name: &str, row: usize) -> Option<&PropertyValue> {
        self.0.properties.get_at(name, row)
    }

    pub fn units(&self) -> Option<&Units> { self.0.properties.units() }

    /// Whether `self` and `other` are the same array, not merely equal.
    pub fn ptr_eq(&self, other: &Array) -> bool { Rc::ptr_eq(&self.0, &other.0) }

    // Views.

    /// The rank-`(r-1)` sub-array at index `index` of axis 0.
    pub fn slice(&self, index: usize) -> Result<Array> { view::slice(self, index) }

    /// The same-rank sub-array of axis-0 indices `start..end`.
    ///
    /// Trimming to the whole of axis 0 returns `self`.
    ///
    /// ```
    /// use qube::Array;
    /// let a = Array::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
    /// let t = a.trim(1, 3).unwrap();
    /// assert_eq!(t.flat_values().unwrap(), [2.0, 3.0]);
    /// assert!(a.trim(0, 4).unwrap().ptr_eq(&a));
    /// assert!(a.trim(3, 1).is_err());
    /// assert!(a.trim(0, 5).is_err());
    /// ```
    pub fn trim(&self, start: usize, end: usize) -> Result<Array> { view::trim(self, start, end) }

    /// Swap the two axes of a rank-2 qube.
    pub fn transpose(&self) -> Result<Array> { view::transpose(self) }

    /// Stack arrays of equal rank along a new axis 0.
    ///
    /// The arrays may have different shapes, in which case the result is not
    /// a qube.
    pub fn join(elements: &[Array]) -> Result<Array> { view::join(elements) }

    /// A view of `self` with property `name` set to `value`.
    pub fn with_property(&self, name: impl Into<SmolStr>, value: impl Into<PropertyValue>) -> Array {
        let mut properties = self.properties().clone();
        properties.insert(name, value);
        self.with_properties(properties)
    }

    /// A view of `self` with property bag `properties`.
    pub fn with_properties(&self, properties: Properties) -> Array {
        let source = match &self.0.kind {
            Kind::Annotated(source) => source.clone(),
            _ => self.clone(),
        };
        Self::from_view(Kind::Annotated(source), properties)
    }

    // Capabilities.

    /// Ask for a narrower interface to `self`.
    ///
    /// Returns `None` if `self` cannot offer it.
    ///
    /// ```
    /// use qube::{ArrayBuilder, Capability, CapabilityKind};
    /// let a = ArrayBuilder::from_typed(&[2, 2], vec![1i32, 2, 3, 4]).unwrap().build();
    /// match a.slice(1).unwrap().capability(CapabilityKind::IntegerValues) {
    ///     Some(Capability::IntegerValues(ints)) => assert_eq!(ints.value(&[0]).unwrap(), 3),
    ///     _ => panic!("expected integer access"),
    /// }
    /// assert!(a.capability(CapabilityKind::FlatValues).is_none());
    /// ```
    pub fn capability(&self, kind: CapabilityKind) -> Option<Capability<'_>> {
        let (dense, offset, shape) = self.dense_window()?;
        match kind {
            CapabilityKind::IntegerValues => {
                if !dense.values().dtype().is_integral() { return None; }
                Some(Capability::IntegerValues(IntegerValues::new(dense.values(), offset, shape)))
            }
            CapabilityKind::FlatValues => match dense.values() {
                Values::F64(v) => Some(Capability::FlatValues(&v[offset..offset + element_count(&shape)])),
                _ => None,
            },
        }
    }

    /// The dense store behind `self`, the offset of `self` within it, and the
    /// shape of `self`, if `self` is a contiguous window of a dense store.
    fn dense_window(&self) -> Option<(&Dense, usize, Shape)> {
        match &self.0.kind {
            Kind::Dense(d) => Some((d, 0, d.shape().into())),
            Kind::Slice(v) => {
                let (d, offset, shape) = v.source().dense_window()?;
                let stride = element_count(&shape[1..]);
                Some((d, offset + v.index() * stride, shape[1..].into()))
            }
            Kind::Trim(v) => {
                let (d, offset, mut shape) = v.source().dense_window()?;
                let stride = element_count(&shape[1..]);
                shape[0] = v.end() - v.start();
                Some((d, offset + v.start() * stride, shape))
            }
            Kind::Annotated(a) => a.dense_window(),
            _ => None,
        }
    }

    // Copies.

    /// Every value of `self`, in lexicographic index order.
    ///
    /// Works for ragged arrays too.
    pub fn flat_values(&self) -> Result<Vec<f64>> {
        let mut cursor = Cursor::unvalidated(self, &[])?;
        let mut ret = Vec::new();
        while cursor.has_next() {
            cursor.step()?;
            ret.push(cursor.value(self)?);
        }
        Ok(ret)
    }

    /// A writable copy of `self`, including its properties.
    pub fn writable_copy(&self) -> Result<ArrayBuilder> {
        if let Kind::Dense(d) = &self.0.kind {
            return Ok(ArrayBuilder::from_parts(d.clone(), self.properties().clone()));
        }
        let shape = self.shape()?;
        let mut builder = ArrayBuilder::from_values(&shape, self.flat_values()?)?;
        *builder.properties_mut() = self.properties().clone();
        Ok(builder)
    }

    /// A dense copy of `self`, including its properties.
    pub fn materialize(&self) -> Result<Array> {
        if let Kind::Dense(_) = &self.0.kind { return Ok(self.clone()); }
        Ok(self.writable_copy()?.build())
    }

    /// Take back the writable phase of a dense array without copying.
    ///
    /// Fails with [`Error::ImmutableViolation`] if any other handle or view
    /// shares `self`, or if `self` is not dense.
    ///
    /// ```
    /// use qube::{Array, Error};
    /// let a = Array::from_vec(vec![1.0, 2.0]);
    /// let view = a.trim(0, 1).unwrap();
    /// let a = match a.into_builder() {
    ///     Err((Error::ImmutableViolation, a)) => a,
    ///     _ => panic!("a is shared with a view"),
    /// };
    /// drop(view);
    /// let mut b = a.into_builder().map_err(|(e, _)| e).unwrap();
    /// b.put_value(&[0], 5.0).unwrap();
    /// assert_eq!(b.build().value(&[0]).unwrap(), 5.0);
    /// ```
    pub fn into_builder(self) -> std::result::Result<ArrayBuilder, (Error, Array)> {
        match Rc::try_unwrap(self.0) {
            Ok(Node {kind: Kind::Dense(d), properties, ..}) => Ok(ArrayBuilder::from_parts(d, properties)),
            Ok(node) => Err((Error::ImmutableViolation, Array(Rc::new(node)))),
            Err(rc) => Err((Error::ImmutableViolation, Array(rc))),
        }
    }
}

impl View for Array {
    fn rank(&self) -> usize { Array::rank(self) }
    fn value(&self, index: &[usize]) -> Result<f64> { Array::value(self, index) }
    fn length_at(&self, outer: &[usize]) -> Result<usize> { Array::length_at(self, outer) }
}

impl PartialEq for Array {
    /// Arrays are equal if they have the same rank, the same lengths and the
    /// same values. Properties are not compared.
    fn eq(&self, other: &Array) -> bool {
        if self.ptr_eq(other) { return true; }
        if self.rank() != other.rank() { return false; }
        if self.is_qube() != other.is_qube() { return false; }
        if self.is_qube() && self.shape().ok() != other.shape().ok() { return false; }
        match (self.flat_values(), other.flat_values()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut names: Vec<&str> = self.properties().names().collect();
        names.sort_unstable();
        f.debug_struct("Array")
            .field("kind", &self.0.kind.name())
            .field("rank", &self.rank())
            .field("length", &self.length().ok())
            .field("properties", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names;

    fn matrix() -> Array {
        ArrayBuilder::from_values(&[3, 4], (0..12).map(f64::from).collect()).unwrap()
            .with_property(names::UNITS, Units::new("nT"))
            .with_property(names::DEPEND_1, Array::from_vec(vec![10.0, 20.0, 30.0, 40.0]))
            .build()
    }

    #[test]
    fn arity_is_checked() {
        let m = matrix();
        assert_eq!(m.value(&[1]), Err(Error::InvalidRank {expected: 2, actual: 1}));
        assert_eq!(m.value(&[1, 2, 3]), Err(Error::InvalidRank {expected: 2, actual: 3}));
        assert_eq!(Array::scalar(1.0).length(), Err(Error::InvalidRank {expected: 0, actual: 1}));
        assert_eq!(Array::scalar(1.0).value(&[]), Ok(1.0));
    }

    #[test]
    fn bounds_are_checked() {
        let m = matrix();
        assert_eq!(m.value(&[3, 0]), Err(Error::IndexOutOfBounds {axis: 0, index: 3, length: 3}));
        assert_eq!(m.slice(3).unwrap_err(), Error::IndexOutOfBounds {axis: 0, index: 3, length: 3});
        assert_eq!(Array::scalar(1.0).slice(0).unwrap_err(), Error::InvalidRank {expected: 1, actual: 0});
    }

    #[test]
    fn shape_of_views() {
        let m = matrix();
        assert_eq!(&m.shape().unwrap()[..], [3, 4]);
        assert_eq!(&m.trim(1, 3).unwrap().shape().unwrap()[..], [2, 4]);
        assert_eq!(&m.slice(0).unwrap().shape().unwrap()[..], [4]);
        assert_eq!(&m.transpose().unwrap().shape().unwrap()[..], [4, 3]);
        assert!(m.trim(1, 1).unwrap().shape().unwrap().iter().all(|&n| n == 0));
    }

    #[test]
    fn flat_values_capability() {
        let m = matrix();
        match m.trim(1, 2).unwrap().capability(CapabilityKind::FlatValues) {
            Some(Capability::FlatValues(v)) => assert_eq!(v, [4.0, 5.0, 6.0, 7.0]),
            other => panic!("unexpected {:?}", other),
        }
        match m.slice(2).unwrap().capability(CapabilityKind::FlatValues) {
            Some(Capability::FlatValues(v)) => assert_eq!(v, [8.0, 9.0, 10.0, 11.0]),
            other => panic!("unexpected {:?}", other),
        }
        assert!(m.transpose().unwrap().capability(CapabilityKind::FlatValues).is_none());
        assert!(m.capability(CapabilityKind::IntegerValues).is_none());
    }

    #[test]
    fn copies() {
        let m = matrix();
        let t = m.transpose().unwrap();
        let d = t.materialize().unwrap();
        assert_eq!(d, t);
        assert_eq!(d.value(&[3, 1]).unwrap(), 7.0);
        assert_eq!(d.units().map(|u| u.name()), Some("nT"));
        let mut w = m.writable_copy().unwrap();
        w.put_value(&[0, 0], 100.0).unwrap();
        assert_eq!(m.value(&[0, 0]).unwrap(), 0.0);
        assert_eq!(w.build().value(&[0, 0]).unwrap(), 100.0);
    }

    #[test]
    fn annotation_does_not_touch_the_source() {
        let m = matrix();
        let a = m.with_property(names::LABEL, "field");
        assert_eq!(a.properties().str(names::LABEL), Some("field"));
        assert!(m.property(names::LABEL).is_none());
        assert_eq!(a, m);
        let b = a.with_property(names::TITLE, "t");
        assert!(matches!(b.kind(), Kind::Annotated(s) if s.ptr_eq(&m)));
    }
}
