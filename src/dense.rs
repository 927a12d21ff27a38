//! Dense, row-major backing stores and the writable [`ArrayBuilder`].

use smallvec::SmallVec;
use smol_str::SmolStr;

use super::{names, Array, Error, Result, Properties, PropertyValue, RangeCheck};

/// The element type of a backing store.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum DataType {
    F64,
    F32,
    I64,
    I32,
    I16,
    U8,
}

impl DataType {
    pub const fn is_integral(self) -> bool {
        matches!(self, DataType::I64 | DataType::I32 | DataType::I16 | DataType::U8)
    }
}

/// The elements of a dense array in row-major order.
///
/// Every element reads as an `f64`. Writing an `f64` into an integral store
/// truncates towards zero and saturates at the bounds of the element type.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    F64(Vec<f64>),
    F32(Vec<f32>),
    I64(Vec<i64>),
    I32(Vec<i32>),
    I16(Vec<i16>),
    U8(Vec<u8>),
}

impl Values {
    pub fn zeros(dtype: DataType, len: usize) -> Self {
        match dtype {
            DataType::F64 => Values::F64(vec![0.0; len]),
            DataType::F32 => Values::F32(vec![0.0; len]),
            DataType::I64 => Values::I64(vec![0; len]),
            DataType::I32 => Values::I32(vec![0; len]),
            DataType::I16 => Values::I16(vec![0; len]),
            DataType::U8 => Values::U8(vec![0; len]),
        }
    }

    pub fn dtype(&self) -> DataType {
        match self {
            Values::F64(_) => DataType::F64,
            Values::F32(_) => DataType::F32,
            Values::I64(_) => DataType::I64,
            Values::I32(_) => DataType::I32,
            Values::I16(_) => DataType::I16,
            Values::U8(_) => DataType::U8,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Values::F64(v) => v.len(),
            Values::F32(v) => v.len(),
            Values::I64(v) => v.len(),
            Values::I32(v) => v.len(),
            Values::I16(v) => v.len(),
            Values::U8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Panics if `offset` is out of bounds.
    pub fn get(&self, offset: usize) -> f64 {
        match self {
            Values::F64(v) => v[offset],
            Values::F32(v) => v[offset] as f64,
            Values::I64(v) => v[offset] as f64,
            Values::I32(v) => v[offset] as f64,
            Values::I16(v) => v[offset] as f64,
            Values::U8(v) => v[offset] as f64,
        }
    }

    /// The element at `offset` if the store is integral.
    pub fn get_int(&self, offset: usize) -> Option<i64> {
        match self {
            Values::I64(v) => Some(v[offset]),
            Values::I32(v) => Some(v[offset] as i64),
            Values::I16(v) => Some(v[offset] as i64),
            Values::U8(v) => Some(v[offset] as i64),
            Values::F64(_) | Values::F32(_) => None,
        }
    }

    /// Panics if `offset` is out of bounds.
    pub fn set(&mut self, offset: usize, value: f64) {
        match self {
            Values::F64(v) => v[offset] = value,
            Values::F32(v) => v[offset] = value as f32,
            Values::I64(v) => v[offset] = value as i64,
            Values::I32(v) => v[offset] = value as i32,
            Values::I16(v) => v[offset] = value as i16,
            Values::U8(v) => v[offset] = value as u8,
        }
    }
}

impl From<Vec<f64>> for Values { fn from(v: Vec<f64>) -> Self { Values::F64(v) } }
impl From<Vec<f32>> for Values { fn from(v: Vec<f32>) -> Self { Values::F32(v) } }
impl From<Vec<i64>> for Values { fn from(v: Vec<i64>) -> Self { Values::I64(v) } }
impl From<Vec<i32>> for Values { fn from(v: Vec<i32>) -> Self { Values::I32(v) } }
impl From<Vec<i16>> for Values { fn from(v: Vec<i16>) -> Self { Values::I16(v) } }
impl From<Vec<u8>> for Values { fn from(v: Vec<u8>) -> Self { Values::U8(v) } }

// ----------------------------------------------------------------------------

pub(crate) type Shape = SmallVec<[usize; 4]>;

/// The number of elements in an array of shape `shape`.
pub(crate) fn element_count(shape: &[usize]) -> usize { shape.iter().product() }

/// A rectangular array of rank 0 to 4 stored in a flat buffer.
#[derive(Debug, Clone)]
pub(crate) struct Dense {
    shape: Shape,
    values: Values,
    range_check: RangeCheck,
}

impl Dense {
    fn new(shape: &[usize], values: Values) -> Result<Self> {
        if shape.len() > names::MAX_RANK {
            return Err(Error::InvalidRank {expected: names::MAX_RANK, actual: shape.len()});
        }
        let expected = element_count(shape);
        if values.len() != expected {
            return Err(Error::WrongElementCount {expected, actual: values.len()});
        }
        Ok(Self {shape: shape.into(), values, range_check: RangeCheck::default()})
    }

    pub fn scalar(value: f64) -> Self {
        Self {shape: Shape::new(), values: Values::F64(vec![value]), range_check: RangeCheck::default()}
    }

    pub fn vector(values: Values) -> Self {
        let mut shape = Shape::new();
        shape.push(values.len());
        Self {shape, values, range_check: RangeCheck::default()}
    }

    pub fn rank(&self) -> usize { self.shape.len() }

    pub fn shape(&self) -> &[usize] { &self.shape }

    pub fn values(&self) -> &Values { &self.values }

    /// The row-major position of `index`.
    pub fn offset(&self, index: &[usize]) -> Result<usize> {
        offset_in(&self.shape, index, self.range_check)
    }

    pub fn value(&self, index: &[usize]) -> Result<f64> {
        let offset = self.offset(index)?;
        if offset >= self.values.len() {
            return Err(Error::IndexOutOfBounds {axis: 0, index: offset, length: self.values.len()});
        }
        Ok(self.values.get(offset))
    }

    pub fn put_value(&mut self, index: &[usize], value: f64) -> Result<()> {
        let offset = self.offset(index)?;
        if offset >= self.values.len() {
            return Err(Error::IndexOutOfBounds {axis: 0, index: offset, length: self.values.len()});
        }
        self.values.set(offset, value);
        Ok(())
    }

    /// The length of axis `outer.len()`, which is the same for every `outer`.
    pub fn length_at(&self, outer: &[usize]) -> Result<usize> {
        if outer.len() >= self.rank() {
            return Err(Error::InvalidRank {expected: self.rank(), actual: outer.len() + 1});
        }
        if self.range_check.is_enabled() {
            check_indices(&self.shape, outer)?;
        }
        Ok(self.shape[outer.len()])
    }
}

/// Check each of `index` against the corresponding length in `shape`.
pub(crate) fn check_indices(shape: &[usize], index: &[usize]) -> Result<()> {
    for (axis, (&i, &length)) in index.iter().zip(shape).enumerate() {
        if i >= length { return Err(Error::IndexOutOfBounds {axis, index: i, length}); }
    }
    Ok(())
}

/// The row-major position of `index` within an array of shape `shape`.
pub(crate) fn offset_in(shape: &[usize], index: &[usize], range_check: RangeCheck) -> Result<usize> {
    if index.len() != shape.len() {
        return Err(Error::InvalidRank {expected: shape.len(), actual: index.len()});
    }
    if range_check.is_enabled() { check_indices(shape, index)?; }
    let mut offset = 0;
    for (&i, &length) in index.iter().zip(shape) { offset = offset * length + i; }
    Ok(offset)
}

// ----------------------------------------------------------------------------

/// The writable phase of an array.
///
/// An `ArrayBuilder` owns its backing store exclusively, so writes need
/// `&mut self`. [`build()`](Self::build) consumes the builder and publishes an
/// immutable [`Array`].
///
/// ```
/// use qube::{ArrayBuilder, Units};
/// let mut b = ArrayBuilder::new(&[2, 3]).unwrap();
/// b.put_value(&[1, 2], 5.0).unwrap();
/// b.put_property("UNITS", Units::new("nT"));
/// let a = b.build();
/// assert_eq!(a.value(&[1, 2]).unwrap(), 5.0);
/// assert_eq!(a.rank(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ArrayBuilder {
    dense: Dense,
    properties: Properties,
}

impl ArrayBuilder {
    /// An array of zeros of shape `shape`, stored as `f64`.
    pub fn new(shape: &[usize]) -> Result<Self> { Self::with_type(shape, DataType::F64) }

    /// An array of zeros of shape `shape` with backing store type `dtype`.
    pub fn with_type(shape: &[usize], dtype: DataType) -> Result<Self> {
        Self::from_typed(shape, Values::zeros(dtype, element_count(shape)))
    }

    /// An array of shape `shape` with elements `values` in row-major order.
    pub fn from_values(shape: &[usize], values: Vec<f64>) -> Result<Self> {
        Self::from_typed(shape, Values::F64(values))
    }

    pub fn from_typed(shape: &[usize], values: impl Into<Values>) -> Result<Self> {
        Ok(Self {dense: Dense::new(shape, values.into())?, properties: Properties::new()})
    }

    pub(crate) fn from_parts(dense: Dense, properties: Properties) -> Self { Self {dense, properties} }

    /// Enable or disable index range checks for the array being built.
    pub fn range_check(mut self, range_check: RangeCheck) -> Self {
        self.dense.range_check = range_check;
        self
    }

    pub fn rank(&self) -> usize { self.dense.rank() }

    pub fn shape(&self) -> &[usize] { self.dense.shape() }

    pub fn dtype(&self) -> DataType { self.dense.values.dtype() }

    pub fn value(&self, index: &[usize]) -> Result<f64> { self.dense.value(index) }

    /// Write one element. `index` must have exactly [`rank()`](Self::rank)
    /// elements.
    pub fn put_value(&mut self, index: &[usize], value: f64) -> Result<()> {
        self.dense.put_value(index, value)
    }

    pub fn properties(&self) -> &Properties { &self.properties }

    pub fn properties_mut(&mut self) -> &mut Properties { &mut self.properties }

    pub fn put_property(
        &mut self,
        name: impl Into<SmolStr>,
        value: impl Into<PropertyValue>,
    ) -> &mut Self {
        self.properties.insert(name, value);
        self
    }

    /// Builder-style [`put_property()`](Self::put_property).
    pub fn with_property(mut self, name: impl Into<SmolStr>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name, value);
        self
    }

    /// Replace the whole property bag.
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Publish the array. No further writes are possible.
    pub fn build(self) -> Array { Array::from_dense(self.dense, self.properties) }
}

// ----------------------------------------------------------------------------

/// Integer access to an integral backing store, offered by
/// [`Array::capability()`].
///
/// [`Array::capability()`]: super::Array::capability()
#[derive(Debug, Clone)]
pub struct IntegerValues<'a> {
    values: &'a Values,
    offset: usize,
    shape: Shape,
}

impl<'a> IntegerValues<'a> {
    /// A window of `values` of shape `shape` starting at `offset`.
    pub(crate) fn new(values: &'a Values, offset: usize, shape: Shape) -> Self {
        Self {values, offset, shape}
    }

    pub fn rank(&self) -> usize { self.shape.len() }

    pub fn shape(&self) -> &[usize] { &self.shape }

    pub fn value(&self, index: &[usize]) -> Result<i64> {
        let offset = self.offset + offset_in(&self.shape, index, RangeCheck::Enabled)?;
        self.values.get_int(offset).ok_or_else(|| {
            Error::UnsupportedScheme("backing store is not integral".into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major_offsets() {
        let d = Dense::new(&[2, 3, 4], Values::zeros(DataType::F64, 24)).unwrap();
        assert_eq!(d.offset(&[0, 0, 0]).unwrap(), 0);
        assert_eq!(d.offset(&[0, 0, 3]).unwrap(), 3);
        assert_eq!(d.offset(&[0, 1, 0]).unwrap(), 4);
        assert_eq!(d.offset(&[1, 2, 3]).unwrap(), 23);
    }

    #[test]
    fn bounds_and_arity() {
        let d = Dense::new(&[2, 3], Values::zeros(DataType::F64, 6)).unwrap();
        assert_eq!(d.value(&[0]), Err(Error::InvalidRank {expected: 2, actual: 1}));
        assert_eq!(d.value(&[2, 0]), Err(Error::IndexOutOfBounds {axis: 0, index: 2, length: 2}));
        assert_eq!(d.value(&[1, 3]), Err(Error::IndexOutOfBounds {axis: 1, index: 3, length: 3}));
        assert_eq!(d.length_at(&[]), Ok(2));
        assert_eq!(d.length_at(&[1]), Ok(3));
        assert!(d.length_at(&[0, 0]).is_err());
    }

    #[test]
    fn unchecked_reads_stay_in_the_store() {
        let b = ArrayBuilder::from_values(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap()
            .range_check(RangeCheck::Disabled);
        // (0, 2) aliases (1, 0) when range checks are off.
        assert_eq!(b.value(&[0, 2]).unwrap(), 3.0);
        assert!(b.value(&[1, 2]).is_err());
        assert_eq!(b.value(&[0]), Err(Error::InvalidRank {expected: 2, actual: 1}));
    }

    #[test]
    fn typed_stores() {
        let mut b = ArrayBuilder::with_type(&[3], DataType::I16).unwrap();
        b.put_value(&[1], 7.9).unwrap();
        b.put_value(&[2], -1e9).unwrap();
        assert_eq!(b.value(&[1]).unwrap(), 7.0);
        assert_eq!(b.value(&[2]).unwrap(), i16::MIN as f64);
        assert!(b.dtype().is_integral());
    }

    #[test]
    fn element_count_must_match() {
        assert_eq!(
            ArrayBuilder::from_values(&[2, 2], vec![1.0]).unwrap_err(),
            Error::WrongElementCount {expected: 4, actual: 1},
        );
        assert!(matches!(
            ArrayBuilder::new(&[1, 1, 1, 1, 1]),
            Err(Error::InvalidRank {expected: 4, actual: 5}),
        ));
    }
}
