//! Arrays that compute their values on demand from other arrays.
//!
//! Every view holds its sources by [`Array`] handle, so a view keeps its
//! sources alive and no source is ever copied. The properties of a view are
//! worked out by [`propagate`] when the view is made.
//!
//! [`propagate`]: super::propagate

use smallvec::smallvec;

use super::dense::{check_indices, offset_in, Dense, Shape};
use super::names::MAX_RANK;
use super::{propagate, Array, Error, Kind, RangeCheck, Result};

/// Implemented by every representation of an [`Array`].
///
/// Callers check the number of indices before calling [`value()`] or
/// [`length_at()`], so implementations may assume that `index.len()` equals
/// [`rank()`] and that `outer.len()` is less than it.
///
/// [`value()`]: Self::value()
/// [`length_at()`]: Self::length_at()
/// [`rank()`]: Self::rank()
pub(crate) trait View {
    fn rank(&self) -> usize;

    fn value(&self, index: &[usize]) -> Result<f64>;

    fn length_at(&self, outer: &[usize]) -> Result<usize>;
}

impl View for Dense {
    #[inline(always)]
    fn rank(&self) -> usize { Dense::rank(self) }
    #[inline(always)]
    fn value(&self, index: &[usize]) -> Result<f64> { Dense::value(self, index) }
    #[inline(always)]
    fn length_at(&self, outer: &[usize]) -> Result<usize> { Dense::length_at(self, outer) }
}

/// `[first, rest...]`.
fn prepend(first: usize, rest: &[usize]) -> Shape {
    let mut ret = Shape::with_capacity(rest.len() + 1);
    ret.push(first);
    ret.extend_from_slice(rest);
    ret
}

/// `[init..., last]`.
fn append(init: &[usize], last: usize) -> Shape {
    let mut ret = Shape::from_slice(init);
    ret.push(last);
    ret
}

/// Fails unless `index < length`.
fn check(axis: usize, index: usize, length: usize) -> Result<()> {
    if index >= length { return Err(Error::IndexOutOfBounds {axis, index, length}); }
    Ok(())
}

// ----------------------------------------------------------------------------

/// The representation of [`Array::slice()`].
pub(crate) struct SliceView(Array, usize);

impl SliceView {
    pub fn source(&self) -> &Array { &self.0 }

    pub fn index(&self) -> usize { self.1 }
}

impl View for SliceView {
    fn rank(&self) -> usize { self.0.rank() - 1 }
    fn value(&self, index: &[usize]) -> Result<f64> { self.0.value(&prepend(self.1, index)) }
    fn length_at(&self, outer: &[usize]) -> Result<usize> { self.0.length_at(&prepend(self.1, outer)) }
}

pub(crate) fn slice(source: &Array, index: usize) -> Result<Array> {
    if source.rank() == 0 { return Err(Error::InvalidRank {expected: 1, actual: 0}); }
    check(0, index, source.length()?)?;
    let properties = propagate::slice_properties(source.properties(), index)?;
    Ok(Array::from_view(Kind::Slice(SliceView(source.clone(), index)), properties))
}

// ----------------------------------------------------------------------------

/// The representation of [`Array::trim()`].
pub(crate) struct TrimView {
    source: Array,
    start: usize,
    end: usize,
}

impl TrimView {
    pub fn source(&self) -> &Array { &self.source }

    pub fn start(&self) -> usize { self.start }

    pub fn end(&self) -> usize { self.end }

    /// The source index of `index`, checking axis 0.
    fn source_index(&self, index: &[usize]) -> Result<Shape> {
        check(0, index[0], self.end - self.start)?;
        Ok(prepend(self.start + index[0], &index[1..]))
    }
}

impl View for TrimView {
    fn rank(&self) -> usize { self.source.rank() }

    fn value(&self, index: &[usize]) -> Result<f64> { self.source.value(&self.source_index(index)?) }

    fn length_at(&self, outer: &[usize]) -> Result<usize> {
        if outer.is_empty() { return Ok(self.end - self.start); }
        self.source.length_at(&self.source_index(outer)?)
    }
}

pub(crate) fn trim(source: &Array, start: usize, end: usize) -> Result<Array> {
    if source.rank() == 0 { return Err(Error::InvalidRank {expected: 1, actual: 0}); }
    if start > end { return Err(Error::InvalidRange {start, end}); }
    let length = source.length()?;
    if end > length { return Err(Error::IndexOutOfBounds {axis: 0, index: end, length}); }
    if start == 0 && end == length { return Ok(source.clone()); }
    let properties = propagate::trim_properties(source.properties(), start, end)?;
    // A trim of a trim reads straight from the inner source.
    let (inner, offset) = match source.kind() {
        Kind::Trim(t) => (t.source.clone(), t.start),
        _ => (source.clone(), 0),
    };
    let view = TrimView {source: inner, start: offset + start, end: offset + end};
    Ok(Array::from_view(Kind::Trim(view), properties))
}

// ----------------------------------------------------------------------------

/// The representation of [`Array::transpose()`].
pub(crate) struct TransposeView {
    source: Array,
    rows: usize,
    columns: usize,
}

impl View for TransposeView {
    fn rank(&self) -> usize { 2 }

    fn value(&self, index: &[usize]) -> Result<f64> { self.source.value(&[index[1], index[0]]) }

    fn length_at(&self, outer: &[usize]) -> Result<usize> {
        match *outer {
            [] => Ok(self.columns),
            [i] => { check(0, i, self.columns)?; Ok(self.rows) }
            _ => Err(Error::InvalidRank {expected: 2, actual: outer.len() + 1}),
        }
    }
}

pub(crate) fn transpose(source: &Array) -> Result<Array> {
    if source.rank() != 2 { return Err(Error::InvalidRank {expected: 2, actual: source.rank()}); }
    if !source.is_qube() { return Err(Error::NotAQube); }
    let rows = source.length()?;
    let columns = if rows == 0 { 0 } else { source.length_at(&[0])? };
    let properties = propagate::transpose_properties(source.properties())?;
    Ok(Array::from_view(Kind::Transpose(TransposeView {source: source.clone(), rows, columns}), properties))
}

// ----------------------------------------------------------------------------

/// The representation of [`Array::join()`].
pub(crate) struct JoinView(Box<[Array]>);

impl View for JoinView {
    fn rank(&self) -> usize { self.0[0].rank() + 1 }

    fn value(&self, index: &[usize]) -> Result<f64> {
        check(0, index[0], self.0.len())?;
        self.0[index[0]].value(&index[1..])
    }

    fn length_at(&self, outer: &[usize]) -> Result<usize> {
        if outer.is_empty() { return Ok(self.0.len()); }
        check(0, outer[0], self.0.len())?;
        self.0[outer[0]].length_at(&outer[1..])
    }
}

pub(crate) fn join(elements: &[Array]) -> Result<Array> {
    let first = elements.first()
        .ok_or_else(|| Error::UnsupportedScheme("nothing to join".into()))?;
    let rank = first.rank();
    if rank + 1 > MAX_RANK { return Err(Error::InvalidRank {expected: MAX_RANK - 1, actual: rank}); }
    if let Some(e) = elements.iter().find(|e| e.rank() != rank) {
        return Err(Error::InvalidRank {expected: rank, actual: e.rank()});
    }
    let properties = propagate::join_properties(elements)?;
    Ok(Array::from_view(Kind::Join(JoinView(elements.into())), properties))
}

// ----------------------------------------------------------------------------

/// The representation of a bundle: source arrays packed side by side along
/// the last axis.
///
/// Source `c` contributes one column per element of its trailing axes,
/// starting at column `starts[c]`. A column index is unflattened row-major
/// into the shape `inner[c]` of those axes. If every source is rank 0 the
/// bundle is rank 1 and each source is one element.
pub(crate) struct BundleView {
    sources: Box<[Array]>,
    starts: Box<[usize]>,
    inner: Box<[Shape]>,
    width: usize,
}

impl BundleView {
    /// Sources must be qubes of equal length, or all rank 0.
    pub fn new(sources: &[Array]) -> Result<Self> {
        let mut starts = Vec::with_capacity(sources.len());
        let mut inner = Vec::with_capacity(sources.len());
        let mut width = 0;
        for s in sources {
            let shape = s.shape()?;
            let trailing: Shape = if shape.is_empty() { Shape::new() } else { shape[1..].into() };
            starts.push(width);
            width += trailing.iter().product::<usize>();
            inner.push(trailing);
        }
        Ok(Self {sources: sources.into(), starts: starts.into(), inner: inner.into(), width})
    }

    fn is_scalar(&self) -> bool { self.sources[0].rank() == 0 }

    pub fn width(&self) -> usize { self.width }

    /// The source holding column `column`.
    fn source_of(&self, column: usize) -> usize { self.starts.partition_point(|&s| s <= column) - 1 }
}

impl View for BundleView {
    fn rank(&self) -> usize { if self.is_scalar() { 1 } else { 2 } }

    fn value(&self, index: &[usize]) -> Result<f64> {
        if self.is_scalar() {
            check(0, index[0], self.sources.len())?;
            return self.sources[index[0]].value(&[]);
        }
        check(1, index[1], self.width)?;
        let c = self.source_of(index[1]);
        let mut local = index[1] - self.starts[c];
        let inner = &self.inner[c];
        let mut full: Shape = smallvec![0; inner.len() + 1];
        full[0] = index[0];
        for (k, &length) in inner.iter().enumerate().rev() {
            full[k + 1] = local % length;
            local /= length;
        }
        self.sources[c].value(&full)
    }

    fn length_at(&self, outer: &[usize]) -> Result<usize> {
        if self.is_scalar() { return Ok(self.sources.len()); }
        let rows = self.sources[0].length()?;
        if outer.is_empty() { return Ok(rows); }
        check(0, outer[0], rows)?;
        Ok(self.width)
    }
}

// ----------------------------------------------------------------------------

/// One column of the last axis of `source`, one rank lower than `source`.
pub(crate) struct ColumnView(Array, usize);

impl ColumnView {
    pub fn new(source: &Array, column: usize) -> Result<Self> {
        let rank = source.rank();
        if rank == 0 { return Err(Error::InvalidRank {expected: 1, actual: 0}); }
        if rank == 1 { check(0, column, source.length()?)?; }
        Ok(Self(source.clone(), column))
    }

    pub fn source(&self) -> &Array { &self.0 }
}

impl View for ColumnView {
    fn rank(&self) -> usize { self.0.rank() - 1 }
    fn value(&self, index: &[usize]) -> Result<f64> { self.0.value(&append(index, self.1)) }
    fn length_at(&self, outer: &[usize]) -> Result<usize> { self.0.length_at(outer) }
}

// ----------------------------------------------------------------------------

/// A run of columns of the last axis of `source`, reshaped row-major into the
/// axes `dims`.
pub(crate) struct ReformView {
    source: Array,
    start: usize,
    dims: Shape,
}

impl ReformView {
    pub fn new(source: &Array, start: usize, dims: &[usize]) -> Result<Self> {
        let lead = source.rank().checked_sub(1)
            .ok_or(Error::InvalidRank {expected: 1, actual: 0})?;
        if lead + dims.len() > MAX_RANK {
            return Err(Error::InvalidRank {expected: MAX_RANK, actual: lead + dims.len()});
        }
        Ok(Self {source: source.clone(), start, dims: dims.into()})
    }

    pub fn source(&self) -> &Array { &self.source }

    fn lead(&self) -> usize { self.source.rank() - 1 }
}

impl View for ReformView {
    fn rank(&self) -> usize { self.lead() + self.dims.len() }

    fn value(&self, index: &[usize]) -> Result<f64> {
        let (outer, local) = index.split_at(self.lead());
        let column = offset_in(&self.dims, local, RangeCheck::Enabled)?;
        self.source.value(&append(outer, self.start + column))
    }

    fn length_at(&self, outer: &[usize]) -> Result<usize> {
        let lead = self.lead();
        if outer.len() < lead { return self.source.length_at(outer); }
        let local = &outer[lead..];
        check_indices(&self.dims, local)?;
        Ok(self.dims[local.len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> Array { Array::from_shape_vec(&[3, 4], (0..12).map(f64::from).collect()).unwrap() }

    #[test]
    fn slice_and_trim_read_through() {
        let m = matrix();
        let s = m.slice(2).unwrap();
        assert_eq!(s.value(&[1]).unwrap(), 9.0);
        assert_eq!(s.value(&[4]), Err(Error::IndexOutOfBounds {axis: 1, index: 4, length: 4}));
        let t = m.trim(1, 3).unwrap();
        assert_eq!(t.length().unwrap(), 2);
        assert_eq!(t.value(&[1, 0]).unwrap(), 8.0);
        assert_eq!(t.value(&[2, 0]), Err(Error::IndexOutOfBounds {axis: 0, index: 2, length: 2}));
    }

    #[test]
    fn trim_of_trim_collapses() {
        let a = Array::from_vec((0..10).map(f64::from).collect());
        let t = a.trim(2, 8).unwrap().trim(1, 3).unwrap();
        match t.kind() {
            Kind::Trim(v) => {
                assert!(v.source().ptr_eq(&a));
                assert_eq!((v.start(), v.end()), (3, 5));
            }
            _ => panic!("expected a trim"),
        }
        assert_eq!(t.flat_values().unwrap(), [3.0, 4.0]);
    }

    #[test]
    fn transpose_swaps_axes() {
        let t = matrix().transpose().unwrap();
        assert_eq!(t.length().unwrap(), 4);
        assert_eq!(t.length_at(&[3]).unwrap(), 3);
        assert_eq!(t.value(&[1, 2]).unwrap(), 9.0);
        assert_eq!(t.length_at(&[4]), Err(Error::IndexOutOfBounds {axis: 0, index: 4, length: 4}));
        assert_eq!(Array::from_vec(vec![1.0]).transpose().unwrap_err(), Error::InvalidRank {expected: 2, actual: 1});
    }

    #[test]
    fn join_limits() {
        assert!(matches!(Array::join(&[]), Err(Error::UnsupportedScheme(_))));
        let r3 = Array::from_shape_vec(&[1, 1, 1], vec![0.0]).unwrap();
        let r4 = Array::join(&[r3.clone()]).unwrap();
        assert_eq!(r4.rank(), 4);
        assert_eq!(Array::join(&[r4]).unwrap_err(), Error::InvalidRank {expected: 3, actual: 4});
        assert_eq!(
            Array::join(&[r3, Array::scalar(1.0)]).unwrap_err(),
            Error::InvalidRank {expected: 3, actual: 0},
        );
    }

    #[test]
    fn bundle_view_unflattens_columns() {
        let a = Array::from_vec(vec![1.0, 2.0]);
        let b = Array::from_shape_vec(&[2, 2, 3], (0..12).map(f64::from).collect()).unwrap();
        let v = BundleView::new(&[a, b]).unwrap();
        assert_eq!(v.width(), 7);
        assert_eq!(v.rank(), 2);
        assert_eq!(v.value(&[1, 0]).unwrap(), 2.0);
        // Column 5 is b[.., 1, 1].
        assert_eq!(v.value(&[1, 5]).unwrap(), 10.0);
        assert_eq!(v.value(&[0, 7]), Err(Error::IndexOutOfBounds {axis: 1, index: 7, length: 7}));
    }

    #[test]
    fn reform_reshapes_columns() {
        let m = matrix();
        let r = ReformView::new(&m, 1, &[1, 3]).unwrap();
        assert_eq!(r.rank(), 3);
        assert_eq!(r.length_at(&[0]).unwrap(), 1);
        assert_eq!(r.length_at(&[0, 0]).unwrap(), 3);
        assert_eq!(r.value(&[2, 0, 2]).unwrap(), 11.0);
        let c = ColumnView::new(&m, 3).unwrap();
        assert_eq!(c.rank(), 1);
        assert_eq!(c.value(&[1]).unwrap(), 7.0);
    }
}
