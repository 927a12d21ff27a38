//! Walking arbitrary subsets of an array's indices.
//!
//! A [`Cursor`] is built from one [`DimensionSpec`] per axis. It visits
//! positions like an odometer: the last axis advances every step, and an axis
//! that runs out restarts, re-measured against the indices now fixed on the
//! axes before it, while the axis before it advances. This is what makes
//! cursors work on ragged arrays.
//!
//! If every axis is given an explicit index list, the lists are instead walked
//! in step ("zipped"): position `n` takes the `n`th index of every list.
//!
//! ```
//! use qube::{Array, Cursor, DimensionSpec};
//! let a = Array::from_shape_vec(&[4, 2], (0..8).map(f64::from).collect()).unwrap();
//! let cursor = Cursor::new(&a, &[DimensionSpec::list(vec![2, 0, 3]), DimensionSpec::range(0, 2)]).unwrap();
//! let visited: Vec<_> = cursor.map(|p| p.unwrap().to_vec()).collect();
//! assert_eq!(visited, [[2, 0], [2, 1], [0, 0], [0, 1], [3, 0], [3, 1]]);
//! ```

use std::rc::Rc;

use smallvec::{smallvec, SmallVec};
use tracing::{debug, trace};

use super::names::{self, classify, PropertyKind, Structure};
use super::{propagate, validate, Array, ArrayBuilder, Error, Properties, PropertyValue, Result};

/// A position in an array, one index per axis.
pub type Index = SmallVec<[usize; 4]>;

/// Which indices of one axis to visit.
///
/// Indices are signed: a negative index counts back from the end of the axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimensionSpec {
    /// `start, start + step, ...` while below `stop`. Negative bounds count
    /// back from the end of the axis and are clamped to its start. A missing
    /// `stop` means the length of the axis. A `start` past the end gives an
    /// empty walk, but a `stop` past the end is an error.
    Range { start: i64, stop: Option<i64>, step: usize },
    /// The listed indices, in order.
    IndexList(Rc<[i64]>),
    /// A single index. The axis does not appear in results built with
    /// [`Cursor::create_empty()`].
    Singleton(i64),
}

impl DimensionSpec {
    /// Every index of the axis.
    pub fn all() -> Self { DimensionSpec::Range {start: 0, stop: None, step: 1} }

    pub fn range(start: i64, stop: i64) -> Self { DimensionSpec::Range {start, stop: Some(stop), step: 1} }

    pub fn strided(start: i64, stop: Option<i64>, step: usize) -> Self { DimensionSpec::Range {start, stop, step} }

    pub fn list(indices: impl Into<Rc<[i64]>>) -> Self { DimensionSpec::IndexList(indices.into()) }

    /// An index list read from a rank-1 array.
    pub fn list_from_array(indices: &Array) -> Result<Self> {
        if indices.rank() != 1 { return Err(Error::InvalidRank {expected: 1, actual: indices.rank()}); }
        let list: Result<Vec<i64>> = (0..indices.length()?).map(|i| Ok(indices.value(&[i])? as i64)).collect();
        Ok(Self::list(list?))
    }

    pub fn singleton(index: i64) -> Self { DimensionSpec::Singleton(index) }

    /// Parse `"start:stop:step"` (each part optional) or a single index.
    ///
    /// ```
    /// use qube::DimensionSpec;
    /// assert_eq!(DimensionSpec::parse(":").unwrap(), DimensionSpec::all());
    /// assert_eq!(DimensionSpec::parse("1:-1").unwrap(), DimensionSpec::range(1, -1));
    /// assert_eq!(DimensionSpec::parse("::2").unwrap(), DimensionSpec::strided(0, None, 2));
    /// assert_eq!(DimensionSpec::parse("-1").unwrap(), DimensionSpec::singleton(-1));
    /// assert!(DimensionSpec::parse("1:2:0").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let bad = || Error::UnsupportedScheme(format!("cannot parse dimension spec {:?}", s));
        let parts: SmallVec<[&str; 3]> = s.trim().split(':').map(str::trim).collect();
        let int = |p: &str| -> Result<Option<i64>> {
            if p.is_empty() { Ok(None) } else { p.parse().map(Some).map_err(|_| bad()) }
        };
        match parts[..] {
            [i] => Ok(Self::singleton(int(i)?.ok_or_else(bad)?)),
            [start, stop] => Ok(Self::strided(int(start)?.unwrap_or(0), int(stop)?, 1)),
            [start, stop, step] => {
                let step = if step.is_empty() { 1 } else { step.parse().map_err(|_| bad())? };
                if step == 0 { return Err(bad()); }
                Ok(Self::strided(int(start)?.unwrap_or(0), int(stop)?, step))
            }
            _ => Err(bad()),
        }
    }

    /// Resolve against an axis of length `length`.
    fn start(&self, axis: usize, length: usize) -> Result<DimensionIterator> {
        Ok(match self {
            DimensionSpec::Range {start, stop, step} => {
                if *step == 0 { return Err(Error::UnsupportedScheme("range with step 0".into())); }
                let start = clamp(*start, length);
                if let Some(s) = stop.filter(|&s| s > length as i64) {
                    return Err(Error::IndexOutOfBounds {axis, index: s as usize, length});
                }
                let stop = stop.map_or(length, |s| clamp(s, length));
                DimensionIterator::Range {next: start, stop, step: *step}
            }
            DimensionSpec::IndexList(list) => {
                let indices: Result<Vec<usize>> = list.iter().map(|&i| resolve(i, axis, length)).collect();
                DimensionIterator::List {indices: indices?, position: 0}
            }
            DimensionSpec::Singleton(i) => DimensionIterator::Singleton(Some(resolve(*i, axis, length)?)),
        })
    }
}

/// A Python-style slice bound.
fn clamp(i: i64, length: usize) -> usize {
    let length = length as i64;
    (if i < 0 { (length + i).max(0) } else { i.min(length) }) as usize
}

/// A single index, which must exist.
fn resolve(i: i64, axis: usize, length: usize) -> Result<usize> {
    let resolved = if i < 0 { length as i64 + i } else { i };
    if resolved < 0 || resolved >= length as i64 {
        return Err(Error::IndexOutOfBounds {axis, index: i.unsigned_abs() as usize, length});
    }
    Ok(resolved as usize)
}

/// A [`DimensionSpec`] resolved against one axis.
#[derive(Debug, Clone)]
enum DimensionIterator {
    Range { next: usize, stop: usize, step: usize },
    List { indices: Vec<usize>, position: usize },
    Singleton(Option<usize>),
}

impl Iterator for DimensionIterator {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        match self {
            DimensionIterator::Range {next, stop, step} => {
                if *next >= *stop { return None; }
                let ret = *next;
                *next = next.saturating_add(*step);
                Some(ret)
            }
            DimensionIterator::List {indices, position} => {
                let ret = indices.get(*position).copied();
                *position += 1;
                ret
            }
            DimensionIterator::Singleton(index) => index.take(),
        }
    }
}

impl Default for DimensionIterator {
    fn default() -> Self { DimensionIterator::Singleton(None) }
}

// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Position {
    index: Index,
    /// The position in a result built with `create_empty()`.
    output: Index,
}

#[derive(Debug)]
enum State {
    /// Rank 0: a single visit.
    Scalar { visited: bool },
    Odometer { iterators: SmallVec<[DimensionIterator; 4]>, working: Index, ordinals: Index, begun: bool },
    Zipped { lists: SmallVec<[Rc<[i64]>; 4]>, next: usize, len: usize },
    Done,
}

/// A multidimensional cursor over an [`Array`].
///
/// Call [`step()`](Self::step) to move to the next position, then read it with
/// [`indices()`](Self::indices) or [`value()`](Self::value). Alternatively use
/// the `Iterator` implementation, which yields the positions.
pub struct Cursor {
    array: Array,
    specs: SmallVec<[DimensionSpec; 4]>,
    state: State,
    current: Option<Position>,
    /// The position after `current`, worked out in advance.
    lookahead: Option<Result<Position>>,
}

impl Cursor {
    /// A cursor over `array`, visiting the indices chosen by `specs`. Axes
    /// after the last spec visit every index.
    ///
    /// Fails with [`Error::InvalidStructure`] if [`validate()`] reports
    /// problems with `array`.
    pub fn new(array: &Array, specs: &[DimensionSpec]) -> Result<Self> {
        let problems = validate(array);
        if !problems.is_empty() { return Err(Error::InvalidStructure(problems)); }
        Self::unvalidated(array, specs)
    }

    pub(crate) fn unvalidated(array: &Array, specs: &[DimensionSpec]) -> Result<Self> {
        let rank = array.rank();
        if specs.len() > rank { return Err(Error::InvalidRank {expected: rank, actual: specs.len()}); }
        let mut specs: SmallVec<[DimensionSpec; 4]> = specs.iter().cloned().collect();
        specs.resize(rank, DimensionSpec::all());
        let lists: Option<SmallVec<[Rc<[i64]>; 4]>> = specs.iter().map(|s| match s {
            DimensionSpec::IndexList(l) => Some(l.clone()),
            _ => None,
        }).collect();
        let state = match lists {
            _ if rank == 0 => State::Scalar {visited: false},
            Some(lists) if rank >= 2 => {
                let len = lists[0].len();
                if let Some(l) = lists.iter().find(|l| l.len() != len) {
                    return Err(Error::MismatchedIndexLists {expected: len, actual: l.len()});
                }
                debug!(rank, len, "walking index lists in step");
                State::Zipped {lists, next: 0, len}
            }
            _ => State::Odometer {
                iterators: smallvec![DimensionIterator::default(); rank],
                working: smallvec![0; rank],
                ordinals: smallvec![0; rank],
                begun: false,
            },
        };
        trace!(rank, "created cursor");
        let mut ret = Self {array: array.clone(), specs, state, current: None, lookahead: None};
        match ret.look_ahead() {
            Some(Err(e)) => Err(e),
            lookahead => {
                ret.lookahead = lookahead;
                Ok(ret)
            }
        }
    }

    pub fn array(&self) -> &Array { &self.array }

    pub fn rank(&self) -> usize { self.specs.len() }

    /// Whether [`step()`](Self::step) will succeed.
    pub fn has_next(&self) -> bool { self.lookahead.is_some() }

    /// Move to the next position.
    pub fn step(&mut self) -> Result<()> {
        match self.lookahead.take() {
            None => Err(Error::NoMoreElements),
            Some(Err(e)) => Err(e),
            Some(Ok(p)) => {
                self.current = Some(p);
                self.lookahead = self.look_ahead();
                Ok(())
            }
        }
    }

    /// The index on `axis` of the current position.
    ///
    /// # Panics
    ///
    /// Panics if `axis >= self.rank()` or before the first `step()`.
    pub fn index(&self, axis: usize) -> usize { self.indices()[axis] }

    /// The current position, or `&[]` before the first `step()`.
    pub fn indices(&self) -> &[usize] { self.current.as_ref().map_or(&[], |p| &p.index) }

    /// The current position in a result built with
    /// [`create_empty()`](Self::create_empty).
    pub fn output_index(&self) -> &[usize] { self.current.as_ref().map_or(&[], |p| &p.output) }

    /// The value of `array` at the current position. `array` must have the
    /// geometry of the array being walked.
    pub fn value(&self, array: &Array) -> Result<f64> {
        let p = self.current.as_ref().ok_or(Error::NoMoreElements)?;
        array.value(&p.index)
    }

    /// Write `value` into `builder` at the current position.
    pub fn put_value(&self, builder: &mut ArrayBuilder, value: f64) -> Result<()> {
        let p = self.current.as_ref().ok_or(Error::NoMoreElements)?;
        builder.put_value(&p.index, value)
    }

    /// Write `value` into a result built with
    /// [`create_empty()`](Self::create_empty) at the current position.
    pub fn put_result(&self, builder: &mut ArrayBuilder, value: f64) -> Result<()> {
        let p = self.current.as_ref().ok_or(Error::NoMoreElements)?;
        builder.put_value(&p.output, value)
    }

    // Advancing.

    fn look_ahead(&mut self) -> Option<Result<Position>> {
        match self.advance() {
            Ok(ret) => ret.map(Ok),
            Err(e) => {
                self.state = State::Done;
                Some(Err(e))
            }
        }
    }

    fn advance(&mut self) -> Result<Option<Position>> {
        let array = &self.array;
        let specs = &self.specs;
        match &mut self.state {
            State::Done => Ok(None),
            State::Scalar {visited} => {
                if *visited { return Ok(None); }
                *visited = true;
                Ok(Some(Position {index: Index::new(), output: Index::new()}))
            }
            State::Zipped {lists, next, len} => {
                if *next >= *len { return Ok(None); }
                let mut index = Index::new();
                for (axis, list) in lists.iter().enumerate() {
                    let length = array.length_at(&index)?;
                    index.push(resolve(list[*next], axis, length)?);
                }
                let output = smallvec![*next];
                *next += 1;
                Ok(Some(Position {index, output}))
            }
            State::Odometer {iterators, working, ordinals, begun} => {
                let rank = specs.len();
                // Axes from `k` on need restarting, and axis `k - 1` advances next.
                let mut k = rank;
                if !*begun {
                    *begun = true;
                    match fill(array, specs, iterators, working, ordinals, 0)? {
                        None => return Ok(Some(position(specs, working, ordinals))),
                        Some(empty) => k = empty,
                    }
                }
                loop {
                    if k == 0 { return Ok(None); }
                    let axis = k - 1;
                    match iterators[axis].next() {
                        None => k = axis,
                        Some(i) => {
                            working[axis] = i;
                            ordinals[axis] += 1;
                            match fill(array, specs, iterators, working, ordinals, axis + 1)? {
                                None => return Ok(Some(position(specs, working, ordinals))),
                                Some(empty) => k = empty,
                            }
                        }
                    }
                }
            }
        }
    }

    // Results.

    /// An empty array shaped like the result of this walk, with properties
    /// derived from the array being walked.
    ///
    /// Singleton axes are dropped, adding a `CONTEXT_n` if the axis had
    /// rank-1 tags. Other axes keep their tags, gathered if the walk does not
    /// cover the whole axis. In zipped mode the result is rank 1 and carries
    /// the dimension properties and the rank-1 `DEPEND_0` of the array, gathered
    /// by the first index list.
    ///
    /// Fails with [`Error::NotAQube`] if the array being walked is ragged.
    ///
    /// ```
    /// use qube::{Array, ArrayBuilder, Cursor, DimensionSpec};
    /// let m = ArrayBuilder::from_values(&[3, 4], (0..12).map(f64::from).collect()).unwrap()
    ///     .with_property("DEPEND_1", Array::from_vec(vec![10.0, 20.0, 30.0, 40.0]))
    ///     .build();
    /// let c = Cursor::new(&m, &[DimensionSpec::singleton(1), DimensionSpec::list(vec![3, 1])]).unwrap();
    /// let out = c.create_empty().unwrap().build();
    /// assert_eq!(&out.shape().unwrap()[..], [2]);
    /// assert_eq!(out.properties().depend(0).unwrap().flat_values().unwrap(), [40.0, 20.0]);
    /// ```
    pub fn create_empty(&self) -> Result<ArrayBuilder> {
        let shape = self.array.shape()?;
        let source = self.array.properties();
        let mut properties = source.dimension_properties();
        properties.remove(names::QUBE);
        if let State::Zipped {lists, len, ..} = &self.state {
            if let Some(tags) = source.depend(0).filter(|t| t.rank() == 1) {
                properties.insert(names::DEPEND_0, subset(tags, &[DimensionSpec::IndexList(lists[0].clone())])?);
            }
            return Ok(ArrayBuilder::new(&[*len])?.with_properties(properties));
        }
        let selections: Vec<Selection> = self.specs.iter().zip(&shape).enumerate()
            .map(|(axis, (spec, &length))| Selection::new(spec, axis, length))
            .collect::<Result<_>>()?;
        let mut out_shape = Index::new();
        let mut context = context_base(source);
        for (axis, s) in selections.iter().enumerate() {
            match s {
                Selection::Dropped(i) => {
                    if let Some(tags) = source.depend(axis).filter(|t| t.rank() == 1) {
                        properties.insert(names::context(context), tags.slice(*i)?);
                        context += 1;
                    }
                }
                Selection::Kept {indices, full} => {
                    let o = out_shape.len();
                    out_shape.push(indices.len());
                    if let Some(tags) = source.depend(axis) {
                        if let Some(tags) = subset_tags(tags, axis, &selections, *full)? {
                            properties.insert(names::depend(o), tags);
                        }
                    }
                    if let Some(marker) = source.get(&names::bins(axis)) {
                        properties.insert(names::bins(o), marker.clone());
                    }
                    if let Some(descriptor) = source.bundle(axis) {
                        let descriptor = &follow_axis_0(descriptor, axis, &selections)?;
                        match (*full, descriptor.rank()) {
                            (true, _) => { properties.insert(names::bundle(o), descriptor); }
                            (false, 1) => { properties.insert(names::bundle(o), gather_descriptor(descriptor, indices)?); }
                            _ => debug!(axis, "dropping bundle descriptor of a partly selected axis"),
                        }
                    }
                }
            }
        }
        for (name, value) in source.iter() {
            match classify(name) {
                PropertyKind::Context(_) => { properties.insert(name.clone(), value.clone()); }
                PropertyKind::Correlative => match value {
                    PropertyValue::Array(a) if a.rank() == shape.len() => {
                        properties.insert(name.clone(), subset(a, &self.specs)?);
                    }
                    PropertyValue::Array(_) => {}
                    _ => { properties.insert(name.clone(), value.clone()); }
                },
                _ => {}
            }
        }
        if let Some(Selection::Kept {indices, ..}) = selections.first() {
            for (o, &r) in indices.iter().enumerate() {
                if let Some(row) = source.row(r) { *properties.row_mut(o) = row.clone(); }
            }
        }
        Ok(ArrayBuilder::new(&out_shape)?.with_properties(properties))
    }
}

impl Iterator for Cursor {
    type Item = Result<Index>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_next() { return None; }
        Some(self.step().map(|()| Index::from_slice(self.indices())))
    }
}

/// Restart the iterators of axes `from..`, returning the first axis that turns
/// out to be empty.
fn fill(
    array: &Array,
    specs: &[DimensionSpec],
    iterators: &mut [DimensionIterator],
    working: &mut Index,
    ordinals: &mut Index,
    from: usize,
) -> Result<Option<usize>> {
    for axis in from..specs.len() {
        let length = array.length_at(&working[..axis])?;
        let mut it = specs[axis].start(axis, length)?;
        let first = it.next();
        iterators[axis] = it;
        match first {
            Some(i) => { working[axis] = i; ordinals[axis] = 0; }
            None => return Ok(Some(axis)),
        }
    }
    Ok(None)
}

fn position(specs: &[DimensionSpec], working: &Index, ordinals: &Index) -> Position {
    let output = specs.iter().zip(ordinals)
        .filter(|(s, _)| !matches!(s, DimensionSpec::Singleton(_)))
        .map(|(_, &o)| o)
        .collect();
    Position {index: working.clone(), output}
}

// ----------------------------------------------------------------------------

/// A [`DimensionSpec`] resolved against one axis of a qube.
enum Selection {
    Dropped(usize),
    Kept { indices: Vec<usize>, full: bool },
}

impl Selection {
    fn new(spec: &DimensionSpec, axis: usize, length: usize) -> Result<Self> {
        let it = spec.start(axis, length)?;
        Ok(match (spec, it) {
            (_, DimensionIterator::Singleton(i)) => Selection::Dropped(i.unwrap_or(0)),
            (DimensionSpec::Range {..}, it) => {
                let indices: Vec<usize> = it.collect();
                let full = indices.len() == length;
                Selection::Kept {indices, full}
            }
            (_, it) => Selection::Kept {indices: it.collect(), full: false},
        })
    }

    fn spec(&self) -> DimensionSpec {
        match self {
            Selection::Dropped(i) => DimensionSpec::singleton(*i as i64),
            Selection::Kept {full: true, ..} => DimensionSpec::all(),
            Selection::Kept {indices, ..} => DimensionSpec::list(indices.iter().map(|&i| i as i64).collect::<Vec<_>>()),
        }
    }
}

/// The first free `CONTEXT_n` number.
fn context_base(properties: &Properties) -> usize {
    properties.names().filter_map(|name| match classify(name) {
        PropertyKind::Context(n) => Some(n + 1),
        _ => None,
    }).max().unwrap_or(0)
}

/// The tags of kept axis `axis`, restricted to the selection.
fn subset_tags(tags: &Array, axis: usize, selections: &[Selection], full: bool) -> Result<Option<Array>> {
    let this = selections[axis].spec();
    match tags.rank() {
        1 if full => Ok(Some(tags.clone())),
        1 => Ok(Some(subset(tags, &[this])?)),
        2 if tags.properties().bins(1).is_some() => Ok(Some(subset(tags, &[this])?)),
        // Tags that vary along axis 0.
        2 if axis > 0 => Ok(Some(subset(tags, &[selections[0].spec(), this])?)),
        _ => {
            debug!(axis, rank = tags.rank(), "dropping tags of unexpected rank");
            Ok(None)
        }
    }
}

/// `descriptor` of axis `axis`, with its rows restricted to the selection of
/// axis 0 if that is a different axis.
fn follow_axis_0(descriptor: &Array, axis: usize, selections: &[Selection]) -> Result<Array> {
    match &selections[0] {
        _ if axis == 0 => Ok(descriptor.clone()),
        Selection::Kept {full: true, ..} => Ok(descriptor.clone()),
        Selection::Dropped(i) => propagate::reshape_rows(descriptor, |row| propagate::slice_properties(row, *i)),
        Selection::Kept {..} => {
            let spec = selections[0].spec();
            propagate::reshape_rows(descriptor, |row| gather_row(row, &spec))
        }
    }
}

/// `row` with everything indexed by axis 0 gathered by `spec`.
fn gather_row(row: &Properties, spec: &DimensionSpec) -> Result<Properties> {
    let mut ret = row.clone();
    for (name, value) in row.iter() {
        let Some(a) = value.as_array() else { continue };
        let gathered = match classify(name) {
            PropertyKind::Structural {role: Structure::Depend, axis: 0} => a.rank() == 1,
            PropertyKind::Structural {role: Structure::Depend, ..} => propagate::is_per_row(a),
            PropertyKind::Correlative | PropertyKind::Plane(_) => a.rank() > 0,
            _ => false,
        };
        if gathered { ret.insert(name.clone(), subset(a, &[spec.clone()])?); }
    }
    Ok(ret)
}

/// A rank-1 bundle descriptor for the columns `columns` of `descriptor`.
fn gather_descriptor(descriptor: &Array, columns: &[usize]) -> Result<Array> {
    let starts: Vec<f64> = (0..columns.len()).map(|o| o as f64).collect();
    let mut builder = ArrayBuilder::from_values(&[columns.len()], starts)?;
    let properties = builder.properties_mut();
    properties.extend(descriptor.properties());
    for (o, &c) in columns.iter().enumerate() {
        let row = properties.row_mut(o);
        if let Some(r) = descriptor.properties().row(c) { *row = r.clone(); }
        row.insert(names::START_INDEX, o);
    }
    Ok(builder.build())
}

/// The sub-array of `array` chosen by `specs`, as a new dense array with
/// derived properties.
///
/// ```
/// use qube::{iter::subset, Array, DimensionSpec};
/// let a = Array::from_shape_vec(&[3, 3], (0..9).map(f64::from).collect()).unwrap();
/// let s = subset(&a, &[DimensionSpec::parse("::2").unwrap(), DimensionSpec::singleton(-1)]).unwrap();
/// assert_eq!(s.flat_values().unwrap(), [2.0, 8.0]);
/// ```
pub fn subset(array: &Array, specs: &[DimensionSpec]) -> Result<Array> {
    let mut cursor = Cursor::new(array, specs)?;
    let mut out = cursor.create_empty()?;
    while cursor.has_next() {
        cursor.step()?;
        let value = cursor.value(array)?;
        cursor.put_result(&mut out, value)?;
    }
    Ok(out.build())
}

/// `array` with axis `axis` replaced by the listed indices of it.
///
/// Fails with [`Error::NotAQube`] if `array` is ragged.
pub fn apply_index(array: &Array, axis: usize, indices: &[i64]) -> Result<Array> {
    if !array.is_qube() { return Err(Error::NotAQube); }
    if axis >= array.rank() { return Err(Error::InvalidRank {expected: array.rank(), actual: axis + 1}); }
    let mut specs: SmallVec<[DimensionSpec; 4]> = smallvec![DimensionSpec::all(); axis + 1];
    specs[axis] = DimensionSpec::list(indices.to_vec());
    subset(array, &specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Units;

    fn grid(shape: &[usize]) -> Array {
        let n = shape.iter().product::<usize>();
        Array::from_shape_vec(shape, (0..n).map(|i| i as f64).collect()).unwrap()
    }

    fn walk(array: &Array, specs: &[DimensionSpec]) -> Vec<Vec<usize>> {
        Cursor::new(array, specs).unwrap().map(|p| p.unwrap().to_vec()).collect()
    }

    #[test]
    fn full_walk_is_lexicographic() {
        let visited = walk(&grid(&[2, 3]), &[]);
        assert_eq!(visited, [[0, 0], [0, 1], [0, 2], [1, 0], [1, 1], [1, 2]]);
        assert_eq!(walk(&grid(&[2, 3, 4, 5]), &[]).len(), 120);
    }

    #[test]
    fn scalar_visits_once() {
        let mut c = Cursor::new(&Array::scalar(7.0), &[]).unwrap();
        assert!(c.has_next());
        c.step().unwrap();
        assert_eq!(c.value(&Array::scalar(7.0)).unwrap(), 7.0);
        assert!(!c.has_next());
        assert_eq!(c.step(), Err(Error::NoMoreElements));
    }

    #[test]
    fn zipped_lists() {
        let a = grid(&[4, 4]);
        let visited = walk(&a, &[DimensionSpec::list(vec![1, 2]), DimensionSpec::list(vec![0, 3])]);
        assert_eq!(visited, [[1, 0], [2, 3]]);
        assert!(matches!(
            Cursor::new(&a, &[DimensionSpec::list(vec![1, 2]), DimensionSpec::list(vec![0])]),
            Err(Error::MismatchedIndexLists {expected: 2, actual: 1}),
        ));
        let gathered = subset(&a, &[DimensionSpec::list(vec![1, 2]), DimensionSpec::list(vec![0, -1])]).unwrap();
        assert_eq!(gathered.flat_values().unwrap(), [4.0, 11.0]);
    }

    #[test]
    fn ragged_walk() {
        let ragged = Array::join(&[
            Array::from_vec(vec![1.0, 2.0]),
            Array::from_vec(vec![]),
            Array::from_vec(vec![3.0]),
        ]).unwrap();
        assert_eq!(walk(&ragged, &[]), [[0, 0], [0, 1], [2, 0]]);
        assert_eq!(ragged.flat_values().unwrap(), [1.0, 2.0, 3.0]);
        assert_eq!(walk(&ragged, &[DimensionSpec::all(), DimensionSpec::strided(-1, None, 1)]), [[0, 1], [2, 0]]);
    }

    #[test]
    fn empty_walks() {
        assert!(walk(&grid(&[0, 3]), &[]).is_empty());
        assert!(walk(&grid(&[3, 0]), &[]).is_empty());
        assert!(walk(&grid(&[4]), &[DimensionSpec::range(3, 1)]).is_empty());
        assert!(walk(&grid(&[4]), &[DimensionSpec::strided(6, None, 1)]).is_empty());
    }

    #[test]
    fn huge_steps_end_the_walk() {
        assert_eq!(walk(&grid(&[3]), &[DimensionSpec::strided(1, None, usize::MAX)]), [[1]]);
        assert_eq!(walk(&grid(&[2, 3]), &[DimensionSpec::all(), DimensionSpec::strided(0, None, usize::MAX)]), [[0, 0], [1, 0]]);
    }

    #[test]
    fn bad_specs() {
        let a = grid(&[2, 2]);
        assert!(matches!(
            Cursor::new(&a, &[DimensionSpec::all(), DimensionSpec::all(), DimensionSpec::all()]),
            Err(Error::InvalidRank {expected: 2, actual: 3}),
        ));
        assert!(matches!(
            Cursor::new(&a, &[DimensionSpec::singleton(2)]),
            Err(Error::IndexOutOfBounds {axis: 0, index: 2, length: 2}),
        ));
        assert!(matches!(
            Cursor::new(&a, &[DimensionSpec::range(0, 3)]),
            Err(Error::IndexOutOfBounds {axis: 0, index: 3, length: 2}),
        ));
        assert!(DimensionSpec::parse("a:b").is_err());
        assert!(DimensionSpec::parse("1:2:3:4").is_err());
    }

    #[test]
    fn invalid_arrays_are_refused() {
        let a = grid(&[3]).with_property(names::DEPEND_0, Array::from_vec(vec![1.0, 2.0]));
        assert!(matches!(Cursor::new(&a, &[]), Err(Error::InvalidStructure(_))));
    }

    #[test]
    fn writes_through_cursor() {
        let a = grid(&[2, 2]);
        let mut b = ArrayBuilder::new(&[2, 2]).unwrap();
        let mut c = Cursor::new(&a, &[]).unwrap();
        while c.has_next() {
            c.step().unwrap();
            let v = c.value(&a).unwrap();
            c.put_value(&mut b, v * 2.0).unwrap();
        }
        assert_eq!(b.build().flat_values().unwrap(), [0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn create_empty_derives_properties() {
        let times = Array::from_vec(vec![0.0, 1.0, 2.0, 3.0]).with_property(names::UNITS, Units::new("t2000"));
        let a = grid(&[4, 3])
            .with_property(names::UNITS, Units::new("nT"))
            .with_property(names::DEPEND_0, &times)
            .with_property(names::DEPEND_1, Array::from_vec(vec![5.0, 6.0, 7.0]))
            .with_property(names::DELTA_PLUS, grid(&[4, 3]));
        let s = subset(&a, &[DimensionSpec::range(1, 3), DimensionSpec::singleton(2)]).unwrap();
        assert_eq!(s.flat_values().unwrap(), [5.0, 8.0]);
        let p = s.properties();
        assert_eq!(p.units().unwrap().name(), "nT");
        assert_eq!(p.depend(0).unwrap().flat_values().unwrap(), [1.0, 2.0]);
        assert_eq!(p.array("CONTEXT_0").unwrap().value(&[]).unwrap(), 7.0);
        assert_eq!(p.array(names::DELTA_PLUS).unwrap().flat_values().unwrap(), [5.0, 8.0]);
        assert!(p.depend(1).is_none());
        let whole = subset(&a, &[]).unwrap();
        assert!(whole.properties().depend(0).unwrap().ptr_eq(&times));
    }

    #[test]
    fn zipped_result_keeps_axis_0_tags() {
        let a = grid(&[4, 4]).with_property(names::DEPEND_0, Array::from_vec(vec![10.0, 20.0, 30.0, 40.0]));
        let s = subset(&a, &[DimensionSpec::list(vec![1, 2]), DimensionSpec::list(vec![0, 3])]).unwrap();
        assert_eq!(s.flat_values().unwrap(), [4.0, 11.0]);
        assert_eq!(s.properties().depend(0).unwrap().flat_values().unwrap(), [20.0, 30.0]);
    }

    #[test]
    fn subset_of_a_bundle_gathers_row_tags() {
        let x = Array::from_vec(vec![1.0, 2.0, 3.0]).with_property(names::NAME, "x");
        let y = Array::from_vec(vec![4.0, 5.0, 6.0])
            .with_property(names::NAME, "y")
            .with_property(names::DEPEND_0, Array::from_vec(vec![0.5, 1.5, 2.5]));
        let b = crate::bundle(&[x, y]).unwrap();
        let s = subset(&b, &[DimensionSpec::list(vec![2, 0])]).unwrap();
        let col = crate::unbundle(&s, 1).unwrap();
        assert_eq!(col.flat_values().unwrap(), [6.0, 4.0]);
        assert_eq!(col.properties().depend(0).unwrap().flat_values().unwrap(), [2.5, 0.5]);
        let row = subset(&b, &[DimensionSpec::singleton(1)]).unwrap();
        let y1 = crate::unbundle(&row, 1).unwrap();
        assert_eq!(y1.value(&[]).unwrap(), 5.0);
        assert_eq!(y1.properties().array("CONTEXT_0").unwrap().value(&[]).unwrap(), 1.5);
    }

    #[test]
    fn apply_index_gathers_rows() {
        let a = grid(&[3, 2]).with_property(names::DEPEND_0, Array::from_vec(vec![10.0, 20.0, 30.0]));
        let g = apply_index(&a, 0, &[2, 0]).unwrap();
        assert_eq!(g.flat_values().unwrap(), [4.0, 5.0, 0.0, 1.0]);
        assert_eq!(g.properties().depend(0).unwrap().flat_values().unwrap(), [30.0, 10.0]);
        let ragged = Array::join(&[grid(&[1]), grid(&[2])]).unwrap();
        assert_eq!(apply_index(&ragged, 0, &[0]).unwrap_err(), Error::NotAQube);
    }
}
