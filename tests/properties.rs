use qube::{bundle, names, unbundle, unbundle_by_name, Array, Cursor, DimensionSpec, Units};

fn ramp(shape: &[usize]) -> Array {
    let n = shape.iter().product::<usize>();
    Array::from_shape_vec(shape, (0..n).map(|x| x as f64).collect()).unwrap()
}

fn walk(array: &Array, specs: &[DimensionSpec]) -> Vec<Vec<usize>> {
    Cursor::new(array, specs).unwrap().map(|p| p.unwrap().to_vec()).collect()
}

#[test]
fn slice_drops_one_axis() {
    let shapes: [&[usize]; 4] = [&[5], &[3, 4], &[2, 3, 4], &[2, 2, 3, 2]];
    for shape in shapes {
        let a = ramp(shape);
        for i in 0..shape[0] {
            assert_eq!(a.slice(i).unwrap().rank(), a.rank() - 1);
        }
    }
}

#[test]
fn trim_keeps_the_rank() {
    let a = ramp(&[6, 2]);
    for start in 0..=6 {
        for end in start..=6 {
            let t = a.trim(start, end).unwrap();
            assert_eq!(t.length().unwrap(), end - start);
            assert_eq!(t.rank(), 2);
        }
    }
    assert!(a.trim(0, 6).unwrap().ptr_eq(&a));
    let joined = Array::join(&[ramp(&[1]), ramp(&[3])]).unwrap();
    assert!(joined.trim(0, 2).unwrap().ptr_eq(&joined));
}

#[test]
fn full_walk_is_lexicographic() {
    let a = ramp(&[2, 3, 4]);
    let mut expected = Vec::new();
    for i in 0..2 {
        for j in 0..3 {
            for k in 0..4 { expected.push(vec![i, j, k]); }
        }
    }
    assert_eq!(walk(&a, &vec![DimensionSpec::all(); 3]), expected);
}

#[test]
fn bundles_come_apart_again() {
    let x = Array::from_vec(vec![1.0, 2.0]).with_property(names::NAME, "X");
    let y = ramp(&[2, 3]).with_property(names::NAME, "Y");
    let z = Array::from_vec(vec![5.0, 6.0]).with_property(names::NAME, "Z");
    let b = bundle(&[x.clone(), y.clone(), z.clone()]).unwrap();
    for (i, (source, name)) in [(&x, "X"), (&y, "Y"), (&z, "Z")].into_iter().enumerate() {
        assert_eq!(&unbundle(&b, i).unwrap(), source);
        assert_eq!(&unbundle_by_name(&b, name).unwrap(), source);
    }
}

#[test]
fn slice_renames_axis_tags() {
    let tags = Array::from_vec(vec![10.0, 20.0, 30.0, 40.0]);
    let m = ramp(&[3, 4])
        .with_property(names::DEPEND_1, &tags)
        .with_property(names::UNITS, Units::new("nT"))
        .with_property(names::TITLE, "Magnetic field")
        .with_property(names::LABEL, "B");
    let row = m.slice(1).unwrap();
    assert_eq!(row.rank(), 1);
    assert_eq!(row.length().unwrap(), 4);
    assert_eq!(row.properties().depend(0).unwrap().flat_values().unwrap(), [10.0, 20.0, 30.0, 40.0]);
    assert!(row.properties().depend(1).is_none());
    assert_eq!(row.units().unwrap().name(), "nT");
    assert_eq!(row.properties().str(names::TITLE), Some("Magnetic field"));
    assert_eq!(row.properties().str(names::LABEL), Some("B"));
}

#[test]
fn trim_clears_the_typical_range() {
    let a = ramp(&[5])
        .with_property(names::TYPICAL_MIN, 0.0)
        .with_property(names::TYPICAL_MAX, 4.0)
        .with_property(names::UNITS, Units::new("eV"))
        .with_property(names::FORMAT, "%5.1f");
    let t = a.trim(1, 3).unwrap();
    assert!(t.property(names::TYPICAL_MIN).is_none());
    assert!(t.property(names::TYPICAL_MAX).is_none());
    assert_eq!(t.units().unwrap().name(), "eV");
    assert_eq!(t.properties().str(names::FORMAT), Some("%5.1f"));
}

#[test]
fn index_lists_and_ranges() {
    let a = ramp(&[4, 2]);
    let specs = [DimensionSpec::list(vec![2, 0, 3]), DimensionSpec::range(0, 2)];
    assert_eq!(walk(&a, &specs), [[2, 0], [2, 1], [0, 0], [0, 1], [3, 0], [3, 1]]);
}

#[test]
fn zipped_lists() {
    let a = ramp(&[4, 4]);
    let specs = [DimensionSpec::list(vec![1, 2]), DimensionSpec::list(vec![0, 3])];
    assert_eq!(walk(&a, &specs), [[1, 0], [2, 3]]);
}

#[test]
fn join_then_slice_restores_element_properties() {
    let a = Array::from_vec(vec![1.0]).with_property(names::NAME, "first");
    let b = Array::from_vec(vec![2.0, 3.0]).with_property(names::NAME, "second");
    let joined = Array::join(&[a, b]).unwrap();
    assert!(!joined.is_qube());
    assert_eq!(joined.length_at(&[1]).unwrap(), 2);
    assert_eq!(joined.slice(1).unwrap().properties().str(names::NAME), Some("second"));
    assert!(joined.shape().is_err());
}
