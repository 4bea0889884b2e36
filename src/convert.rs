//! Conversion protocol - host values to foreign values
//!
//! [`ToForeign`] is the open customization point: a host type is convertible
//! exactly when an impl exists, so unsupported types fail at compile time.
//! Conversion never consumes or mutates the host value, and every failing
//! conversion fires the failure observer exactly once before returning
//! `Err`.
//!
//! Built-in coverage: booleans, signed and unsigned integers, floats, string
//! kinds, handle pass-through, `Option` (maps to the foreign `None`), 1-D
//! sequences, and the [`ImageLike`]/[`PointLike`] structural categories for
//! 2-D data.

use std::borrow::Cow;

use crate::error::{FailureKind, Result};
use crate::object::Object;
use crate::runtime::Runtime;

/// A host value that can be marshaled into the foreign runtime.
///
/// Implement this for new host types to extend the binding layer; the core
/// never needs to change.
pub trait ToForeign {
    /// Produce an owning handle to a freshly created foreign value.
    fn to_foreign(&self, rt: &Runtime) -> Result<Object>;
}

// Scalars -------------------------------------------------------------------

impl ToForeign for bool {
    fn to_foreign(&self, rt: &Runtime) -> Result<Object> {
        rt.own_or_report(rt.backend().make_bool(*self), FailureKind::Conversion, "bool")
    }
}

macro_rules! signed_to_foreign {
    ($($ty:ty),+) => {$(
        impl ToForeign for $ty {
            fn to_foreign(&self, rt: &Runtime) -> Result<Object> {
                rt.own_or_report(
                    rt.backend().make_int(i64::from(*self)),
                    FailureKind::Conversion,
                    stringify!($ty),
                )
            }
        }
    )+};
}

signed_to_foreign!(i8, i16, i32, i64);

impl ToForeign for isize {
    fn to_foreign(&self, rt: &Runtime) -> Result<Object> {
        rt.own_or_report(
            rt.backend().make_int(*self as i64),
            FailureKind::Conversion,
            "isize",
        )
    }
}

macro_rules! unsigned_to_foreign {
    ($($ty:ty),+) => {$(
        impl ToForeign for $ty {
            fn to_foreign(&self, rt: &Runtime) -> Result<Object> {
                rt.own_or_report(
                    rt.backend().make_uint(u64::from(*self)),
                    FailureKind::Conversion,
                    stringify!($ty),
                )
            }
        }
    )+};
}

unsigned_to_foreign!(u8, u16, u32, u64);

impl ToForeign for usize {
    fn to_foreign(&self, rt: &Runtime) -> Result<Object> {
        rt.own_or_report(
            rt.backend().make_uint(*self as u64),
            FailureKind::Conversion,
            "usize",
        )
    }
}

impl ToForeign for f32 {
    fn to_foreign(&self, rt: &Runtime) -> Result<Object> {
        rt.own_or_report(
            rt.backend().make_float(f64::from(*self)),
            FailureKind::Conversion,
            "f32",
        )
    }
}

impl ToForeign for f64 {
    fn to_foreign(&self, rt: &Runtime) -> Result<Object> {
        rt.own_or_report(rt.backend().make_float(*self), FailureKind::Conversion, "f64")
    }
}

// Strings -------------------------------------------------------------------

impl ToForeign for str {
    fn to_foreign(&self, rt: &Runtime) -> Result<Object> {
        rt.own_or_report(rt.backend().make_str(self), FailureKind::Conversion, "str")
    }
}

impl ToForeign for String {
    fn to_foreign(&self, rt: &Runtime) -> Result<Object> {
        self.as_str().to_foreign(rt)
    }
}

impl ToForeign for Cow<'_, str> {
    fn to_foreign(&self, rt: &Runtime) -> Result<Object> {
        self.as_ref().to_foreign(rt)
    }
}

// Pass-through and references ----------------------------------------------

impl ToForeign for Object {
    /// Pass-through: the handle is shared (one increment), never rebuilt.
    fn to_foreign(&self, _rt: &Runtime) -> Result<Object> {
        Ok(self.clone())
    }
}

impl<T: ToForeign + ?Sized> ToForeign for &T {
    fn to_foreign(&self, rt: &Runtime) -> Result<Object> {
        (**self).to_foreign(rt)
    }
}

impl<T: ToForeign> ToForeign for Option<T> {
    /// `None` maps to the foreign unit value.
    fn to_foreign(&self, rt: &Runtime) -> Result<Object> {
        match self {
            Some(value) => value.to_foreign(rt),
            None => rt.own_or_report(rt.backend().none(), FailureKind::Conversion, "None"),
        }
    }
}

// Sequences -----------------------------------------------------------------

/// Build a foreign list sized to the input, converting each element
/// recursively and inserting in iteration order.
pub fn sequence_to_foreign<T: ToForeign>(rt: &Runtime, items: &[T]) -> Result<Object> {
    let list = rt.own_or_report(
        rt.backend().make_list(items.len()),
        FailureKind::Conversion,
        "sequence",
    )?;
    for (index, item) in items.iter().enumerate() {
        let value = item.to_foreign(rt)?;
        // Insertion steals the freshly created reference.
        if !rt.backend().list_set(list.raw(), index, value.release()) {
            return Err(rt.report_failure(FailureKind::Conversion, "sequence element"));
        }
    }
    Ok(list)
}

impl<T: ToForeign> ToForeign for [T] {
    fn to_foreign(&self, rt: &Runtime) -> Result<Object> {
        sequence_to_foreign(rt, self)
    }
}

impl<T: ToForeign> ToForeign for Vec<T> {
    fn to_foreign(&self, rt: &Runtime) -> Result<Object> {
        sequence_to_foreign(rt, self.as_slice())
    }
}

impl<T: ToForeign, const N: usize> ToForeign for [T; N] {
    fn to_foreign(&self, rt: &Runtime) -> Result<Object> {
        sequence_to_foreign(rt, self.as_slice())
    }
}

// 2-D structural categories -------------------------------------------------

/// A host aggregate usable as a 2-D row-major grid: a size query plus an
/// indexed accessor. No inheritance required: implementing the trait is
/// what makes a type image-like.
pub trait ImageLike {
    type Pixel: ToForeign;

    /// `(rows, cols)`, or `None` when the aggregate cannot report a
    /// consistent rectangular shape (e.g. ragged rows).
    fn size(&self) -> Option<(usize, usize)>;

    /// Value at `(row, col)`; only called within the reported size.
    fn at(&self, row: usize, col: usize) -> &Self::Pixel;
}

impl<T: ToForeign> ImageLike for Vec<Vec<T>> {
    type Pixel = T;

    fn size(&self) -> Option<(usize, usize)> {
        let rows = self.len();
        if rows == 0 {
            return Some((0, 0));
        }
        let cols = self[0].len();
        if self.iter().all(|row| row.len() == cols) {
            Some((rows, cols))
        } else {
            None
        }
    }

    fn at(&self, row: usize, col: usize) -> &T {
        &self[row][col]
    }
}

/// Convert an image-like aggregate to a foreign list of row lists, row-major
/// with identical ordering. Ragged input is rejected here, before anything
/// crosses the boundary.
pub fn image_to_foreign<I: ImageLike + ?Sized>(rt: &Runtime, image: &I) -> Result<Object> {
    let (rows, cols) = match image.size() {
        Some(size) => size,
        None => return Err(rt.report_failure(FailureKind::Conversion, "ragged 2-D image")),
    };
    let grid = rt.own_or_report(
        rt.backend().make_list(rows),
        FailureKind::Conversion,
        "image rows",
    )?;
    for row in 0..rows {
        let line = rt.own_or_report(
            rt.backend().make_list(cols),
            FailureKind::Conversion,
            "image row",
        )?;
        for col in 0..cols {
            let value = image.at(row, col).to_foreign(rt)?;
            if !rt.backend().list_set(line.raw(), col, value.release()) {
                return Err(rt.report_failure(FailureKind::Conversion, "image pixel"));
            }
        }
        if !rt.backend().list_set(grid.raw(), row, line.release()) {
            return Err(rt.report_failure(FailureKind::Conversion, "image row"));
        }
    }
    Ok(grid)
}

/// Coordinate axis of a point-like value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// A host aggregate with per-axis coordinate access. Point sequences are not
/// converted wholesale; call sites decompose them into parallel coordinate
/// lists with [`split_points`].
pub trait PointLike {
    type Coord: ToForeign;

    fn coord(&self, axis: Axis) -> &Self::Coord;
}

impl<T: ToForeign> PointLike for (T, T) {
    type Coord = T;

    fn coord(&self, axis: Axis) -> &T {
        match axis {
            Axis::X => &self.0,
            Axis::Y => &self.1,
        }
    }
}

impl<T: ToForeign> PointLike for [T; 2] {
    type Coord = T;

    fn coord(&self, axis: Axis) -> &T {
        match axis {
            Axis::X => &self[0],
            Axis::Y => &self[1],
        }
    }
}

/// Decompose a point sequence into two parallel foreign coordinate lists,
/// `(xs, ys)`, preserving order.
pub fn split_points<P: PointLike>(rt: &Runtime, points: &[P]) -> Result<(Object, Object)> {
    let xs = rt.own_or_report(
        rt.backend().make_list(points.len()),
        FailureKind::Conversion,
        "x coordinates",
    )?;
    let ys = rt.own_or_report(
        rt.backend().make_list(points.len()),
        FailureKind::Conversion,
        "y coordinates",
    )?;
    for (index, point) in points.iter().enumerate() {
        let x = point.coord(Axis::X).to_foreign(rt)?;
        let y = point.coord(Axis::Y).to_foreign(rt)?;
        if !rt.backend().list_set(xs.raw(), index, x.release())
            || !rt.backend().list_set(ys.raw(), index, y.release())
        {
            return Err(rt.report_failure(FailureKind::Conversion, "coordinate"));
        }
    }
    Ok((xs, ys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn runtime() -> (MockRuntime, Runtime) {
        let mock = MockRuntime::new();
        (mock.clone(), Runtime::new(mock))
    }

    #[test]
    fn test_scalar_round_trips() {
        let (_, rt) = runtime();
        assert_eq!(42i64.to_foreign(&rt).unwrap().to_i64(), Some(42));
        assert_eq!(7u32.to_foreign(&rt).unwrap().to_i64(), Some(7));
        assert_eq!(true.to_foreign(&rt).unwrap().to_i64(), Some(1));
        assert_eq!(2.5f64.to_foreign(&rt).unwrap().to_f64(), Some(2.5));
        assert_eq!(
            "abc".to_foreign(&rt).unwrap().to_text().as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_sequence_preserves_order() {
        let (_, rt) = runtime();
        let list = vec![3i64, 1, 2].to_foreign(&rt).unwrap();
        assert_eq!(list.seq_len(), Some(3));
        assert_eq!(list.item(0).unwrap().to_i64(), Some(3));
        assert_eq!(list.item(1).unwrap().to_i64(), Some(1));
        assert_eq!(list.item(2).unwrap().to_i64(), Some(2));
    }

    #[test]
    fn test_sequence_conversion_leaves_no_leak() {
        let (mock, rt) = runtime();
        let baseline = mock.live_objects();
        {
            let _list = [1.0f64, 2.0, 3.0].to_foreign(&rt).unwrap();
        }
        assert_eq!(mock.live_objects(), baseline);
    }

    #[test]
    fn test_image_row_major() {
        let (_, rt) = runtime();
        let image = vec![vec![1i64, 2, 3], vec![4, 5, 6]];
        let grid = image_to_foreign(&rt, &image).unwrap();
        assert_eq!(grid.seq_len(), Some(2));
        for (i, row) in image.iter().enumerate() {
            let line = grid.item(i).unwrap();
            assert_eq!(line.seq_len(), Some(3));
            for (j, value) in row.iter().enumerate() {
                assert_eq!(line.item(j).unwrap().to_i64(), Some(*value));
            }
        }
    }

    #[test]
    fn test_ragged_image_rejected() {
        let (_, rt) = runtime();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let _guard = rt.scoped_observer(Arc::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        let ragged = vec![vec![1i64, 2], vec![3]];
        assert!(image_to_foreign(&rt, &ragged).is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsigned_overflow_reports_conversion_failure() {
        let (_, rt) = runtime();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let _guard = rt.scoped_observer(Arc::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        let err = u64::MAX.to_foreign(&rt).unwrap_err();
        assert!(err.diagnostic().unwrap().contains("OverflowError"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_option_maps_to_none() {
        let (mock, rt) = runtime();
        let none: Option<bool> = None;
        let obj = none.to_foreign(&rt).unwrap();
        assert!(!obj.truthy());
        assert!(mock.is_live(obj.raw()));
    }

    #[test]
    fn test_split_points() {
        let (_, rt) = runtime();
        let points = [(0.0f64, 1.0f64), (2.0, 3.0)];
        let (xs, ys) = split_points(&rt, &points).unwrap();
        assert_eq!(xs.item(1).unwrap().to_f64(), Some(2.0));
        assert_eq!(ys.item(0).unwrap().to_f64(), Some(1.0));
    }
}
