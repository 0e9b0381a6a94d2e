//! The `Mat` type and its broadcast arithmetic.

use std::borrow::Cow;

use crate::Shape;

/// A broadcast-shaped array with a lazy scalar factor.
///
/// The logical value of every cell is `scale · data[i]`.  LOS queries return
/// mats that *borrow* the immutable network tensors (with `scale` carrying
/// the peak-blending weight); accumulators rented from a
/// [`MatPool`](crate::MatPool) own their buffers.
///
/// # Broadcast rules (`add_scaled`)
///
/// | accumulator | part   | effect                          |
/// |-------------|--------|---------------------------------|
/// | any         | Scalar | added to every cell             |
/// | S           | S      | elementwise                     |
/// | Full        | Row    | added to every row              |
/// | Full        | Col    | added down every column         |
/// | Row         | Col    | panic (incompatible axes)       |
/// | Col         | Row    | panic (incompatible axes)       |
/// | Scalar      | non-Scalar | panic                       |
#[derive(Clone, Debug)]
pub struct Mat<'a> {
    pub scale: f64,
    shape: Shape,
    data: Cow<'a, [f64]>,
}

impl<'a> Mat<'a> {
    // ── Constructors ──────────────────────────────────────────────────────

    /// An owned, zero-filled mat with `scale = 1`.
    pub fn zeros(shape: Shape) -> Mat<'static> {
        Mat {
            scale: 1.0,
            shape,
            data: Cow::Owned(vec![0.0; shape.len()]),
        }
    }

    /// An owned scalar.
    pub fn scalar(value: f64) -> Mat<'static> {
        Mat {
            scale: 1.0,
            shape: Shape::Scalar,
            data: Cow::Owned(vec![value]),
        }
    }

    /// A mat borrowing `data` (typically a slice of a LOS tensor).
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != shape.len()`.
    pub fn borrowed(scale: f64, shape: Shape, data: &'a [f64]) -> Mat<'a> {
        assert_eq!(data.len(), shape.len(), "shape mismatch: {} cells for {shape:?}", data.len());
        Mat { scale, shape, data: Cow::Borrowed(data) }
    }

    /// An owned mat taking over `buf` (typically from a pool).
    pub fn from_buffer(scale: f64, shape: Shape, buf: Vec<f64>) -> Mat<'static> {
        assert_eq!(buf.len(), shape.len(), "shape mismatch: {} cells for {shape:?}", buf.len());
        Mat { scale, shape, data: Cow::Owned(buf) }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Raw cell data, without the scale applied.
    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable cell data.  Clones borrowed data into an owned buffer first
    /// (copy-on-write); accumulators are always owned so this is free on the
    /// hot path.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [f64] {
        self.data.to_mut()
    }

    /// The scaled value of cell `(o, d)`.  Axes of size 1 accept any index.
    pub fn value(&self, o: usize, d: usize) -> f64 {
        let raw = match self.shape {
            Shape::Scalar  => self.data[0],
            Shape::Row(_)  => self.data[d],
            Shape::Col(_)  => self.data[o],
            Shape::Full(n) => self.data[o * n + d],
        };
        self.scale * raw
    }

    /// Scaled sum over all cells.
    pub fn sum(&self) -> f64 {
        self.scale * self.data.iter().sum::<f64>()
    }

    /// Consume the mat, recovering its owned buffer (for pool return).
    /// Returns `None` if the data was borrowed.
    pub fn into_buffer(self) -> Option<Vec<f64>> {
        match self.data {
            Cow::Owned(v) => Some(v),
            Cow::Borrowed(_) => None,
        }
    }

    // ── Scale handling ────────────────────────────────────────────────────

    /// Multiply the logical value by `k` (O(1): only the scale moves).
    #[inline]
    pub fn scale_by(&mut self, k: f64) {
        self.scale *= k;
    }

    /// Fold the scale factor into the data so `scale == 1`.
    pub fn materialize_scale(&mut self) {
        if self.scale != 1.0 {
            let s = self.scale;
            for v in self.data.to_mut() {
                *v *= s;
            }
            self.scale = 1.0;
        }
    }

    // ── Elementwise ops ───────────────────────────────────────────────────

    /// Elementwise natural log of the logical value.  `ln(0) = −∞` falls out
    /// of IEEE semantics, which is exactly what the logsum needs when every
    /// option of a state is infeasible.
    pub fn log_inplace(&mut self) {
        self.materialize_scale();
        for v in self.data.to_mut() {
            *v = v.ln();
        }
    }

    /// Elementwise exponential of the logical value.
    pub fn exp_inplace(&mut self) {
        self.materialize_scale();
        for v in self.data.to_mut() {
            *v = v.exp();
        }
    }

    // ── Broadcast add ─────────────────────────────────────────────────────

    /// `self += k · part`, broadcasting `part` to `self`'s shape.
    ///
    /// The part's own scale is respected; the accumulator's scale is
    /// materialized first so the addition is plain.
    pub fn add_scaled(&mut self, part: &Mat<'_>, k: f64) {
        self.materialize_scale();
        let f = k * part.scale;
        if f == 0.0 {
            return;
        }
        let shape = self.shape;
        match (shape, part.shape) {
            // Scalar part broadcasts to anything.
            (_, Shape::Scalar) => {
                let v = f * part.data[0];
                for cell in self.data.to_mut() {
                    *cell += v;
                }
            }
            // Same shape: elementwise.
            (a, b) if a == b => {
                for (cell, &v) in self.data.to_mut().iter_mut().zip(part.data.iter()) {
                    *cell += f * v;
                }
            }
            // Row added to every row of a full matrix.
            (Shape::Full(n), Shape::Row(m)) if n == m => {
                for row in self.data.to_mut().chunks_exact_mut(n) {
                    for (cell, &v) in row.iter_mut().zip(part.data.iter()) {
                        *cell += f * v;
                    }
                }
            }
            // Column added down every column of a full matrix.
            (Shape::Full(n), Shape::Col(m)) if n == m => {
                for (row, &v) in self.data.to_mut().chunks_exact_mut(n).zip(part.data.iter()) {
                    let add = f * v;
                    for cell in row {
                        *cell += add;
                    }
                }
            }
            (a, b) => panic!("shape mismatch: cannot add {b:?} into {a:?}"),
        }
    }

    /// `self += part` (broadcast).
    #[inline]
    pub fn add_assign(&mut self, part: &Mat<'_>) {
        self.add_scaled(part, 1.0);
    }

    /// Fold a sequence of parts into `self`.
    pub fn add_parts<'b, 'c: 'b>(&mut self, parts: impl IntoIterator<Item = &'b Mat<'c>>) {
        for p in parts {
            self.add_assign(p);
        }
    }

    // ── Reductions ────────────────────────────────────────────────────────

    /// Accumulate `part`, summed over its destination axis, into `self`.
    ///
    /// This is the Φ-option reduction: the accumulator is keyed by the
    /// state's own zone axis (Scalar for a fixed location, Col for the
    /// all-zones wildcard) and each option's exponentiated utilities are
    /// summed over their destinations.
    pub fn add_dest_sums(&mut self, part: &Mat<'_>) {
        self.materialize_scale();
        let f = part.scale;
        match (self.shape, part.shape) {
            (Shape::Scalar, Shape::Scalar) => {
                self.data.to_mut()[0] += f * part.data[0];
            }
            (Shape::Scalar, Shape::Row(_)) => {
                self.data.to_mut()[0] += f * part.data.iter().sum::<f64>();
            }
            (Shape::Col(n), Shape::Scalar) => {
                debug_assert!(n > 0);
                let v = f * part.data[0];
                for cell in self.data.to_mut() {
                    *cell += v;
                }
            }
            (Shape::Col(n), Shape::Col(m)) if n == m => {
                for (cell, &v) in self.data.to_mut().iter_mut().zip(part.data.iter()) {
                    *cell += f * v;
                }
            }
            (Shape::Col(n), Shape::Full(m)) if n == m => {
                for (cell, row) in self.data.to_mut().iter_mut().zip(part.data.chunks_exact(n)) {
                    *cell += f * row.iter().sum::<f64>();
                }
            }
            (a, b) => panic!("shape mismatch: cannot reduce {b:?} into {a:?}"),
        }
    }

    /// Per row of a full matrix, divide by the corresponding entry of a
    /// column vector; rows whose denominator is ≤ 0 are left unchanged.
    pub fn divide_rows_ignore_zero(&mut self, denominator: &Mat<'_>) {
        self.materialize_scale();
        let (Shape::Full(n), Shape::Col(m)) = (self.shape, denominator.shape) else {
            panic!(
                "shape mismatch: divide_rows needs Full/Col, got {:?}/{:?}",
                self.shape, denominator.shape
            );
        };
        assert_eq!(n, m, "shape mismatch: {n} rows vs {m} denominators");
        for (row, &d) in self.data.to_mut().chunks_exact_mut(n).zip(denominator.data.iter()) {
            let den = denominator.scale * d;
            if den > 0.0 {
                for cell in row {
                    *cell /= den;
                }
            }
        }
    }
}
