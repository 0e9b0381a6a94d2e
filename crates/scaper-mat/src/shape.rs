//! The four broadcast shapes.

/// The logical shape of a [`Mat`](crate::Mat).
///
/// The zone count is carried inside the non-scalar variants so that shape
/// agreement between two mats is a single equality check.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Shape {
    /// A single value, broadcastable to any shape.
    Scalar,
    /// `1 × n`, keyed by destination zone.
    Row(usize),
    /// `n × 1`, keyed by origin zone.
    Col(usize),
    /// `n × n`, origin-major.
    Full(usize),
}

impl Shape {
    /// Number of data cells for this shape.
    #[inline]
    pub fn len(self) -> usize {
        match self {
            Shape::Scalar => 1,
            Shape::Row(n) | Shape::Col(n) => n,
            Shape::Full(n) => n * n,
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Zone count along the non-trivial axes (1 for scalars).
    #[inline]
    pub fn zones(self) -> usize {
        match self {
            Shape::Scalar => 1,
            Shape::Row(n) | Shape::Col(n) | Shape::Full(n) => n,
        }
    }

    /// The shape of an origin-set × destination-set combination.
    ///
    /// `origins`/`dests` are the sizes of the two axes; an axis of size 1 is
    /// collapsed.  This is how decision matrices derive their shape from
    /// whether the state's location and the decision's destination carry the
    /// all-zones wildcard.
    pub fn for_axes(origins: usize, dests: usize) -> Shape {
        match (origins > 1, dests > 1) {
            (false, false) => Shape::Scalar,
            (false, true)  => Shape::Row(dests),
            (true, false)  => Shape::Col(origins),
            (true, true)   => {
                assert_eq!(origins, dests, "shape mismatch: {origins} origins vs {dests} dests");
                Shape::Full(origins)
            }
        }
    }
}
