use std::fmt;

/// Axis-aligned bounding box in the format (x, y, width, height), in frame pixels
///
#[derive(Clone, Default, Debug, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    _x: i32,
    _y: i32,
    _width: i32,
    _height: i32,
}

impl BoundingBox {
    /// Constructor
    ///
    /// # Parameters
    /// * `x`, `y` - top-left corner
    /// * `width`, `height` - box dimensions, must be non-negative
    ///
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        assert!(
            width >= 0 && height >= 0,
            "Box dimensions must be non-negative, got {width}x{height}"
        );
        Self {
            _x: x,
            _y: y,
            _width: width,
            _height: height,
        }
    }

    /// Builds the box from two inclusive corner points
    ///
    pub fn from_corners(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(left, top, right - left + 1, bottom - top + 1)
    }

    pub fn x(&self) -> i32 {
        self._x
    }

    pub fn y(&self) -> i32 {
        self._y
    }

    pub fn width(&self) -> i32 {
        self._width
    }

    pub fn height(&self) -> i32 {
        self._height
    }

    pub fn area(&self) -> i64 {
        self._width as i64 * self._height as i64
    }

    /// The center point, rounded towards the top-left corner
    ///
    pub fn center(&self) -> (i32, i32) {
        (
            saturate(self._x as i64 + self._width as i64 / 2),
            saturate(self._y as i64 + self._height as i64 / 2),
        )
    }

    pub fn as_xywh(&self) -> [i32; 4] {
        [self._x, self._y, self._width, self._height]
    }

    /// Doubled center-to-center distance along both axes.
    ///
    /// Working with doubled coordinates keeps odd widths and heights exact.
    ///
    fn center_distance_x2(l: &BoundingBox, r: &BoundingBox) -> (i64, i64) {
        let dx = 2 * (l._x as i64 - r._x as i64) + (l._width as i64 - r._width as i64);
        let dy = 2 * (l._y as i64 - r._y as i64) + (l._height as i64 - r._height as i64);
        (dx.abs(), dy.abs())
    }

    /// True when the center of one box lies within the bounds of the other one
    ///
    pub fn center_overlap(l: &BoundingBox, r: &BoundingBox) -> bool {
        let (dx, dy) = Self::center_distance_x2(l, r);
        (dx <= l._width as i64 && dy <= l._height as i64)
            || (dx <= r._width as i64 && dy <= r._height as i64)
    }

    /// AABB intersection test (touching edges count as an intersection)
    ///
    pub fn overlap(l: &BoundingBox, r: &BoundingBox) -> bool {
        let (dx, dy) = Self::center_distance_x2(l, r);
        dx <= l._width as i64 + r._width as i64 && dy <= l._height as i64 + r._height as i64
    }

    /// The smallest box containing both boxes; dimensions saturate at `i32::MAX`
    ///
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self._x.min(other._x);
        let y = self._y.min(other._y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BoundingBox::new(x, y, saturate(right - x as i64), saturate(bottom - y as i64))
    }

    fn right(&self) -> i64 {
        self._x as i64 + self._width as i64
    }

    fn bottom(&self) -> i64 {
        self._y as i64 + self._height as i64
    }

    /// Exponential moving average towards `target`, coordinate by coordinate.
    ///
    /// # Parameters
    /// * `target` - the box to move towards
    /// * `weight` - `1.0` snaps to `target`, `0.0` keeps `self`
    ///
    pub fn blend(&self, target: &BoundingBox, weight: f32) -> BoundingBox {
        let weight = weight as f64;
        let mix = |new: i32, old: i32| -> i32 {
            (weight * new as f64 + (1.0 - weight) * old as f64).round() as i32
        };
        BoundingBox::new(
            mix(target._x, self._x),
            mix(target._y, self._y),
            mix(target._width, self._width),
            mix(target._height, self._height),
        )
    }

    /// Checks that the point lies within the box grown by `margin` on every side
    ///
    pub fn contains_point_with_margin(&self, point: (i32, i32), margin: i32) -> bool {
        let (px, py, margin) = (point.0 as i64, point.1 as i64, margin as i64);
        self._x as i64 - margin <= px
            && px <= self.right() + margin
            && self._y as i64 - margin <= py
            && py <= self.bottom() + margin
    }
}

#[inline]
fn saturate(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{};w={},h={})",
            self._x, self._y, self._width, self._height
        )
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from(v: [i32; 4]) -> Self {
        BoundingBox::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        b.as_xywh()
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::bbox::BoundingBox;

    #[test]
    fn center_overlap_is_symmetric() {
        let big = BoundingBox::new(0, 0, 100, 100);
        let small = BoundingBox::new(80, 80, 10, 10);
        // the center of `small` is inside `big`, the center of `big` is not inside `small`
        assert!(BoundingBox::center_overlap(&big, &small));
        assert!(BoundingBox::center_overlap(&small, &big));

        let far = BoundingBox::new(95, 95, 100, 100);
        assert!(!BoundingBox::center_overlap(&big, &far));
        assert!(!BoundingBox::center_overlap(&far, &big));
    }

    #[test]
    fn center_overlap_on_edges() {
        let a = BoundingBox::new(0, 0, 10, 10);
        // center of b is (10, 5) - on the right edge of a
        let b = BoundingBox::new(8, 3, 4, 4);
        assert!(BoundingBox::center_overlap(&a, &b));
        let c = BoundingBox::new(9, 3, 4, 4);
        assert!(!BoundingBox::center_overlap(&a, &c));
    }

    #[test]
    fn full_overlap() {
        let a = BoundingBox::new(0, 0, 10, 10);
        assert!(BoundingBox::overlap(&a, &BoundingBox::new(5, 5, 10, 10)));
        assert!(BoundingBox::overlap(&a, &BoundingBox::new(10, 0, 10, 10)));
        assert!(!BoundingBox::overlap(&a, &BoundingBox::new(11, 0, 10, 10)));
        assert!(!BoundingBox::overlap(&a, &BoundingBox::new(0, -21, 10, 20)));
        // overlapping boxes may not overlap by centers
        let b = BoundingBox::new(8, 8, 10, 10);
        assert!(BoundingBox::overlap(&a, &b));
        assert!(!BoundingBox::center_overlap(&a, &b));
    }

    #[test]
    fn union() {
        let a = BoundingBox::new(10, 20, 10, 10);
        let b = BoundingBox::new(0, 25, 5, 30);
        assert_eq!(a.union(&b), BoundingBox::new(0, 20, 20, 35));
        assert_eq!(a.union(&a), a);
    }

    #[test]
    fn blend() {
        let old = BoundingBox::new(0, 0, 10, 10);
        let new = BoundingBox::new(10, 20, 30, 11);
        assert_eq!(old.blend(&new, 1.0), new);
        assert_eq!(old.blend(&new, 0.0), old);
        assert_eq!(old.blend(&new, 0.5), BoundingBox::new(5, 10, 20, 11));
        assert_eq!(old.blend(&new, 0.25), BoundingBox::new(3, 5, 15, 10));
    }

    #[test]
    fn point_with_margin() {
        let b = BoundingBox::new(100, 100, 20, 20);
        assert!(b.contains_point_with_margin((110, 110), 0));
        assert!(!b.contains_point_with_margin((90, 110), 0));
        assert!(b.contains_point_with_margin((90, 110), 10));
        assert!(!b.contains_point_with_margin((169, 110), 48));
    }

    #[test]
    fn extreme_coordinates() {
        let a = BoundingBox::new(i32::MAX - 10, 0, 50, 50);
        let b = BoundingBox::new(i32::MAX - 5, 0, 50, 50);
        assert_eq!(a.union(&b), BoundingBox::new(i32::MAX - 10, 0, 55, 50));
        assert!(BoundingBox::center_overlap(&a, &b));
        assert!(BoundingBox::overlap(&a, &b));
        assert_eq!(a.center(), (i32::MAX, 25));
        assert!(a.contains_point_with_margin((i32::MAX, 10), i32::MAX));

        let wide = BoundingBox::new(i32::MIN, i32::MIN, 10, 10)
            .union(&BoundingBox::new(i32::MAX - 10, i32::MAX - 10, 10, 10));
        assert_eq!(wide.width(), i32::MAX);
        assert_eq!(wide.height(), i32::MAX);
    }

    #[test]
    #[should_panic]
    fn negative_dimensions() {
        BoundingBox::new(0, 0, -1, 10);
    }
}
