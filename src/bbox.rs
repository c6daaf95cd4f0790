use std::marker::PhantomData;

pub trait BBoxFormat: std::fmt::Debug {}

/// X-y-aspect_ratio-height format, contains coordinates of the center of bbox and aspect_ratio-height
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Xyah;
impl BBoxFormat for Xyah {}

/// Left-top-right-bottom format, contains left top and right bottom corners
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BBox<F: BBoxFormat>([f32; 4], PhantomData<F>);

impl<F: BBoxFormat> From<BBox<F>> for [f32; 4] {
    fn from(bbox: BBox<F>) -> Self {
        bbox.0
    }
}

impl<F: BBoxFormat> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[f32; 4] {
        &self.0
    }
}

impl BBox<Xyah> {
    #[inline]
    pub fn xyah(cx: f32, cy: f32, aspect_ratio: f32, height: f32) -> Self {
        BBox([cx, cy, aspect_ratio, height], PhantomData)
    }

    #[inline(always)]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }

    #[inline(always)]
    pub fn cx(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn cy(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn aspect_ratio(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2] * self.0[3]
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        BBox([left, top, right, bottom], PhantomData)
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.0[3]
    }

    #[inline]
    pub fn width(&self) -> f32 {
        (self.right() - self.left()).max(0.0)
    }

    #[inline]
    pub fn height(&self) -> f32 {
        (self.bottom() - self.top()).max(0.0)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.area() <= 0.0
    }

    pub fn intersection(&self, other: &BBox<Ltrb>) -> BBox<Ltrb> {
        BBox::ltrb(
            self.left().max(other.left()),
            self.top().max(other.top()),
            self.right().min(other.right()),
            self.bottom().min(other.bottom()),
        )
    }

    /// Intersection over union, 0 for disjoint or empty boxes.
    pub fn iou(&self, other: &BBox<Ltrb>) -> f32 {
        let i_area = self.intersection(other).area();
        let u_area = self.area() + other.area() - i_area;

        if u_area <= 0.0 {
            return 0.0;
        }

        i_area / u_area
    }
}

impl<'a> From<&'a BBox<Xyah>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Xyah>) -> Self {
        let half_w = v.width() / 2.0;
        let half_h = v.height() / 2.0;

        BBox::ltrb(
            v.cx() - half_w,
            v.cy() - half_h,
            v.cx() + half_w,
            v.cy() + half_h,
        )
    }
}

impl<'a> From<&'a BBox<Ltrb>> for BBox<Xyah> {
    #[inline]
    fn from(v: &'a BBox<Ltrb>) -> Self {
        let (w, h) = (v.width(), v.height());
        let aspect_ratio = if h > 0.0 { w / h } else { 0.0 };

        BBox::xyah(v.left() + w / 2.0, v.top() + h / 2.0, aspect_ratio, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn xyah_to_ltrb_keeps_center() {
        let b = BBox::xyah(10.0, 20.0, 0.5, 8.0).as_ltrb();

        assert_abs_diff_eq!(b.left(), 8.0);
        assert_abs_diff_eq!(b.right(), 12.0);
        assert_abs_diff_eq!(b.top(), 16.0);
        assert_abs_diff_eq!(b.bottom(), 24.0);

        let back: BBox<Xyah> = (&b).into();
        assert_abs_diff_eq!(back.cx(), 10.0);
        assert_abs_diff_eq!(back.cy(), 20.0);
        assert_abs_diff_eq!(back.aspect_ratio(), 0.5);
    }

    #[test]
    fn iou_of_shifted_boxes() {
        let a = BBox::ltrb(0.0, 0.0, 10.0, 10.0);
        let b = BBox::ltrb(5.0, 0.0, 15.0, 10.0);
        let c = BBox::ltrb(20.0, 20.0, 30.0, 30.0);

        assert_abs_diff_eq!(a.iou(&a), 1.0);
        assert_abs_diff_eq!(a.iou(&b), 50.0 / 150.0, epsilon = 1e-6);
        assert_abs_diff_eq!(a.iou(&c), 0.0);
    }
}
