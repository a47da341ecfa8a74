use crate::common::*;

/// The generic rectangle.
pub trait Rect {
    type Type;

    fn t(&self) -> Self::Type;
    fn l(&self) -> Self::Type;
    fn b(&self) -> Self::Type;
    fn r(&self) -> Self::Type;
    fn cy(&self) -> Self::Type;
    fn cx(&self) -> Self::Type;
    fn h(&self) -> Self::Type;
    fn w(&self) -> Self::Type;

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;

    fn try_from_tlhw(tlhw: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;

    fn try_from_cycxhw(cycxhw: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;
}

pub trait RectNum: Rect
where
    Self::Type: Num + PartialOrd + Copy,
{
    fn from_tlbr(tlbr: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_tlbr(tlbr).unwrap()
    }

    fn from_tlhw(tlhw: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_tlhw(tlhw).unwrap()
    }

    fn from_cycxhw(cycxhw: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_cycxhw(cycxhw).unwrap()
    }

    fn cycxhw(&self) -> [Self::Type; 4] {
        [self.cy(), self.cx(), self.h(), self.w()]
    }

    fn tlbr(&self) -> [Self::Type; 4] {
        [self.t(), self.l(), self.b(), self.r()]
    }

    /// Area in pixel units, where both the first and the last pixel row
    /// and column belong to the rectangle.
    fn inclusive_area(&self) -> Self::Type {
        let one = Self::Type::one();
        (self.h() + one) * (self.w() + one)
    }

    /// Intersection-over-union under the inclusive pixel convention.
    ///
    /// Disjoint rectangles score zero. The score is returned as `f64`
    /// regardless of the coordinate type.
    fn inclusive_iou_with<R>(&self, other: &R) -> f64
    where
        R: Rect<Type = Self::Type>,
        Self::Type: ToPrimitive,
    {
        let zero = Self::Type::zero();
        let one = Self::Type::one();
        let max = |a: Self::Type, b: Self::Type| if a >= b { a } else { b };
        let min = |a: Self::Type, b: Self::Type| if a <= b { a } else { b };

        let inter_h = min(self.b(), other.b()) - max(self.t(), other.t()) + one;
        let inter_w = min(self.r(), other.r()) - max(self.l(), other.l()) + one;
        if inter_h <= zero || inter_w <= zero {
            return 0.0;
        }

        let other_area = (other.h() + one) * (other.w() + one);
        let inter_area = inter_h * inter_w;
        let union_area = self.inclusive_area() + other_area - inter_area;

        let inter_area = inter_area.to_f64().unwrap_or(0.0);
        let union_area = union_area.to_f64().unwrap_or(f64::INFINITY);
        inter_area / union_area
    }
}

impl<T> RectNum for T
where
    T: Rect,
    T::Type: Num + PartialOrd + Copy,
{
}
