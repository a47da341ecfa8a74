use super::{CyCxHW, Rect, TLBR};
use crate::{common::*, RectNum, HW};

/// Axis-aligned scaling followed by translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transform<T> {
    pub sy: T,
    pub sx: T,
    pub ty: T,
    pub tx: T,
}

impl<T> Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    pub fn from_rects<R>(src: &R, tgt: &R) -> Self
    where
        R: Rect<Type = T>,
    {
        let sy = tgt.h() / src.h();
        let sx = tgt.w() / src.w();
        let ty = tgt.t() - src.t() * sy;
        let tx = tgt.l() - src.l() * sx;

        Self { sy, sx, ty, tx }
    }

    /// Stretch a `src_size` canvas onto a `tgt_size` canvas, both anchored at the origin.
    pub fn from_sizes_exact(src_size: &HW<T>, tgt_size: &HW<T>) -> Self {
        let src = TLBR::from_tlhw([T::zero(), T::zero(), src_size.h(), src_size.w()]);
        let tgt = TLBR::from_tlhw([T::zero(), T::zero(), tgt_size.h(), tgt_size.w()]);
        Self::from_rects(&src, &tgt)
    }
}

impl<T> Mul<&TLBR<T>> for &Transform<T>
where
    T: Copy + Num,
{
    type Output = TLBR<T>;

    fn mul(self, rhs: &TLBR<T>) -> Self::Output {
        rhs.transform(self)
    }
}

impl<T> Mul<&CyCxHW<T>> for &Transform<T>
where
    T: Copy + Num,
{
    type Output = CyCxHW<T>;

    fn mul(self, rhs: &CyCxHW<T>) -> Self::Output {
        rhs.transform(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rect_resize_exact() {
        let transform =
            Transform::from_sizes_exact(&HW::from_hw([80.0, 80.0]), &HW::from_hw([20.0, 40.0]));
        let expect = Transform {
            sx: 0.5,
            sy: 0.25,
            tx: 0.0,
            ty: 0.0,
        };
        assert_eq!(transform, expect);
    }

    #[test]
    fn unit_canvas_to_pixels() {
        let transform =
            Transform::from_sizes_exact(&HW::from_hw([1.0, 1.0]), &HW::from_hw([1000.0, 1000.0]));
        let rect = CyCxHW::from_cycxhw([0.5, 0.25, 0.5, 0.1]);
        let scaled = &transform * &rect;
        assert_all_close(scaled.cycxhw(), [500.0, 250.0, 500.0, 100.0]);

        let scaled = &transform * &TLBR::from(&rect);
        assert_all_close(scaled.tlbr(), [250.0, 200.0, 750.0, 300.0]);
    }

    fn assert_all_close(lhs: [f64; 4], rhs: [f64; 4]) {
        lhs.into_iter().zip(rhs).for_each(|(lhs, rhs)| {
            assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-9);
        });
    }
}
