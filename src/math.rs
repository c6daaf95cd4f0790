use ndarray::ArrayView2;
use num_traits::Float;

pub fn gauss<F: Float>(x: F, c: F) -> F {
    let two = F::one() + F::one();

    (-((x * x) / (two * c * c))).exp()
}

/// Mean squared difference of two equally shaped patches.
pub fn mean_squared_difference(a: ArrayView2<'_, f32>, b: ArrayView2<'_, f32>) -> f32 {
    debug_assert_eq!(a.shape(), b.shape());

    if a.is_empty() {
        return 0.0;
    }

    let sum: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();

    sum / a.len() as f32
}
