use crate::feature_vector::FeatureVector;

/// A pairwise similarity function over feature vectors
pub trait KernelFunction {
    fn apply(&self, fv1: &FeatureVector, fv2: &FeatureVector) -> f64;
}

/// The linear kernel `<x, y>`
#[derive(Debug, Clone, Copy, Default)]
pub struct DotProductKernel;

impl KernelFunction for DotProductKernel {
    fn apply(&self, fv1: &FeatureVector, fv2: &FeatureVector) -> f64 {
        fv1.dot(fv2)
    }
}

/// The polynomial kernel `(<x, y> + offset)^degree`
#[derive(Debug, Clone, Copy)]
pub struct PolynomialKernel {
    pub degree: i32,
    pub offset: f64,
}

impl PolynomialKernel {
    pub fn new(degree: i32, offset: f64) -> Self {
        Self { degree, offset }
    }
}

impl KernelFunction for PolynomialKernel {
    fn apply(&self, fv1: &FeatureVector, fv2: &FeatureVector) -> f64 {
        (fv1.dot(fv2) + self.offset).powi(self.degree)
    }
}

impl<F> KernelFunction for F
where
    F: Fn(&FeatureVector, &FeatureVector) -> f64,
{
    fn apply(&self, fv1: &FeatureVector, fv2: &FeatureVector) -> f64 {
        self(fv1, fv2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernels() {
        let x: FeatureVector = vec![(0, 1.0), (1, 2.0)].into_iter().collect();
        let y: FeatureVector = vec![(0, 3.0), (2, 1.0)].into_iter().collect();
        assert_eq!(DotProductKernel.apply(&x, &y), 3.0);
        assert_eq!(PolynomialKernel::new(2, 1.0).apply(&x, &y), 16.0);

        let closure = |a: &FeatureVector, b: &FeatureVector| a.dot(b) * 2.0;
        assert_eq!(closure.apply(&x, &y), 6.0);
    }
}
