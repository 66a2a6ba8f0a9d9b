//! Layer Norm Entry Points
//!
//! Four entry points cover the forward and backward pass, with and without
//! the learnable affine parameters gamma and beta:
//!
//! | entry point       | returns                                |
//! |-------------------|----------------------------------------|
//! | `forward`         | `output`, `mean`, `invvar`             |
//! | `forward_affine`  | `output`, `mean`, `invvar`             |
//! | `backward`        | `grad_input`                           |
//! | `backward_affine` | `grad_input`, `grad_gamma`, `grad_beta`|
//!
//! Each one runs the same sequence:
//!
//! 1. every tensor operand must be on the kernel's device and contiguous
//! 2. `input` must end in `normalized_shape`; gamma/beta must equal it
//! 3. the input is split into `n1 x n2` rows
//! 4. outputs are allocated
//! 5. the kernel fills them
//!
//! ## Example
//!
//! ```rust
//! use fused_layer_norm::{ops, DType, Tensor};
//!
//! let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
//! let out = ops::forward(&x, &[3], 1e-5)?;
//! assert_eq!(out.output.shape(), &[2, 3]);
//! assert_eq!(out.mean.to_f64_vec(), vec![2.0, 5.0]);
//! assert_eq!(out.mean.dtype(), DType::F32);
//! # Ok::<(), fused_layer_norm::LayerNormError>(())
//! ```

use tracing::{debug, warn};

use crate::alloc::{
    allocate_backward_outputs, allocate_forward_outputs, BackwardOutput, ForwardOutput,
};
use crate::args::{check_args, check_tensor, RowSplit};
use crate::error::{LayerNormError, Result};
use crate::kernel::{CpuKernel, GradientInputs, KernelArgs, LayerNormKernel};
use crate::tensor::Tensor;

/// Gradients returned by [`LayerNormOps::backward_affine`]
#[derive(Clone, Debug)]
pub struct AffineGradients {
    pub grad_input: Tensor,
    pub grad_gamma: Tensor,
    pub grad_beta: Tensor,
}

/// The four layer-norm entry points bound to one kernel
#[derive(Clone, Debug, Default)]
pub struct LayerNormOps<K: LayerNormKernel = CpuKernel> {
    kernel: K,
}

impl<K: LayerNormKernel> LayerNormOps<K> {
    pub fn new(kernel: K) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Layer norm without affine parameters
    pub fn forward(
        &self,
        input: &Tensor,
        normalized_shape: &[usize],
        epsilon: f64,
    ) -> Result<ForwardOutput> {
        self.run_forward(input, normalized_shape, None, None, epsilon)
    }

    /// Layer norm followed by `gamma * y + beta`
    pub fn forward_affine(
        &self,
        input: &Tensor,
        normalized_shape: &[usize],
        gamma: &Tensor,
        beta: &Tensor,
        epsilon: f64,
    ) -> Result<ForwardOutput> {
        self.run_forward(input, normalized_shape, Some(gamma), Some(beta), epsilon)
    }

    /// Gradient of the non-affine forward pass with respect to `input`
    ///
    /// `mean` and `invvar` are the statistics returned by [`Self::forward`].
    pub fn backward(
        &self,
        dout: &Tensor,
        mean: &Tensor,
        invvar: &Tensor,
        input: &Tensor,
        normalized_shape: &[usize],
        epsilon: f64,
    ) -> Result<Tensor> {
        let grads = GradientInputs { dout, mean, invvar };
        let out = self.run_backward(&grads, input, normalized_shape, None, None, epsilon)?;
        Ok(out.grad_input)
    }

    /// Gradients of the affine forward pass with respect to input, gamma and beta
    #[allow(clippy::too_many_arguments)]
    pub fn backward_affine(
        &self,
        dout: &Tensor,
        mean: &Tensor,
        invvar: &Tensor,
        input: &Tensor,
        normalized_shape: &[usize],
        gamma: &Tensor,
        beta: &Tensor,
        epsilon: f64,
    ) -> Result<AffineGradients> {
        let grads = GradientInputs { dout, mean, invvar };
        let out = self.run_backward(
            &grads,
            input,
            normalized_shape,
            Some(gamma),
            Some(beta),
            epsilon,
        )?;

        let missing = |output: &'static str| LayerNormError::MissingKernelOutput {
            kernel: self.kernel.name().to_string(),
            output,
        };
        let grad_gamma = out.grad_gamma.ok_or_else(|| missing("grad_gamma"))?;
        let grad_beta = out.grad_beta.ok_or_else(|| missing("grad_beta"))?;
        Ok(AffineGradients {
            grad_input: out.grad_input,
            grad_gamma,
            grad_beta,
        })
    }

    fn check_operands(&self, operands: &[(&'static str, Option<&Tensor>)]) -> Result<()> {
        let device = self.kernel.device();
        for &(name, tensor) in operands {
            if let Some(t) = tensor {
                check_tensor(name, t, device)?;
            }
        }
        Ok(())
    }

    fn run_forward(
        &self,
        input: &Tensor,
        normalized_shape: &[usize],
        gamma: Option<&Tensor>,
        beta: Option<&Tensor>,
        epsilon: f64,
    ) -> Result<ForwardOutput> {
        let split = self
            .check_operands(&[("input", Some(input)), ("gamma", gamma), ("beta", beta)])
            .and_then(|_| check_args(input, normalized_shape, gamma, beta))
            .inspect_err(|e| warn!(error = %e, "layer_norm rejected arguments"))?;

        debug!(
            kernel = self.kernel.name(),
            n1 = split.n1,
            n2 = split.n2,
            dtype = %input.dtype(),
            device = %input.device(),
            affine = gamma.is_some(),
            "layer_norm forward"
        );

        let mut outputs = allocate_forward_outputs(input, split.n1);
        let args = KernelArgs {
            input,
            split,
            normalized_shape,
            gamma,
            beta,
            epsilon,
        };
        self.kernel.forward(&args, &mut outputs)?;
        Ok(outputs)
    }

    fn run_backward(
        &self,
        grads: &GradientInputs<'_>,
        input: &Tensor,
        normalized_shape: &[usize],
        gamma: Option<&Tensor>,
        beta: Option<&Tensor>,
        epsilon: f64,
    ) -> Result<BackwardOutput> {
        let split = self
            .check_operands(&[
                ("dout", Some(grads.dout)),
                ("mean", Some(grads.mean)),
                ("invvar", Some(grads.invvar)),
                ("input", Some(input)),
                ("gamma", gamma),
                ("beta", beta),
            ])
            .and_then(|_| check_args(input, normalized_shape, gamma, beta))
            .and_then(|split| check_gradient_inputs(grads, input, split).map(|_| split))
            .inspect_err(|e| warn!(error = %e, "layer_norm_gradient rejected arguments"))?;

        debug!(
            kernel = self.kernel.name(),
            n1 = split.n1,
            n2 = split.n2,
            dtype = %input.dtype(),
            device = %input.device(),
            affine = gamma.is_some(),
            "layer_norm backward"
        );

        let mut outputs = allocate_backward_outputs(input, gamma, beta);
        let args = KernelArgs {
            input,
            split,
            normalized_shape,
            gamma,
            beta,
            epsilon,
        };
        self.kernel.backward(&args, grads, &mut outputs)?;
        Ok(outputs)
    }
}

/// `dout` must match the input and the statistics must cover `n1` rows in
/// the statistics dtype of the input
fn check_gradient_inputs(grads: &GradientInputs<'_>, input: &Tensor, split: RowSplit) -> Result<()> {
    if grads.dout.shape() != input.shape() {
        return Err(LayerNormError::TensorShapeMismatch {
            name: "dout",
            expected: input.shape().to_vec(),
            actual: grads.dout.shape().to_vec(),
        });
    }

    let stats_dtype = input.dtype().stats_dtype();
    for (name, stat) in [("mean", grads.mean), ("invvar", grads.invvar)] {
        if stat.numel() != split.n1 {
            return Err(LayerNormError::TensorShapeMismatch {
                name,
                expected: vec![split.n1],
                actual: stat.shape().to_vec(),
            });
        }
        if stat.dtype() != stats_dtype {
            return Err(LayerNormError::StatsDTypeMismatch {
                name,
                expected: stats_dtype,
                actual: stat.dtype(),
            });
        }
    }
    Ok(())
}

/// [`LayerNormOps::forward`] on the CPU kernel
pub fn forward(input: &Tensor, normalized_shape: &[usize], epsilon: f64) -> Result<ForwardOutput> {
    LayerNormOps::<CpuKernel>::default().forward(input, normalized_shape, epsilon)
}

/// [`LayerNormOps::forward_affine`] on the CPU kernel
pub fn forward_affine(
    input: &Tensor,
    normalized_shape: &[usize],
    gamma: &Tensor,
    beta: &Tensor,
    epsilon: f64,
) -> Result<ForwardOutput> {
    LayerNormOps::<CpuKernel>::default().forward_affine(input, normalized_shape, gamma, beta, epsilon)
}

/// [`LayerNormOps::backward`] on the CPU kernel
pub fn backward(
    dout: &Tensor,
    mean: &Tensor,
    invvar: &Tensor,
    input: &Tensor,
    normalized_shape: &[usize],
    epsilon: f64,
) -> Result<Tensor> {
    LayerNormOps::<CpuKernel>::default().backward(dout, mean, invvar, input, normalized_shape, epsilon)
}

/// [`LayerNormOps::backward_affine`] on the CPU kernel
#[allow(clippy::too_many_arguments)]
pub fn backward_affine(
    dout: &Tensor,
    mean: &Tensor,
    invvar: &Tensor,
    input: &Tensor,
    normalized_shape: &[usize],
    gamma: &Tensor,
    beta: &Tensor,
    epsilon: f64,
) -> Result<AffineGradients> {
    LayerNormOps::<CpuKernel>::default().backward_affine(
        dout,
        mean,
        invvar,
        input,
        normalized_shape,
        gamma,
        beta,
        epsilon,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;
    use crate::dtype::DType;

    const EPS: f64 = 1e-5;

    fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
        assert_eq!(actual.len(), expected.len(), "length mismatch");
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!(
                (a - e).abs() <= tol,
                "element {}: got {}, expected {} (tol {})",
                i,
                a,
                e,
                tol
            );
        }
    }

    /// Deterministic, non-degenerate test data
    fn ramp(shape: Vec<usize>, dtype: DType) -> Tensor {
        let n: usize = shape.iter().product();
        let data: Vec<f64> = (0..n)
            .map(|i| ((i * 7 % 11) as f64 - 5.0) * 0.3 + (i as f64) * 0.01)
            .collect();
        Tensor::from_f64(&data, shape, dtype)
    }

    /// Loss = sum(output * weights), used for finite-difference checks
    fn weighted_loss(output: &Tensor, weights: &[f64]) -> f64 {
        output
            .to_f64_vec()
            .iter()
            .zip(weights)
            .map(|(o, w)| o * w)
            .sum()
    }

    #[test]
    fn test_forward_normalizes_rows() {
        let x = ramp(vec![3, 2, 8], DType::F64);
        let out = forward(&x, &[2, 8], EPS).unwrap();

        assert_eq!(out.output.shape(), &[3, 2, 8]);
        assert_eq!(out.mean.shape(), &[3]);
        assert_eq!(out.invvar.shape(), &[3]);
        assert_eq!(out.mean.dtype(), DType::F64);

        let y = out.output.to_f64_vec();
        for row in y.chunks(16) {
            let mean: f64 = row.iter().sum::<f64>() / 16.0;
            let var: f64 = row.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / 16.0;
            assert!(mean.abs() < 1e-10, "row mean {}", mean);
            assert!((var - 1.0).abs() < 1e-3, "row var {}", var);
        }
    }

    #[test]
    fn test_forward_statistics_match_row_values() {
        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 10.0, 10.0, 10.0, 10.0], vec![2, 4]);
        let out = forward(&x, &[4], EPS).unwrap();

        assert_close(&out.mean.to_f64_vec(), &[2.5, 10.0], 1e-6);
        let invvar = out.invvar.to_f64_vec();
        assert!((invvar[0] - 1.0 / (1.25f64 + EPS).sqrt()).abs() < 1e-5);
        assert!((invvar[1] - 1.0 / EPS.sqrt()).abs() < 1e-2);
        assert_close(&out.output.to_f64_vec()[4..], &[0.0; 4], 1e-6);
    }

    #[test]
    fn test_forward_affine_scales_and_shifts() {
        let x = ramp(vec![4, 6], DType::F32);
        let gamma = Tensor::from_f64(&[1.0, 2.0, 0.5, -1.0, 3.0, 0.0], vec![6], DType::F32);
        let beta = Tensor::from_f64(&[0.0, 1.0, -1.0, 0.5, 0.0, 2.0], vec![6], DType::F32);

        let plain = forward(&x, &[6], EPS).unwrap().output.to_f64_vec();
        let affine = forward_affine(&x, &[6], &gamma, &beta, EPS).unwrap();

        let g = gamma.to_f64_vec();
        let b = beta.to_f64_vec();
        let expected: Vec<f64> = plain
            .iter()
            .enumerate()
            .map(|(i, v)| v * g[i % 6] + b[i % 6])
            .collect();
        assert_close(&affine.output.to_f64_vec(), &expected, 1e-5);
    }

    #[test]
    fn test_half_precision_keeps_f32_statistics() {
        let x = ramp(vec![2, 16], DType::F16);
        let out = forward(&x, &[16], EPS).unwrap();
        assert_eq!(out.output.dtype(), DType::F16);
        assert_eq!(out.mean.dtype(), DType::F32);
        assert_eq!(out.invvar.dtype(), DType::F32);
    }

    #[test]
    fn test_integer_input_rejected_by_cpu_kernel() {
        let x = Tensor::zeros(vec![2, 4], DType::I32);
        let err = forward(&x, &[4], EPS).unwrap_err();
        assert!(matches!(
            err,
            LayerNormError::UnsupportedDType { dtype: DType::I32, .. }
        ));
    }

    #[test]
    fn test_forward_validation_errors() {
        let x = ramp(vec![2, 3, 4], DType::F32);

        let err = forward(&x, &[3], EPS).unwrap_err();
        assert!(matches!(err, LayerNormError::InputShapeMismatch { .. }));

        let err = forward(&x, &[], EPS).unwrap_err();
        assert!(matches!(err, LayerNormError::EmptyNormalizedShape { .. }));

        let gamma = Tensor::ones(vec![3, 4], DType::F32);
        let beta = Tensor::zeros(vec![4], DType::F32);
        let err = forward_affine(&x, &[4], &gamma, &beta, EPS).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected gamma to be of same shape as normalized_shape, but got gamma of shape [3, 4] and normalized_shape=[4]"
        );

        let gamma = Tensor::ones(vec![4], DType::F32);
        let beta = Tensor::zeros(vec![2, 2], DType::F32);
        let err = forward_affine(&x, &[4], &gamma, &beta, EPS).unwrap_err();
        assert!(err.to_string().starts_with("Expected beta"));
    }

    #[test]
    fn test_device_and_layout_checks_run_first() {
        let x = ramp(vec![4, 4], DType::F32);

        let err = forward(&x.clone().to_device(Device::Cuda(0)), &[4], EPS).unwrap_err();
        assert!(matches!(err, LayerNormError::WrongDevice { name: "input", .. }));

        // A transposed input fails on layout even though its shape matches
        let err = forward(&x.transpose(0, 1), &[4], EPS).unwrap_err();
        assert!(matches!(err, LayerNormError::NotContiguous { name: "input" }));

        let gamma = Tensor::ones(vec![4], DType::F32).to_device(Device::Cuda(0));
        let beta = Tensor::zeros(vec![4], DType::F32);
        let err = forward_affine(&x, &[4], &gamma, &beta, EPS).unwrap_err();
        assert!(matches!(err, LayerNormError::WrongDevice { name: "gamma", .. }));
    }

    #[test]
    fn test_empty_batch() {
        let x = Tensor::zeros(vec![0, 8], DType::F32);
        let out = forward(&x, &[8], EPS).unwrap();
        assert_eq!(out.output.numel(), 0);
        assert_eq!(out.mean.shape(), &[0]);

        let grad = backward(&x, &out.mean, &out.invvar, &x, &[8], EPS).unwrap();
        assert_eq!(grad.shape(), &[0, 8]);
    }

    #[test]
    fn test_zero_sized_transposed_input() {
        let x = Tensor::zeros(vec![0, 8], DType::F32).transpose(0, 1);
        let out = forward(&x, &[0], EPS).unwrap();
        assert_eq!(out.output.shape(), &[8, 0]);
        assert_eq!(out.mean.shape(), &[8]);
    }

    #[test]
    fn test_backward_matches_finite_differences() {
        let shape = vec![3, 5];
        let x = ramp(shape.clone(), DType::F64);
        let weights: Vec<f64> = (0..15).map(|i| ((i * 3 % 7) as f64 - 3.0) * 0.25).collect();
        let dout = Tensor::from_f64(&weights, shape.clone(), DType::F64);

        let fwd = forward(&x, &[5], EPS).unwrap();
        let grad = backward(&dout, &fwd.mean, &fwd.invvar, &x, &[5], EPS).unwrap();

        let h = 1e-6;
        let base = x.to_f64_vec();
        let numeric: Vec<f64> = (0..base.len())
            .map(|i| {
                let mut plus = base.clone();
                plus[i] += h;
                let mut minus = base.clone();
                minus[i] -= h;
                let lp = weighted_loss(
                    &forward(&Tensor::from_f64(&plus, shape.clone(), DType::F64), &[5], EPS)
                        .unwrap()
                        .output,
                    &weights,
                );
                let lm = weighted_loss(
                    &forward(&Tensor::from_f64(&minus, shape.clone(), DType::F64), &[5], EPS)
                        .unwrap()
                        .output,
                    &weights,
                );
                (lp - lm) / (2.0 * h)
            })
            .collect();

        assert_close(&grad.to_f64_vec(), &numeric, 1e-5);
    }

    #[test]
    fn test_backward_affine_input_gradient_matches_finite_differences() {
        let shape = vec![3, 4];
        let x = ramp(shape.clone(), DType::F64);
        let gamma = Tensor::from_f64(&[0.5, -1.5, 2.0, 0.7], vec![4], DType::F64);
        let beta = Tensor::from_f64(&[0.3, -0.1, 0.0, 1.2], vec![4], DType::F64);
        let weights: Vec<f64> = (0..12).map(|i| ((i * 5 % 9) as f64 - 4.0) * 0.2).collect();
        let dout = Tensor::from_f64(&weights, shape.clone(), DType::F64);

        let fwd = forward_affine(&x, &[4], &gamma, &beta, EPS).unwrap();
        let grads =
            backward_affine(&dout, &fwd.mean, &fwd.invvar, &x, &[4], &gamma, &beta, EPS).unwrap();

        let loss = |values: &[f64]| {
            let t = Tensor::from_f64(values, shape.clone(), DType::F64);
            let out = forward_affine(&t, &[4], &gamma, &beta, EPS).unwrap();
            weighted_loss(&out.output, &weights)
        };

        let h = 1e-6;
        let base = x.to_f64_vec();
        let numeric: Vec<f64> = (0..base.len())
            .map(|i| {
                let mut plus = base.clone();
                plus[i] += h;
                let mut minus = base.clone();
                minus[i] -= h;
                (loss(&plus) - loss(&minus)) / (2.0 * h)
            })
            .collect();

        assert_close(&grads.grad_input.to_f64_vec(), &numeric, 1e-5);
    }

    #[test]
    fn test_backward_affine_parameter_gradients() {
        let x = ramp(vec![4, 3], DType::F64);
        let gamma = Tensor::from_f64(&[0.5, 1.5, -2.0], vec![3], DType::F64);
        let beta = Tensor::from_f64(&[0.1, 0.2, 0.3], vec![3], DType::F64);
        let dout = ramp(vec![4, 3], DType::F64);

        let fwd = forward_affine(&x, &[3], &gamma, &beta, EPS).unwrap();
        let grads =
            backward_affine(&dout, &fwd.mean, &fwd.invvar, &x, &[3], &gamma, &beta, EPS).unwrap();

        assert_eq!(grads.grad_input.shape(), &[4, 3]);
        assert_eq!(grads.grad_gamma.shape(), &[3]);
        assert_eq!(grads.grad_beta.shape(), &[3]);

        // grad_beta is the column sum of dout
        let d = dout.to_f64_vec();
        let col_sums: Vec<f64> = (0..3).map(|j| (0..4).map(|i| d[i * 3 + j]).sum()).collect();
        assert_close(&grads.grad_beta.to_f64_vec(), &col_sums, 1e-12);

        // grad_gamma is the column sum of dout * x_hat
        let x_hat = forward(&x, &[3], EPS).unwrap().output.to_f64_vec();
        let expected: Vec<f64> = (0..3)
            .map(|j| (0..4).map(|i| d[i * 3 + j] * x_hat[i * 3 + j]).sum())
            .collect();
        assert_close(&grads.grad_gamma.to_f64_vec(), &expected, 1e-10);
    }

    #[test]
    fn test_backward_affine_input_gradient_with_unit_gamma_matches_plain() {
        let x = ramp(vec![2, 6], DType::F64);
        let weights: Vec<f64> = (0..12).map(|i| (i as f64 - 6.0) * 0.1).collect();
        let dout = Tensor::from_f64(&weights, vec![2, 6], DType::F64);
        let gamma = Tensor::ones(vec![6], DType::F64);
        let beta = Tensor::zeros(vec![6], DType::F64);

        let fwd = forward(&x, &[6], EPS).unwrap();
        let plain = backward(&dout, &fwd.mean, &fwd.invvar, &x, &[6], EPS).unwrap();
        let affine =
            backward_affine(&dout, &fwd.mean, &fwd.invvar, &x, &[6], &gamma, &beta, EPS).unwrap();

        assert_close(&affine.grad_input.to_f64_vec(), &plain.to_f64_vec(), 1e-12);
    }

    #[test]
    fn test_backward_rejects_mismatched_operands() {
        let x = ramp(vec![2, 4], DType::F32);
        let fwd = forward(&x, &[4], EPS).unwrap();

        let bad_dout = Tensor::zeros(vec![4, 2], DType::F32);
        let err = backward(&bad_dout, &fwd.mean, &fwd.invvar, &x, &[4], EPS).unwrap_err();
        assert!(matches!(err, LayerNormError::TensorShapeMismatch { name: "dout", .. }));

        let short_mean = Tensor::zeros(vec![1], DType::F32);
        let err = backward(&x, &short_mean, &fwd.invvar, &x, &[4], EPS).unwrap_err();
        assert!(matches!(err, LayerNormError::TensorShapeMismatch { name: "mean", .. }));

        let f64_invvar = fwd.invvar.to_dtype(DType::F64);
        let err = backward(&x, &fwd.mean, &f64_invvar, &x, &[4], EPS).unwrap_err();
        assert!(matches!(err, LayerNormError::StatsDTypeMismatch { name: "invvar", .. }));

        let bad_gamma = Tensor::ones(vec![5], DType::F32);
        let beta = Tensor::zeros(vec![4], DType::F32);
        let err = backward_affine(&x, &fwd.mean, &fwd.invvar, &x, &[4], &bad_gamma, &beta, EPS)
            .unwrap_err();
        assert!(matches!(err, LayerNormError::ParamShapeMismatch { param: "gamma", .. }));
    }

    /// Wraps the CPU kernel but drops the gamma gradient
    struct DropsGradGamma;

    impl LayerNormKernel for DropsGradGamma {
        fn name(&self) -> &str {
            "drops-grad-gamma"
        }

        fn device(&self) -> Device {
            Device::Cpu
        }

        fn forward(&self, args: &KernelArgs<'_>, outputs: &mut ForwardOutput) -> Result<()> {
            CpuKernel.forward(args, outputs)
        }

        fn backward(
            &self,
            args: &KernelArgs<'_>,
            grads: &GradientInputs<'_>,
            outputs: &mut BackwardOutput,
        ) -> Result<()> {
            CpuKernel.backward(args, grads, outputs)?;
            outputs.grad_gamma.take();
            Ok(())
        }
    }

    #[test]
    fn test_backward_affine_reports_missing_kernel_output() {
        let ops = LayerNormOps::new(DropsGradGamma);
        let x = ramp(vec![2, 4], DType::F32);
        let gamma = Tensor::ones(vec![4], DType::F32);
        let beta = Tensor::zeros(vec![4], DType::F32);

        let fwd = ops.forward_affine(&x, &[4], &gamma, &beta, EPS).unwrap();
        let err = ops
            .backward_affine(&x, &fwd.mean, &fwd.invvar, &x, &[4], &gamma, &beta, EPS)
            .unwrap_err();
        assert!(matches!(
            err,
            LayerNormError::MissingKernelOutput { output: "grad_gamma", .. }
        ));
        assert_eq!(err.to_string(), "Kernel 'drops-grad-gamma' did not produce grad_gamma");
    }
}
