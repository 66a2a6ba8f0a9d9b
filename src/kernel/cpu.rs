//! CPU Reference Kernel
//!
//! Row-parallel layer norm on the host. Each of the `n1` rows is processed
//! independently, so rows are distributed across cores with Rayon.
//!
//! ## Forward Pass
//!
//! ```text
//! 1. mean   = sum(x) / n2
//! 2. var    = sum((x - mean)²) / n2
//! 3. invvar = 1 / √(var + ε)
//! 4. x_hat  = (x - mean) * invvar
//! 5. y      = γ * x_hat + β          (affine only)
//! ```
//!
//! ## Backward Pass
//!
//! ```text
//! g       = grad_y * γ               (grad_y when not affine)
//! grad_x  = invvar * (g - E[g] - x_hat * E[g * x_hat])
//! grad_γ  = Σ_rows grad_y * x_hat
//! grad_β  = Σ_rows grad_y
//! ```
//!
//! The two expectation terms account for every element of a row feeding
//! into that row's mean and variance.
//!
//! All accumulation happens in f64; results are rounded into the
//! destination dtype when written. Only floating point inputs are
//! implemented.

use rayon::prelude::*;

use super::{GradientInputs, KernelArgs, LayerNormKernel};
use crate::alloc::{BackwardOutput, ForwardOutput};
use crate::args::RowSplit;
use crate::device::Device;
use crate::error::{LayerNormError, Result};

/// Reference kernel executing on [`Device::Cpu`]
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuKernel;

impl CpuKernel {
    pub fn new() -> Self {
        Self
    }

    fn require_float(op: &'static str, args: &KernelArgs<'_>) -> Result<()> {
        let dtype = args.input.dtype();
        if !dtype.is_float() {
            return Err(LayerNormError::UnsupportedDType { op, dtype });
        }
        Ok(())
    }
}

/// Mean and inverse standard deviation of one row
fn row_stats(row: &[f64], epsilon: f64) -> (f64, f64) {
    let n = row.len() as f64;
    let mean = row.iter().sum::<f64>() / n;
    let var = row
        .iter()
        .map(|&x| {
            let diff = x - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    (mean, 1.0 / (var + epsilon).sqrt())
}

impl LayerNormKernel for CpuKernel {
    fn name(&self) -> &str {
        "cpu"
    }

    fn device(&self) -> Device {
        Device::Cpu
    }

    fn forward(&self, args: &KernelArgs<'_>, outputs: &mut ForwardOutput) -> Result<()> {
        Self::require_float("layer_norm", args)?;
        let RowSplit { n1, n2 } = args.split;

        let x = args.input.to_f64_vec();
        let gamma = args.gamma.map(|g| g.to_f64_vec());
        let beta = args.beta.map(|b| b.to_f64_vec());

        let stats: Vec<(f64, f64)> = (0..n1)
            .into_par_iter()
            .map(|i| row_stats(&x[i * n2..(i + 1) * n2], args.epsilon))
            .collect();

        let mut y = vec![0.0; n1 * n2];
        if n2 > 0 {
            y.par_chunks_mut(n2)
                .zip(x.par_chunks(n2))
                .zip(stats.par_iter())
                .for_each(|((y_row, x_row), &(mean, invvar))| {
                    for (j, (out, &xv)) in y_row.iter_mut().zip(x_row).enumerate() {
                        let mut v = (xv - mean) * invvar;
                        if let Some(g) = &gamma {
                            v *= g[j];
                        }
                        if let Some(b) = &beta {
                            v += b[j];
                        }
                        *out = v;
                    }
                });
        }

        let (means, invvars): (Vec<f64>, Vec<f64>) = stats.into_iter().unzip();
        outputs.output.assign_f64(&y);
        outputs.mean.assign_f64(&means);
        outputs.invvar.assign_f64(&invvars);
        Ok(())
    }

    fn backward(
        &self,
        args: &KernelArgs<'_>,
        grads: &GradientInputs<'_>,
        outputs: &mut BackwardOutput,
    ) -> Result<()> {
        Self::require_float("layer_norm_gradient", args)?;
        let RowSplit { n1, n2 } = args.split;

        let x = args.input.to_f64_vec();
        let dout = grads.dout.to_f64_vec();
        let mean = grads.mean.to_f64_vec();
        let invvar = grads.invvar.to_f64_vec();
        let gamma = args.gamma.map(|g| g.to_f64_vec());

        let mut grad_x = vec![0.0; n1 * n2];
        if n2 > 0 {
            grad_x
                .par_chunks_mut(n2)
                .enumerate()
                .for_each(|(i, gx_row)| {
                    let start = i * n2;
                    let x_row = &x[start..start + n2];
                    let dy_row = &dout[start..start + n2];

                    let x_hat = |j: usize| (x_row[j] - mean[i]) * invvar[i];
                    let g = |j: usize| match &gamma {
                        Some(gm) => dy_row[j] * gm[j],
                        None => dy_row[j],
                    };

                    let mut sum_g = 0.0;
                    let mut sum_g_xhat = 0.0;
                    for j in 0..n2 {
                        let gj = g(j);
                        sum_g += gj;
                        sum_g_xhat += gj * x_hat(j);
                    }
                    let mean_g = sum_g / n2 as f64;
                    let mean_g_xhat = sum_g_xhat / n2 as f64;

                    for (j, out) in gx_row.iter_mut().enumerate() {
                        *out = invvar[i] * (g(j) - mean_g - x_hat(j) * mean_g_xhat);
                    }
                });
        }
        outputs.grad_input.assign_f64(&grad_x);

        if outputs.grad_gamma.is_some() || outputs.grad_beta.is_some() {
            // Column sums over rows, accumulated per worker then merged
            let (grad_gamma, grad_beta) = (0..n1)
                .into_par_iter()
                .fold(
                    || (vec![0.0; n2], vec![0.0; n2]),
                    |(mut gg, mut gb), i| {
                        let start = i * n2;
                        for j in 0..n2 {
                            let dy = dout[start + j];
                            gg[j] += dy * (x[start + j] - mean[i]) * invvar[i];
                            gb[j] += dy;
                        }
                        (gg, gb)
                    },
                )
                .reduce(
                    || (vec![0.0; n2], vec![0.0; n2]),
                    |(mut gg, mut gb), (other_gg, other_gb)| {
                        for j in 0..n2 {
                            gg[j] += other_gg[j];
                            gb[j] += other_gb[j];
                        }
                        (gg, gb)
                    },
                );

            if let Some(t) = outputs.grad_gamma.as_mut() {
                t.assign_f64(&grad_gamma);
            }
            if let Some(t) = outputs.grad_beta.as_mut() {
                t.assign_f64(&grad_beta);
            }
        }
        Ok(())
    }
}
