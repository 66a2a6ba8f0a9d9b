//! Layer Norm Entry Point Benchmark
//!
//! Runs one of the four entry points on random input and reports time per
//! call along with output statistics.
//!
//! ## Usage
//!
//! ```bash
//! # List entry points and shape presets
//! cargo run --release --bin layer_norm_bench -- --list-ops
//!
//! # GPT-2 small activations through the affine forward pass
//! cargo run --release --bin layer_norm_bench -- --preset gpt2-small
//!
//! # Custom shape, backward pass in double precision
//! cargo run --release --bin layer_norm_bench -- \
//!     --shape 16,64,32 --normalized 64,32 --op backward --dtype f64
//!
//! # Layer settings from a JSON config
//! cargo run --release --bin layer_norm_bench -- --shape 8,768 --config ln.json
//! ```

use clap::Parser;
use fused_layer_norm::{
    init_logger, ops::LayerNormOps, CpuKernel, DType, EntryPoint, LayerNormConfig,
    LayerNormKernel, Tensor,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Normal;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "layer_norm_bench",
    about = "Run a layer norm entry point on random input"
)]
struct Args {
    /// Named shape preset (see --list-ops)
    #[arg(long)]
    preset: Option<String>,

    /// List entry points and presets, then exit
    #[arg(long)]
    list_ops: bool,

    /// Input shape, comma separated
    #[arg(long, value_delimiter = ',')]
    shape: Option<Vec<usize>>,

    /// Normalized (trailing) shape, comma separated; defaults to the last input dim
    #[arg(long, value_delimiter = ',')]
    normalized: Option<Vec<usize>>,

    /// Epsilon added to the variance
    #[arg(long)]
    eps: Option<f64>,

    /// Element type of the input
    #[arg(long, default_value = "f32")]
    dtype: DType,

    /// Entry point to run
    #[arg(long, default_value = "forward_affine")]
    op: EntryPoint,

    /// Timed iterations
    #[arg(long, default_value = "10")]
    iters: usize,

    /// Seed for the random input
    #[arg(long)]
    seed: Option<u64>,

    /// JSON layer config (normalized_shape, eps, elementwise_affine)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

struct Preset {
    name: &'static str,
    shape: &'static [usize],
    normalized: &'static [usize],
    description: &'static str,
}

const PRESETS: &[Preset] = &[
    Preset {
        name: "gpt2-small",
        shape: &[8, 1024, 768],
        normalized: &[768],
        description: "GPT-2 small hidden states",
    },
    Preset {
        name: "bert-base",
        shape: &[32, 128, 768],
        normalized: &[768],
        description: "BERT base hidden states",
    },
    Preset {
        name: "gpt2-xl",
        shape: &[4, 1024, 1600],
        normalized: &[1600],
        description: "GPT-2 XL hidden states",
    },
    Preset {
        name: "image-patch",
        shape: &[16, 14, 14, 64],
        normalized: &[14, 64],
        description: "Two trailing dims normalized together",
    },
];

fn list_ops() {
    println!("Entry points (kernel: {}):", CpuKernel.name());
    for ep in EntryPoint::ALL {
        println!("  {:16} {}", ep.name(), ep.doc(CpuKernel.device()));
    }
    println!();
    println!("Presets:");
    for p in PRESETS {
        println!(
            "  {:12} shape={:?} normalized={:?}  {}",
            p.name, p.shape, p.normalized, p.description
        );
    }
}

/// Mean and standard deviation over every element
fn summarize(t: &Tensor) -> (f64, f64) {
    let values = t.to_f64_vec();
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logger(args.verbose);

    if args.list_ops {
        list_ops();
        return Ok(());
    }

    let (mut shape, preset_normalized) = match &args.preset {
        Some(name) => {
            let preset = PRESETS
                .iter()
                .find(|p| p.name == name.as_str())
                .ok_or_else(|| format!("unknown preset '{}' (see --list-ops)", name))?;
            (preset.shape.to_vec(), Some(preset.normalized.to_vec()))
        }
        None => (vec![8, 512, 768], None),
    };
    if let Some(s) = args.shape {
        shape = s;
    }

    // Precedence: --normalized, then --config, then the preset, then the last input dim
    let mut config = match &args.config {
        Some(path) => LayerNormConfig::from_json_file(path)?,
        None => {
            let last = shape.last().copied().unwrap_or(1);
            LayerNormConfig::new(preset_normalized.unwrap_or_else(|| vec![last]))
        }
    };
    if let Some(n) = args.normalized {
        config.normalized_shape = n;
    }
    if let Some(eps) = args.eps {
        config.eps = eps;
    }
    config.validate()?;

    info!(
        op = %args.op,
        shape = ?shape,
        normalized = ?config.normalized_shape,
        dtype = %args.dtype,
        eps = config.eps,
        "starting benchmark"
    );

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let normal = Normal::new(0.0, 1.0)?;

    let ops = LayerNormOps::new(CpuKernel);
    let n2 = config.n2();
    let input = Tensor::sample(shape.clone(), args.dtype, &normal, &mut rng);
    let gamma = Tensor::sample(config.normalized_shape.clone(), args.dtype, &normal, &mut rng);
    let beta = Tensor::sample(config.normalized_shape.clone(), args.dtype, &normal, &mut rng);

    // Backward passes need statistics from a forward pass first
    let fwd = if args.op.is_affine() {
        ops.forward_affine(&input, &config.normalized_shape, &gamma, &beta, config.eps)?
    } else {
        ops.forward(&input, &config.normalized_shape, config.eps)?
    };
    let dout = Tensor::sample(shape.clone(), args.dtype, &normal, &mut rng);

    let start = Instant::now();
    let mut last = fwd.output.clone();
    for _ in 0..args.iters {
        last = match args.op {
            EntryPoint::Forward => ops.forward(&input, &config.normalized_shape, config.eps)?.output,
            EntryPoint::ForwardAffine => {
                ops.forward_affine(&input, &config.normalized_shape, &gamma, &beta, config.eps)?
                    .output
            }
            EntryPoint::Backward => ops.backward(
                &dout,
                &fwd.mean,
                &fwd.invvar,
                &input,
                &config.normalized_shape,
                config.eps,
            )?,
            EntryPoint::BackwardAffine => {
                ops.backward_affine(
                    &dout,
                    &fwd.mean,
                    &fwd.invvar,
                    &input,
                    &config.normalized_shape,
                    &gamma,
                    &beta,
                    config.eps,
                )?
                .grad_input
            }
        };
    }
    let elapsed = start.elapsed();

    let per_call_ms = if args.iters > 0 {
        elapsed.as_secs_f64() * 1000.0 / args.iters as f64
    } else {
        0.0
    };
    let rows = if n2 > 0 { input.numel() / n2 } else { 0 };
    let (mean, std) = summarize(&last);

    println!("{} ({})", args.op.doc(CpuKernel.device()), args.op);
    println!("  input:      {:?} {}", shape, args.dtype);
    println!("  rows x cols: {} x {}", rows, n2);
    println!("  iterations: {}", args.iters);
    println!("  time/call:  {:.3} ms", per_call_ms);
    println!("  result:     mean={:.4} std={:.4}", mean, std);

    Ok(())
}
