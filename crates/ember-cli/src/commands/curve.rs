//! Transfer-curve sweep of a single circuit model.

use anyhow::Context;
use clap::Args;
use ember_circuits::Circuit;
use ember_config::circuit_kind;

#[derive(Args)]
pub struct CurveArgs {
    /// Circuit model name (see `ember info circuits`)
    #[arg(value_name = "CIRCUIT")]
    circuit: String,

    /// Lowest input level
    #[arg(long, default_value = "-3.0", allow_hyphen_values = true)]
    min: f32,

    /// Highest input level
    #[arg(long, default_value = "3.0", allow_hyphen_values = true)]
    max: f32,

    /// Number of points
    #[arg(long, default_value = "61")]
    points: usize,

    /// Sample rate the model is built for
    #[arg(long, default_value = "48000.0")]
    sample_rate: f32,

    /// Sine frequency used to drive models with memory
    #[arg(long, default_value = "100.0")]
    freq: f32,

    /// Sine cycles run before recording, for models with memory
    #[arg(long, default_value = "20")]
    cycles: usize,
}

/// One `(input, output)` pair per row.
///
/// Memoryless models are swept statically from `min` to `max`. Models with
/// memory (diode RC networks, the triode's coupling capacitors) have no
/// meaningful static curve, so they are driven by a sine of amplitude
/// `max(|min|, |max|)` and one settled cycle is sampled at `points` phases.
pub fn sweep(args: &CurveArgs) -> anyhow::Result<Vec<(f32, f32)>> {
    let kind = circuit_kind(&args.circuit)?;
    if args.points < 2 {
        anyhow::bail!("need at least 2 points, got {}", args.points);
    }
    if !(args.sample_rate > 0.0 && args.sample_rate.is_finite()) {
        anyhow::bail!("invalid sample rate {}", args.sample_rate);
    }
    if args.max <= args.min {
        anyhow::bail!("--max ({}) must be above --min ({})", args.max, args.min);
    }
    let mut circuit = Circuit::new(kind, args.sample_rate);

    if !kind.is_stateful() {
        let span = args.max - args.min;
        let last = (args.points - 1) as f32;
        return Ok((0..args.points)
            .map(|i| {
                let x = args.min + span * i as f32 / last;
                (x, circuit.process(x))
            })
            .collect());
    }

    if !(args.freq > 0.0 && args.freq < 0.5 * args.sample_rate) {
        anyhow::bail!("--freq must lie between 0 and Nyquist, got {}", args.freq);
    }
    let amplitude = args.min.abs().max(args.max.abs());
    let period = (args.sample_rate / args.freq).round().max(2.0) as usize;
    let warmup = period
        .checked_mul(args.cycles)
        .context("too many warm-up cycles")?;
    let step = core::f32::consts::TAU / period as f32;

    let mut n = 0;
    let mut drive = || {
        let x = amplitude * libm::sinf(step * (n % period) as f32);
        n += 1;
        (x, circuit.process(x))
    };
    for _ in 0..warmup {
        drive();
    }
    let cycle: Vec<(f32, f32)> = (0..period).map(|_| drive()).collect();
    let stride = period as f32 / args.points as f32;
    Ok((0..args.points)
        .map(|i| cycle[((i as f32 * stride) as usize).min(period - 1)])
        .collect())
}

/// Run the curve command.
pub fn run(args: CurveArgs) -> anyhow::Result<()> {
    let rows = sweep(&args)?;
    tracing::debug!(circuit = %args.circuit, points = rows.len(), "curve");
    println!("input,output");
    for (x, y) in rows {
        println!("{x:.6},{y:.6}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(circuit: &str) -> CurveArgs {
        CurveArgs {
            circuit: circuit.to_string(),
            min: -3.0,
            max: 3.0,
            points: 61,
            sample_rate: 48000.0,
            freq: 100.0,
            cycles: 20,
        }
    }

    #[test]
    fn static_sweep_spans_the_range() {
        let rows = sweep(&args("opamp-tanh")).unwrap();
        assert_eq!(rows.len(), 61);
        assert_eq!(rows[0].0, -3.0);
        assert!((rows[60].0 - 3.0).abs() < 1e-5);
        assert!(rows.windows(2).all(|w| w[1].1 >= w[0].1 - 1e-5));
        assert!(rows.iter().all(|&(_, y)| y.abs() <= 1.0 + 1e-5));
    }

    #[test]
    fn stateful_models_are_driven_by_a_sine() {
        let rows = sweep(&args("germanium")).unwrap();
        assert_eq!(rows.len(), 61);
        assert!(rows.iter().all(|&(x, y)| x.abs() <= 3.0 && y.is_finite()));
        let top = rows.iter().fold(0.0_f32, |m, &(_, y)| m.max(y));
        assert!(top > 0.0);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(sweep(&args("pentode")).is_err());
        let mut bad = args("bjt");
        bad.points = 1;
        assert!(sweep(&bad).is_err());
        let mut bad = args("bjt");
        bad.max = -4.0;
        assert!(sweep(&bad).is_err());
    }
}
