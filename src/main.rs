//! VQE convergence dashboard — terminal host.
//!
//! Drives the background scheduler and prints one line per tick, then a
//! convergence summary. `RUST_LOG=info` shows engine events.

use std::error::Error;
use std::time::Duration;

use clap::Parser;

use vqe_convergence_sim::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Animate synthetic VQE convergence curves")]
struct Args {
    /// Path to config TOML
    #[arg(long)]
    config: Option<String>,

    /// RNG seed (overrides config); omit for a fresh random run
    #[arg(long)]
    seed: Option<u64>,

    /// Milliseconds between ticks (overrides config)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Stop after this many ticks even if not converged (overrides config)
    #[arg(long)]
    max_ticks: Option<usize>,

    /// Values checked by the convergence test (overrides config)
    #[arg(long)]
    window: Option<usize>,

    /// Warm-up steps before convergence may trigger (overrides config)
    #[arg(long)]
    min_steps: Option<usize>,
}

impl Args {
    fn resolve(&self) -> Result<SimulationConfig, ConfigError> {
        let mut cfg = match &self.config {
            Some(path) => SimulationConfig::load(path)?,
            None => SimulationConfig::default(),
        };
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        if let Some(ms) = self.interval_ms {
            cfg.scheduler.interval_ms = ms;
        }
        if let Some(n) = self.max_ticks {
            cfg.scheduler.max_ticks = n;
        }
        if let Some(w) = self.window {
            cfg.engine.convergence_window = w;
        }
        if let Some(n) = self.min_steps {
            cfg.engine.min_steps = n;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cfg = Args::parse().resolve()?;

    println!("╔══════════════════════════════════════════════════════════════════════╗");
    println!("║                 VQE QUANTUM SIMULATOR — Convergence                  ║");
    println!("║                                                                      ║");
    println!("║  Normal VQE · VQE + UCCSD + Hybrid · VQE + UCCSD + Hybrid + ZNE      ║");
    println!("╚══════════════════════════════════════════════════════════════════════╝");
    println!();

    println!("━━━ Methods ━━━");
    println!();
    println!("  {:>28}  {:>9}  {:>9}  {:>7}  {:>7}", "Method", "E₀ (Ha)", "E∞ (Ha)", "Decay", "Noise");
    println!("  {:─>28}  {:─>9}  {:─>9}  {:─>7}  {:─>7}", "", "", "", "", "");
    for m in Method::ALL {
        let p = cfg.engine.methods.get(m);
        println!(
            "  {:>28}  {:>9.4}  {:>9.4}  {:>7.3}  {:>7.3}",
            m.label(), p.initial, p.target, p.decay_rate, p.noise_amplitude
        );
    }
    println!();
    println!(
        "  Threshold {} Ha over {} values, warm-up at least {} steps, tick every {} ms",
        cfg.engine.threshold, cfg.engine.convergence_window, cfg.engine.min_steps,
        cfg.scheduler.interval_ms
    );
    println!();

    let engine = match cfg.seed {
        Some(seed) => SeriesEngine::with_seed(cfg.engine, seed),
        None => SeriesEngine::from_entropy(cfg.engine),
    };
    let mut scheduler = TickScheduler::spawn(engine, cfg.scheduler);
    scheduler.reset();

    println!("━━━ Run ━━━");
    println!();
    println!("  {:>5}  {:>12}  {:>12}  {:>12}  {:>19}  {}", "Iter", "Normal", "Hybrid", "Hybrid+ZNE", "Y range", "Status");
    println!("  {:─>5}  {:─>12}  {:─>12}  {:─>12}  {:─>19}  {:─>22}", "", "", "", "", "", "");

    // A tick may legitimately take a full interval to arrive.
    let patience = cfg.scheduler.interval() * 2 + Duration::from_secs(1);
    let mut last: Option<Frame> = None;
    let mut outcome = None;

    while outcome.is_none() {
        match scheduler.recv_timeout(patience) {
            Some(SchedulerEvent::Frame(frame)) => {
                let cells: Vec<String> = frame
                    .result
                    .iter()
                    .map(|r| format!("{:>11.6}{}", r.value, if r.converged { "✓" } else { " " }))
                    .collect();
                println!(
                    "  {:>5}  {}  [{:>8.4}, {:>8.4}]  {}",
                    frame.result.tick,
                    cells.join(" "),
                    frame.bounds.y_min,
                    frame.bounds.y_max,
                    frame.result.status
                );
                last = Some(frame);
            }
            Some(SchedulerEvent::Finished { ticks, converged, .. }) => {
                outcome = Some((ticks, converged));
            }
            None => return Err("scheduler stopped responding".into()),
        }
    }

    println!();
    println!("━━━ Summary ━━━");
    println!();
    if let (Some((ticks, converged)), Some(frame)) = (outcome, last) {
        println!("  {:>28}  {:>12}  {:>12}", "Method", "Final E (Ha)", "Converged at");
        println!("  {:─>28}  {:─>12}  {:─>12}", "", "", "");
        for (m, history) in Method::ALL.iter().zip(frame.histories.iter()) {
            let reading = frame.result.get(*m);
            let at = if reading.converged {
                first_frozen_index(history).map_or("—".to_string(), |i| format!("iter {}", i))
            } else {
                "—".to_string()
            };
            println!("  {:>28}  {:>12.6}  {:>12}", m.label(), reading.value, at);
        }
        println!();
        if converged {
            println!("  ✅ {} after {} iterations", frame.result.status, ticks);
        } else {
            println!("  Stopped after {} iterations: {}", ticks, frame.result.status);
        }
    }

    Ok(())
}

/// Index where the trailing run of identical values begins.
fn first_frozen_index(history: &[f64]) -> Option<usize> {
    let last = *history.last()?;
    let held = history.iter().rev().take_while(|&&v| v == last).count();
    Some(history.len() - held)
}
