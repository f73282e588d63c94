//! Compare convergence rules across seeds.
//!
//! The successive-difference rule (window 2) fires on the first quiet step
//! after warm-up; the 5-value window waits for a settled tail. Prints the
//! step at which each method froze under both rules.

use vqe_convergence_sim::prelude::*;

fn converged_steps(config: EngineConfig, seed: u64) -> [Option<usize>; 3] {
    let mut engine = SeriesEngine::with_seed(config, seed);
    while !engine.all_converged() && engine.ticks() < 500 {
        engine.step();
    }
    Method::ALL.map(|m| engine.series(m).converged_at())
}

fn fmt_step(step: Option<usize>) -> String {
    step.map_or("—".to_string(), |k| k.to_string())
}

fn main() {
    println!("=== Convergence rule comparison ===");
    println!();
    println!("  {:>4}  {:>8}  {:>22}  {:>22}  {:>22}", "Seed", "Window", "Normal", "Hybrid", "Hybrid+ZNE");
    println!("  {:─>4}  {:─>8}  {:─>22}  {:─>22}  {:─>22}", "", "", "", "", "");

    for seed in 0..8u64 {
        for window in [2usize, 5] {
            let steps = converged_steps(EngineConfig::default().with_window(window), seed);
            println!(
                "  {:>4}  {:>8}  {:>22}  {:>22}  {:>22}",
                seed,
                window,
                fmt_step(steps[0]),
                fmt_step(steps[1]),
                fmt_step(steps[2])
            );
        }
    }
    println!();

    let mut totals = [[0usize; 3]; 2];
    let seeds = 200u64;
    for seed in 0..seeds {
        for (w, window) in [2usize, 5].iter().enumerate() {
            let steps = converged_steps(EngineConfig::default().with_window(*window), seed);
            for (i, s) in steps.iter().enumerate() {
                totals[w][i] += s.unwrap_or(500);
            }
        }
    }
    println!("Mean convergence step over {} seeds:", seeds);
    for (w, window) in [2usize, 5].iter().enumerate() {
        let means: Vec<String> = totals[w]
            .iter()
            .map(|t| format!("{:.1}", *t as f64 / seeds as f64))
            .collect();
        println!("  window {}: {}", window, means.join("  "));
    }
}
