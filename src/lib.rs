//! # vqe-convergence-sim
//!
//! Synthetic convergence curves for three fictitious VQE variants, animated
//! side by side. Nothing quantum is computed here: each method follows an
//! exponential decay toward its target energy with shrinking random noise,
//! which is enough to look like an iterative optimizer settling.
//!
//! ```text
//! scheduler tick
//!   ↓ SeriesEngine::step()      one value per method, auto-stop on convergence
//!   ↓ viewport::compute_bounds  y-range over every history, 10% margin
//!   ↓ host renders
//! ```
//!
//! ## Methods
//!
//! | Method            | Decay | Noise | Character                |
//! |-------------------|-------|-------|--------------------------|
//! | Normal VQE        | 0.05  | 0.08  | slow, noisy              |
//! | + UCCSD + Hybrid  | 0.10  | 0.03  | faster, medium noise     |
//! | + ZNE             | 0.125 | 0.02  | fastest, cleanest        |
//!
//! ## Usage
//!
//! ```no_run
//! use vqe_convergence_sim::prelude::*;
//!
//! let mut engine = SeriesEngine::with_seed(EngineConfig::default(), 42);
//! while !engine.all_converged() {
//!     let tick = engine.step();
//!     let bounds = engine.bounds();
//!     println!("tick {} {} [{:.3}, {:.3}]", tick.tick, tick.status, bounds.y_min, bounds.y_max);
//! }
//! ```

pub mod method;
pub mod noise;
pub mod series;
pub mod engine;
pub mod viewport;
pub mod config;
pub mod scheduler;

pub mod prelude {
    pub use crate::method::*;
    pub use crate::noise::*;
    pub use crate::series::*;
    pub use crate::engine::*;
    pub use crate::viewport::*;
    pub use crate::config::*;
    pub use crate::scheduler::*;
}
