//! Auto-scaled chart axes.
//!
//! The y-range is recomputed from the full accumulated history on every tick
//! rather than widened incrementally. A run is at most a few hundred ticks,
//! so the full scan is cheap.

/// Fraction of the data span added above and below.
pub const MARGIN_FRACTION: f64 = 0.10;
/// Absolute margin floor (Hartree), keeps flat lines from collapsing the axis.
pub const MIN_MARGIN: f64 = 0.1;
/// Iterations always visible on the x-axis.
pub const MIN_ITERATION_SPAN: f64 = 50.0;
/// Headroom past the latest iteration on the x-axis.
pub const ITERATION_HEADROOM: f64 = 5.0;

/// Vertical axis range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportBounds {
    pub y_min: f64,
    pub y_max: f64,
}

impl ViewportBounds {
    /// Range shown before any data exists.
    pub const DEFAULT: ViewportBounds = ViewportBounds { y_min: -2.0, y_max: 0.0 };

    pub fn new(y_min: f64, y_max: f64) -> Self {
        Self { y_min, y_max }
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn center(&self) -> f64 {
        0.5 * (self.y_min + self.y_max)
    }

    /// Strict containment: a value on the boundary counts as clipped.
    pub fn contains(&self, value: f64) -> bool {
        value > self.y_min && value < self.y_max
    }
}

impl Default for ViewportBounds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Compute y-axis bounds containing every value of every history.
///
/// margin = max(10% of span, 0.1). Non-finite values are ignored; if
/// nothing finite remains the result is [`ViewportBounds::DEFAULT`].
/// Where the margin is lost to rounding (magnitudes around 1e16 and up)
/// each bound still sits at least one representable value outside the data.
pub fn compute_bounds<I, S>(histories: I) -> ViewportBounds
where
    I: IntoIterator<Item = S>,
    S: AsRef<[f64]>,
{
    let mut raw_min = f64::INFINITY;
    let mut raw_max = f64::NEG_INFINITY;
    let mut seen = false;

    for history in histories {
        for &v in history.as_ref().iter().filter(|v| v.is_finite()) {
            raw_min = raw_min.min(v);
            raw_max = raw_max.max(v);
            seen = true;
        }
    }

    if !seen {
        return ViewportBounds::DEFAULT;
    }

    let span = raw_max - raw_min;
    let margin = (span * MARGIN_FRACTION).max(MIN_MARGIN);
    ViewportBounds::new(
        (raw_min - margin).min(next_below(raw_min)),
        (raw_max + margin).max(next_above(raw_max)),
    )
}

/// Largest `f64` strictly below a finite `x`.
fn next_below(x: f64) -> f64 {
    if x == 0.0 {
        -f64::from_bits(1)
    } else if x > 0.0 {
        f64::from_bits(x.to_bits() - 1)
    } else {
        f64::from_bits(x.to_bits() + 1)
    }
}

/// Smallest `f64` strictly above a finite `x`.
fn next_above(x: f64) -> f64 {
    -next_below(-x)
}

/// Horizontal axis range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

/// X-axis range for a series of `len` points plotted at iterations
/// 0..len: at least 50 iterations wide, and 5 iterations of headroom past
/// the latest point once the run grows beyond that.
pub fn iteration_range(len: usize) -> AxisRange {
    let last = len.saturating_sub(1) as f64;
    AxisRange {
        min: 0.0,
        max: (last + ITERATION_HEADROOM).max(MIN_ITERATION_SPAN),
    }
}
