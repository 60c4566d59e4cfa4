//! Data alignment pipeline: gap detection, resampling, timeframe checks and
//! the dual-timeframe join.

pub mod align;
pub mod gaps;
pub mod resample;
pub mod validate;

pub use align::{align, AlignedBar, AlignedSeries, FilterSnapshot, PipelineWarning};
pub use gaps::{contiguous_runs, estimate_bars, interior_gaps, missing_segments, Gap};
pub use resample::{drop_incomplete_tail, resample};
pub use validate::{validate_timeframe, TimeframeCheck, MAX_BAR_RATIO};
