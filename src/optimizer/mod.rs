// Table statistics and histograms.

pub mod histogram;
pub mod stats;

pub use histogram::{IntHistogram, TextHistogram};
pub use stats::{TableStats, IO_COST_PER_PAGE, NUM_HIST_BINS};
