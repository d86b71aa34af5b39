use railscope_core::prelude::Dataset;

/// Immutable snapshot shared by every handler. The engine never mutates
/// rows, so concurrent requests need no locking.
#[derive(Debug)]
pub struct AppState {
    pub dataset: Dataset,
    pub od_top_n: usize,
}
