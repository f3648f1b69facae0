//! Gap filling for partially observed series

/// Replace each gap with the next observed value. Trailing gaps stay empty.
pub fn back_fill(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut filled = values.to_vec();
    let mut next = None;

    for slot in filled.iter_mut().rev() {
        match slot {
            Some(v) => next = Some(*v),
            None => *slot = next,
        }
    }

    filled
}

/// Replace each gap with the previous observed value. Leading gaps stay empty.
pub fn forward_fill(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut filled = values.to_vec();
    let mut previous = None;

    for slot in filled.iter_mut() {
        match slot {
            Some(v) => previous = Some(*v),
            None => *slot = previous,
        }
    }

    filled
}

/// Back-fill then forward-fill.
///
/// Returns `None` only when the series has no observed value at all; any
/// series with at least one value comes back fully defined.
pub fn fill_gaps(values: &[Option<f64>]) -> Option<Vec<f64>> {
    forward_fill(&back_fill(values)).into_iter().collect()
}
