use crate::error::TrussError;

use log::info;
use std::time::Instant;

/// Wall-clock stage timer. Observability only; never feeds back into results.
pub(crate) struct Clock {
    label: &'static str,
    start: Instant,
    last: Instant,
}

impl Clock {
    pub(crate) fn start(label: &'static str) -> Self {
        let now = Instant::now();
        Clock {
            label,
            start: now,
            last: now,
        }
    }

    pub(crate) fn tick(&mut self, what: &str) {
        let now = Instant::now();
        info!(
            "[{}] {}: {:.3?} (total {:.3?})",
            self.label,
            what,
            now - self.last,
            now - self.start
        );
        self.last = now;
    }
}

/// Reserves and fills a large buffer, surfacing failure instead of aborting.
pub(crate) fn try_vec<T: Clone>(value: T, len: usize) -> Result<Vec<T>, TrussError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| TrussError::Allocation(len * std::mem::size_of::<T>()))?;
    v.resize(len, value);
    Ok(v)
}

/// Same, for element types that cannot be cloned (atomics).
pub(crate) fn try_vec_with<T>(
    len: usize,
    f: impl FnMut(usize) -> T,
) -> Result<Vec<T>, TrussError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| TrussError::Allocation(len * std::mem::size_of::<T>()))?;
    v.extend((0..len).map(f));
    Ok(v)
}
