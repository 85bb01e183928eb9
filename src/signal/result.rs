//! Result policies: how a signal aggregates the per-callback outcomes
//! collected by one `emit`.

/// Strategy for aggregating callback results across one `emit`.
pub trait ResultPolicy<R>: Default {
    /// What `Signal::results` hands back to the caller.
    type Output;

    /// Folds one more callback's result into the aggregate.
    fn push(&mut self, value: R);

    /// Non-destructive read of the current aggregate.
    fn snapshot(&self) -> Self::Output;

    /// Resets the aggregate to its initial state.
    fn clear(&mut self);
}

/// Keeps only the most recently pushed value.
#[derive(Debug, Default)]
pub struct Last<R> {
    value: Option<R>,
}

impl<R: Clone> ResultPolicy<R> for Last<R> {
    type Output = Option<R>;

    fn push(&mut self, value: R) {
        self.value = Some(value);
    }

    fn snapshot(&self) -> Self::Output {
        self.value.clone()
    }

    fn clear(&mut self) {
        self.value = None;
    }
}

/// Accumulates every pushed value in arrival order, thread-safe FIFO
/// semantics from the producer side (pushing never blocks — it's a
/// plain `Vec::push` guarded by the signal's own lock).
#[derive(Debug, Default)]
pub struct Queue<R> {
    items: Vec<R>,
}

impl<R: Clone> ResultPolicy<R> for Queue<R> {
    type Output = Vec<R>;

    fn push(&mut self, value: R) {
        self.items.push(value);
    }

    fn snapshot(&self) -> Self::Output {
        self.items.clone()
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}

/// Discards every result; `results()` always yields `()`.
#[derive(Debug, Default)]
pub struct NoResult<R> {
    _marker: std::marker::PhantomData<R>,
}

impl<R> ResultPolicy<R> for NoResult<R> {
    type Output = ();

    fn push(&mut self, _value: R) {}

    fn snapshot(&self) -> Self::Output {}

    fn clear(&mut self) {}
}
