/// Receives events from a long-running driver and may steer it.
///
/// Observers are implemented for `()` (ignore every event) and for closures
/// taking `&E`, so callers rarely need a dedicated type.
pub trait Observer<E, A> {
    /// Inspects an event and optionally returns a control action.
    fn observe(&mut self, event: &E) -> Option<A>;
}

impl<E, A> Observer<E, A> for () {
    fn observe(&mut self, _event: &E) -> Option<A> {
        None
    }
}

impl<E, A, F> Observer<E, A> for F
where
    F: FnMut(&E) -> Option<A>,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self(event)
    }
}
