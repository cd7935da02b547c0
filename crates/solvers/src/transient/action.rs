/// Control actions an observer can return while the engine is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop integrating and return the solution so far.
    StopEarly,
}
