//! Result of projecting a provider snapshot onto a stored row.

/// What a handler must do after merging an event into stored state.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection<T> {
    /// Row is new or changed and must be written.
    Write(T),
    /// Event carries nothing the row does not already reflect.
    NoChange,
    /// Event would move the row backwards; it is acknowledged and dropped.
    Stale {
        current: &'static str,
        incoming: &'static str,
    },
}

impl<T> Projection<T> {
    /// Returns the row to write, if any.
    pub fn into_write(self) -> Option<T> {
        match self {
            Projection::Write(row) => Some(row),
            Projection::NoChange | Projection::Stale { .. } => None,
        }
    }
}
