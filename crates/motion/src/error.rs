//! Error types for the motion planning crate.

/// Errors that can occur while admitting or committing moves.
///
/// Mirrors the firmware-wide error taxonomy's motion-relevant variants.
/// No variant here triggers unwinding; every fallible operation in this
/// crate returns one of these as a plain value.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PlannerError {
    /// Requested end position violates a configured soft limit.
    OutOfBounds,
    /// The move pool or lookahead ring is saturated and a flush pass did
    /// not free enough space.
    QueueFull,
    /// A pool (`move`, `stepper-kinematics`, or `trapq`) returned no free
    /// slot. Distinct from `QueueFull`: this is a capacity budget failure,
    /// not a backlog that a flush can resolve.
    PoolExhausted,
}

impl core::fmt::Display for PlannerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PlannerError::OutOfBounds => write!(f, "out of bounds"),
            PlannerError::QueueFull => write!(f, "queue full"),
            PlannerError::PoolExhausted => write!(f, "pool exhausted"),
        }
    }
}
