//! The reducer abstraction.

use crate::effect::Effect;
use smallvec::SmallVec;

/// The Reducer trait - owns every state transition of an aggregate
///
/// Reducers validate the action, update the state in place and return descriptions of
/// the effects to run. They never perform I/O themselves.
///
/// # Example
///
/// ```ignore
/// impl Reducer for BookingReducer {
///     type State = BookingState;
///     type Action = BookingAction;
///     type Environment = BookingEnvironment;
///
///     fn reduce(
///         &self,
///         state: &mut BookingState,
///         action: BookingAction,
///         env: &BookingEnvironment,
///     ) -> SmallVec<[Effect; 4]> {
///         // ...
///     }
/// }
/// ```
pub trait Reducer {
    /// The state type this reducer operates on
    type State;

    /// The action type this reducer processes
    type Action;

    /// The environment type with injected dependencies
    type Environment;

    /// Reduce an action into state changes and effects
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect; 4]>;
}
