//! Debug-mode state validation.
//!
//! None of this runs unless the store was created with `debug_mode`.

use std::any::type_name;

use crate::error::StoreError;
use crate::mvi::MviState;

/// Apply `reducer` twice to `state` and require equal results.
pub(crate) fn apply_checked<S, F>(state: &S, reducer: F) -> Result<S, StoreError>
where
    S: MviState,
    F: Fn(&S) -> S,
{
    let first = reducer(state);
    let second = reducer(state);
    if first != second {
        return Err(StoreError::PurityViolation {
            state_type: type_name::<S>(),
        });
    }
    Ok(first)
}

/// Detects a published state changing after publication.
///
/// States are values, so the only way a published snapshot can change is
/// shared interior mutability (`Arc<Mutex<_>>`, atomics, cells). The checker
/// keeps the previous snapshot with its rendering and compares on each change.
pub(crate) struct MutableStateChecker<S> {
    previous: S,
    rendered: String,
}

impl<S: MviState> MutableStateChecker<S> {
    pub(crate) fn new(initial: &S) -> Self {
        Self {
            previous: initial.clone(),
            rendered: format!("{initial:?}"),
        }
    }

    pub(crate) fn on_state_changed(&mut self, state: &S) -> Result<(), StoreError> {
        if format!("{:?}", self.previous) != self.rendered {
            return Err(StoreError::MutatedState {
                state_type: type_name::<S>(),
            });
        }
        self.previous = state.clone();
        self.rendered = format!("{state:?}");
        Ok(())
    }
}

/// One-time structural validation of a state value.
///
/// Dedup and the purity check both rely on `Clone` producing an equal value
/// and `PartialEq` being reflexive; a state violating either would emit on
/// every publish or fail every reducer.
pub(crate) fn validate_shape<S: MviState>(state: &S) -> Result<(), StoreError> {
    let state_type = type_name::<S>();
    if !PartialEq::eq(state, state) {
        return Err(StoreError::StateShape {
            state_type,
            reason: "PartialEq is not reflexive".to_string(),
        });
    }
    let copy = state.clone();
    if copy != *state {
        return Err(StoreError::StateShape {
            state_type,
            reason: "a clone does not compare equal to the original".to_string(),
        });
    }
    if format!("{copy:?}") != format!("{state:?}") {
        return Err(StoreError::StateShape {
            state_type,
            reason: "Debug output differs between a value and its clone".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct Count(i32);
    impl MviState for Count {}

    #[test]
    fn pure_reducer_passes() {
        let next = apply_checked(&Count(1), |s| Count(s.0 + 1)).unwrap();
        assert_eq!(next, Count(2));
    }

    #[test]
    fn impure_reducer_is_rejected() {
        let calls = Mutex::new(0);
        let result = apply_checked(&Count(0), |_| {
            let mut calls = calls.lock();
            *calls += 1;
            Count(*calls)
        });
        assert!(matches!(result, Err(StoreError::PurityViolation { .. })));
    }

    #[derive(Debug, Clone)]
    struct Shared(Arc<Mutex<i32>>);

    impl PartialEq for Shared {
        fn eq(&self, other: &Self) -> bool {
            Arc::ptr_eq(&self.0, &other.0)
        }
    }
    impl MviState for Shared {}

    #[test]
    fn mutation_of_previous_state_is_detected() {
        let cell = Arc::new(Mutex::new(0));
        let first = Shared(Arc::clone(&cell));
        let mut checker = MutableStateChecker::new(&first);

        *cell.lock() = 5;
        let second = Shared(Arc::new(Mutex::new(1)));
        let result = checker.on_state_changed(&second);
        assert!(matches!(result, Err(StoreError::MutatedState { .. })));
    }

    #[test]
    fn untouched_previous_state_passes() {
        let mut checker = MutableStateChecker::new(&Count(0));
        assert!(checker.on_state_changed(&Count(1)).is_ok());
        assert!(checker.on_state_changed(&Count(2)).is_ok());
    }

    #[derive(Debug, Clone)]
    struct NotReflexive(f64);

    impl PartialEq for NotReflexive {
        fn eq(&self, other: &Self) -> bool {
            self.0 == other.0
        }
    }
    impl MviState for NotReflexive {}

    #[test]
    fn non_reflexive_state_fails_validation() {
        let result = validate_shape(&NotReflexive(f64::NAN));
        assert!(matches!(result, Err(StoreError::StateShape { .. })));
        assert!(validate_shape(&NotReflexive(1.0)).is_ok());
    }
}
