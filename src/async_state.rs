//! State of an asynchronous operation held inside view state.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque extra data attached to a successful result.
///
/// Ignored by equality, so attaching metadata never causes an emission by
/// itself.
pub type Metadata = Arc<dyn Any + Send + Sync>;

/// A captured failure of an async source.
///
/// Two errors are equal only if they are the same capture, so a retried
/// operation that fails the same way still produces a new state.
#[derive(Clone)]
pub struct AsyncError(Arc<anyhow::Error>);

impl AsyncError {
    pub fn new(error: impl Into<anyhow::Error>) -> Self {
        Self(Arc::new(error.into()))
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.0.downcast_ref::<E>()
    }
}

impl PartialEq for AsyncError {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for AsyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AsyncError({:?})", self.0)
    }
}

impl fmt::Display for AsyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Progress of an async operation.
///
/// `Loading` and `Fail` may carry the previous value so a view can keep
/// showing stale data while refreshing or after an error.
#[derive(Clone)]
pub enum Async<T> {
    Uninitialized,
    Loading {
        value: Option<T>,
    },
    Success {
        value: T,
        metadata: Option<Metadata>,
    },
    Fail {
        error: AsyncError,
        value: Option<T>,
    },
}

impl<T> Default for Async<T> {
    fn default() -> Self {
        Async::Uninitialized
    }
}

impl<T> Async<T> {
    pub fn loading() -> Self {
        Async::Loading { value: None }
    }

    pub fn success(value: T) -> Self {
        Async::Success {
            value,
            metadata: None,
        }
    }

    pub fn fail(error: impl Into<anyhow::Error>) -> Self {
        Async::Fail {
            error: AsyncError::new(error),
            value: None,
        }
    }

    /// The available value: the result on success, or the value retained
    /// by `Loading`/`Fail`.
    pub fn value(&self) -> Option<&T> {
        match self {
            Async::Uninitialized => None,
            Async::Loading { value } | Async::Fail { value, .. } => value.as_ref(),
            Async::Success { value, .. } => Some(value),
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Async::Uninitialized => None,
            Async::Loading { value } | Async::Fail { value, .. } => value,
            Async::Success { value, .. } => Some(value),
        }
    }

    /// Finished, successfully or not.
    pub fn is_complete(&self) -> bool {
        matches!(self, Async::Success { .. } | Async::Fail { .. })
    }

    /// Nothing has been loaded yet, or the last attempt failed.
    pub fn should_load(&self) -> bool {
        matches!(self, Async::Uninitialized | Async::Fail { .. })
    }

    pub fn is_uninitialized(&self) -> bool {
        matches!(self, Async::Uninitialized)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Async::Loading { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Async::Success { .. })
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Async::Fail { .. })
    }

    pub fn error(&self) -> Option<&AsyncError> {
        match self {
            Async::Fail { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Metadata attached on success, downcast to `M`.
    pub fn metadata<M: Any + Send + Sync>(&self) -> Option<&M> {
        match self {
            Async::Success {
                metadata: Some(metadata),
                ..
            } => metadata.downcast_ref::<M>(),
            _ => None,
        }
    }

    pub fn with_metadata(self, metadata: Metadata) -> Self {
        match self {
            Async::Success { value, .. } => Async::Success {
                value,
                metadata: Some(metadata),
            },
            other => other,
        }
    }

    pub fn map<U, F>(self, f: F) -> Async<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Async::Uninitialized => Async::Uninitialized,
            Async::Loading { value } => Async::Loading { value: value.map(f) },
            Async::Success { value, metadata } => Async::Success {
                value: f(value),
                metadata,
            },
            Async::Fail { error, value } => Async::Fail {
                error,
                value: value.map(f),
            },
        }
    }
}

impl<T: PartialEq> PartialEq for Async<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Async::Uninitialized, Async::Uninitialized) => true,
            (Async::Loading { value: a }, Async::Loading { value: b }) => a == b,
            (Async::Success { value: a, .. }, Async::Success { value: b, .. }) => a == b,
            (
                Async::Fail {
                    error: ea,
                    value: a,
                },
                Async::Fail {
                    error: eb,
                    value: b,
                },
            ) => ea == eb && a == b,
            _ => false,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Async<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Async::Uninitialized => f.write_str("Uninitialized"),
            Async::Loading { value } => f.debug_struct("Loading").field("value", value).finish(),
            Async::Success { value, metadata } => f
                .debug_struct("Success")
                .field("value", value)
                .field("metadata", &metadata.is_some())
                .finish(),
            Async::Fail { error, value } => f
                .debug_struct("Fail")
                .field("error", error)
                .field("value", value)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_covers_retained_values() {
        assert_eq!(Async::<i32>::Uninitialized.value(), None);
        assert_eq!(Async::Loading { value: Some(1) }.value(), Some(&1));
        assert_eq!(Async::success(2).value(), Some(&2));
        let fail = Async::Fail {
            error: AsyncError::new(anyhow::anyhow!("boom")),
            value: Some(3),
        };
        assert_eq!(fail.value(), Some(&3));
    }

    #[test]
    fn flags() {
        let fail = Async::<i32>::fail(anyhow::anyhow!("boom"));
        assert!(fail.is_complete() && fail.should_load() && fail.is_fail());
        assert!(Async::<i32>::Uninitialized.should_load());
        assert!(!Async::<i32>::loading().is_complete());
        assert!(Async::success(1).is_complete());
        assert!(!Async::success(1).should_load());
    }

    #[test]
    fn metadata_is_ignored_by_equality() {
        let plain = Async::success(1);
        let tagged = Async::success(1).with_metadata(Arc::new("page-2"));
        assert_eq!(plain, tagged);
        assert_eq!(tagged.metadata::<&str>(), Some(&"page-2"));
        assert_eq!(tagged.metadata::<u32>(), None);
    }

    #[test]
    fn errors_compare_by_identity() {
        let error = AsyncError::new(anyhow::anyhow!("boom"));
        let a: Async<i32> = Async::Fail {
            error: error.clone(),
            value: None,
        };
        let b: Async<i32> = Async::Fail { error, value: None };
        assert_eq!(a, b);
        assert_ne!(
            Async::<i32>::fail(anyhow::anyhow!("boom")),
            Async::<i32>::fail(anyhow::anyhow!("boom"))
        );
    }

    #[test]
    fn map_keeps_shape() {
        let mapped = Async::Loading { value: Some(2) }.map(|v| v * 10);
        assert_eq!(mapped, Async::Loading { value: Some(20) });
        assert_eq!(Async::success(2).map(|v| v.to_string()).value(), Some(&"2".to_string()));
    }

    #[test]
    fn downcast_error() {
        let error = AsyncError::new(std::io::Error::other("disk"));
        assert!(error.downcast_ref::<std::io::Error>().is_some());
        assert_eq!(error.to_string(), "disk");
    }
}
