/// Outcome of a read that must never fail its caller.
///
/// Metadata caches, sidecar text files and the shared status file are all
/// optional inputs: a missing or corrupt file degrades the result instead of
/// failing the request. Keeping `Absent` and `Malformed` apart lets callers
/// log or test the difference while still collapsing to an `Option`.
#[derive(Debug, Clone, PartialEq)]
pub enum BestEffort<T> {
    Present(T),
    Absent,
    Malformed(String),
}

impl<T> BestEffort<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            BestEffort::Present(value) => Some(value),
            BestEffort::Absent | BestEffort::Malformed(_) => None,
        }
    }

    pub fn as_ref(&self) -> BestEffort<&T> {
        match self {
            BestEffort::Present(value) => BestEffort::Present(value),
            BestEffort::Absent => BestEffort::Absent,
            BestEffort::Malformed(reason) => {
                BestEffort::Malformed(reason.clone())
            }
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> BestEffort<U> {
        match self {
            BestEffort::Present(value) => BestEffort::Present(f(value)),
            BestEffort::Absent => BestEffort::Absent,
            BestEffort::Malformed(reason) => BestEffort::Malformed(reason),
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, BestEffort::Present(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, BestEffort::Absent)
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, BestEffort::Malformed(_))
    }
}

impl<T> From<Option<T>> for BestEffort<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => BestEffort::Present(value),
            None => BestEffort::Absent,
        }
    }
}
