//! Tagged success/failure values for expected negotiation outcomes.

/// Result of a business decision that may legitimately fail.
///
/// Unlike [`AuthResult`](crate::AuthResult), a `Failure` here is not an
/// error: it carries the information needed to continue (for tickets, the
/// claims that are still missing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<S, F> {
    /// The decision succeeded.
    Success(S),
    /// The decision failed with a descriptive value.
    Failure(F),
}

impl<S, F> Outcome<S, F> {
    /// Returns `true` for `Success`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns `true` for `Failure`.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Returns the success value, if any.
    pub fn success(self) -> Option<S> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// Returns the failure value, if any.
    pub fn failure(self) -> Option<F> {
        match self {
            Self::Success(_) => None,
            Self::Failure(value) => Some(value),
        }
    }

    /// Maps the success value.
    pub fn map<T>(self, f: impl FnOnce(S) -> T) -> Outcome<T, F> {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Failure(value) => Outcome::Failure(value),
        }
    }

    /// Maps the failure value.
    pub fn map_failure<G>(self, f: impl FnOnce(F) -> G) -> Outcome<S, G> {
        match self {
            Self::Success(value) => Outcome::Success(value),
            Self::Failure(value) => Outcome::Failure(f(value)),
        }
    }

    /// Converts into a standard `Result`.
    pub fn into_result(self) -> Result<S, F> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(value) => Err(value),
        }
    }
}

impl<S, F> From<Result<S, F>> for Outcome<S, F> {
    fn from(result: Result<S, F>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(value) => Self::Failure(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let ok: Outcome<u32, &str> = Outcome::Success(3);
        assert!(ok.is_success());
        assert_eq!(ok.clone().success(), Some(3));
        assert_eq!(ok.failure(), None);

        let failed: Outcome<u32, &str> = Outcome::Failure("missing");
        assert!(failed.is_failure());
        assert_eq!(failed.into_result(), Err("missing"));
    }

    #[test]
    fn test_outcome_map() {
        let ok: Outcome<u32, &str> = Outcome::Success(3);
        assert_eq!(ok.map(|v| v * 2), Outcome::Success(6));

        let failed: Outcome<u32, &str> = Outcome::Failure("x");
        assert_eq!(failed.map_failure(str::len), Outcome::Failure(1));
    }
}
