use thiserror::Error;

/// Error returned from driver, catalog and method operations.
///
/// All failures in the crate are explicit values of this type; no method
/// panics on bad input. Reaching an iteration budget is *not* an error: it is
/// reported as completion by [`done`](super::Method::done) and the reason is
/// logged under the session's verbosity.
#[derive(Debug, Error)]
pub enum Error {
    /// Null-equivalent, malformed or out-of-range input, including a wrong
    /// value type for a configuration name.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The configuration name is not recognized by the bound method.
    #[error("no hyper-parameter named `{0}`")]
    UnknownHParam(String),
    /// The result name is not recognized by the bound method.
    #[error("no result named `{0}`")]
    UnknownResult(String),
    /// The method cannot serve the request, e.g. a single-variate method
    /// bound to a multi-dimensional input, or an optional capability the
    /// method does not provide.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// The request is valid but premature, e.g. a result requested before
    /// completion or a seed supplied after iteration started.
    #[error("not ready: {0}")]
    NotReady(String),
    /// The call is not legal in the current state of the iteration, e.g.
    /// `next` or `set_value` after completion.
    #[error("state violation: {0}")]
    StateViolation(String),
    /// The initial endpoints of a root finder do not straddle a sign change.
    #[error("initial endpoints do not bracket a sign change")]
    BracketInvalid,
    /// A derivative or divided difference fell below the protection
    /// threshold, so the next step is numerically meaningless.
    #[error("numerical singularity: {0}")]
    Singularity(String),
    /// No catalog entry with the requested name could be instantiated.
    #[error("no method named `{0}` is available")]
    UnknownMethod(String),
    /// A session operation was invoked before any method was selected.
    #[error("no method is bound to this session")]
    NoMethod,
}
