use nalgebra::DVector;

use super::{Error, Value};
use crate::diagnostics::Verbosity;

/// Completion status reported by [`Method::done`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The method needs more evaluations; keep pumping the loop.
    Continue,
    /// The method has terminated; results may be retrieved.
    Complete,
}

impl Status {
    /// Returns `true` for [`Status::Complete`].
    pub fn is_complete(self) -> bool {
        self == Status::Complete
    }
}

/// Common interface implemented by every method in the toolbox.
///
/// A method is a resumable state machine driven from the outside: the caller
/// repeatedly asks for the next input point with [`next`](Method::next),
/// evaluates its own objective function and hands the observation back with
/// [`set_value`](Method::set_value) (or
/// [`set_value_with_gradient`](Method::set_value_with_gradient)), until
/// [`done`](Method::done) reports [`Status::Complete`]. The method never
/// calls user code; everything it needs to resume is captured in its own
/// state between calls.
///
/// Most callers do not use this trait directly but go through a
/// [`Session`](crate::driver::Session), which adds argument validation,
/// best-seen tracking and diagnostics on top.
///
/// ## Implementing a method
///
/// Here is a one-shot "method" that asks for a single point and is done:
///
/// ```rust
/// use tandem::nalgebra::DVector;
/// use tandem::{Error, Method, Status, Value};
///
/// struct Probe {
///     point: DVector<f64>,
///     value: Option<f64>,
/// }
///
/// impl Method for Probe {
///     fn name(&self) -> &'static str {
///         "probe"
///     }
///
///     fn hparam_set(&mut self, id: &str, _value: Value) -> Result<(), Error> {
///         Err(Error::UnknownHParam(id.to_owned()))
///     }
///
///     fn hparam_get(&self, id: &str) -> Result<Value, Error> {
///         Err(Error::UnknownHParam(id.to_owned()))
///     }
///
///     fn next(&mut self, out: &mut DVector<f64>) -> Result<(), Error> {
///         if self.value.is_some() {
///             return Err(Error::StateViolation("probe already evaluated".into()));
///         }
///         out.copy_from(&self.point);
///         Ok(())
///     }
///
///     fn set_value(&mut self, _x: &DVector<f64>, fx: f64) -> Result<(), Error> {
///         self.value = Some(fx);
///         Ok(())
///     }
///
///     fn done(&mut self) -> Result<Status, Error> {
///         Ok(if self.value.is_some() {
///             Status::Complete
///         } else {
///             Status::Continue
///         })
///     }
/// }
/// ```
///
/// Methods are `Send` so that independent sessions can run on parallel
/// threads; they are never shared between threads, so `Sync` is not
/// required.
pub trait Method: Send {
    /// Canonical name of the method, as matched during catalog selection.
    fn name(&self) -> &'static str;

    /// Human-readable description of the method, its hyper-parameters and
    /// its results. `None` when the method provides no description.
    fn info(&self) -> Option<&'static str> {
        None
    }

    /// Sets the verbosity level gating the method's diagnostic output.
    fn set_verbosity(&mut self, _level: Verbosity) {}

    /// Sets the hyper-parameter named `id`.
    ///
    /// Unknown names fail with [`Error::UnknownHParam`], values of the wrong
    /// type with [`Error::InvalidArgument`]. Out-of-range values that the
    /// method can repair or tolerate are accepted with a warning.
    fn hparam_set(&mut self, id: &str, value: Value) -> Result<(), Error>;

    /// Gets the hyper-parameter named `id`.
    fn hparam_get(&self, id: &str) -> Result<Value, Error>;

    /// Supplies an initial input point.
    ///
    /// Only valid while the method is in its initial mode; afterwards it
    /// fails with [`Error::NotReady`]. Methods without a seedable start
    /// reject the call with [`Error::Unsupported`].
    fn seed(&mut self, _x: &DVector<f64>) -> Result<(), Error> {
        Err(Error::Unsupported(format!(
            "method `{}` does not accept a seed",
            self.name()
        )))
    }

    /// Writes the next input point to evaluate into `out`.
    ///
    /// Must fail with [`Error::StateViolation`] once [`done`](Method::done)
    /// has reported [`Status::Complete`].
    fn next(&mut self, out: &mut DVector<f64>) -> Result<(), Error>;

    /// Records `f(x) = fx` and advances the state machine by one step.
    ///
    /// The vector must hold the point produced by the most recent
    /// [`next`](Method::next); only its contents matter, not its identity.
    fn set_value(&mut self, x: &DVector<f64>, fx: f64) -> Result<(), Error>;

    /// Records `f(x) = fx` along with the gradient of `f` at `x`.
    ///
    /// Methods that do not consume gradients fall back to
    /// [`set_value`](Method::set_value); methods that require them override
    /// this and reject plain `set_value`.
    fn set_value_with_gradient(
        &mut self,
        x: &DVector<f64>,
        fx: f64,
        _gradient: &DVector<f64>,
    ) -> Result<(), Error> {
        self.set_value(x, fx)
    }

    /// Checks for termination.
    ///
    /// May finalize results as a side effect, which is why it takes `&mut
    /// self`. A terminal failure (e.g. an invalid bracket) is reported as an
    /// error.
    fn done(&mut self) -> Result<Status, Error>;

    /// Gets the result named `id`, valid only after completion.
    ///
    /// Fails with [`Error::NotReady`] before completion and
    /// [`Error::UnknownResult`] for unrecognized names. Methods without
    /// named results reject every name.
    fn result(&self, id: &str) -> Result<Value, Error> {
        Err(Error::UnknownResult(id.to_owned()))
    }
}
