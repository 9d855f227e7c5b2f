//! The session driver pumping the ask/tell loop.
//!
//! A [`Session`] binds one method from a [`Catalog`] to a fixed input
//! dimensionality and mediates every call into it: argument validation,
//! best-seen tracking, verbosity gating and the mapping of method outcomes
//! onto the crate's error taxonomy. The caller owns the iteration loop and
//! the objective function; the session owns everything else.
//!
//! ```rust
//! use tandem::nalgebra::DVector;
//! use tandem::{Catalog, Session, Status};
//!
//! # fn main() -> Result<(), tandem::Error> {
//! let mut session = Session::open(Catalog::builtin());
//! session.select("nelder-mead", 2)?;
//! session.seed(&DVector::from_vec(vec![1.0, -1.0]))?;
//!
//! let mut x = DVector::zeros(2);
//! while session.done()? == Status::Continue {
//!     session.next(&mut x)?;
//!     let fx = x[0].powi(2) + x[1].powi(2);
//!     session.set_value(&x, fx)?;
//! }
//!
//! let (best, best_fx) = session.best().expect("values were observed");
//! assert!(best_fx <= 2.0);
//! assert_eq!(best.nrows(), 2);
//! # Ok(())
//! # }
//! ```

use log::{debug, error, info};
use nalgebra::DVector;

use crate::catalog::Catalog;
use crate::core::{Error, Method, Status, Value};
use crate::diagnostics::{default_verbosity, Verbosity};

/// Stateful driver binding one method to one dimensionality.
///
/// See the [module](self) documentation for the iteration loop. A session is
/// cheap to create; the catalog it is opened from is owned by the session
/// and immutable for its lifetime. Dropping the session (or calling
/// [`close`](Session::close)) releases all method-owned state regardless of
/// completion.
pub struct Session {
    catalog: Catalog,
    method: Option<Box<dyn Method>>,
    dim: usize,
    verbosity: Option<Verbosity>,
    best_x: Option<DVector<f64>>,
    best_fx: f64,
    pending: bool,
    complete: bool,
}

impl Session {
    /// Opens a session against the given catalog. No method is bound yet.
    pub fn open(catalog: Catalog) -> Self {
        Self {
            catalog,
            method: None,
            dim: 0,
            verbosity: None,
            best_x: None,
            best_fx: f64::INFINITY,
            pending: false,
            complete: false,
        }
    }

    /// Opens a session against the builtin catalog.
    pub fn builtin() -> Self {
        Self::open(Catalog::builtin())
    }

    /// Returns the catalog this session was opened from.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Returns the bound input dimensionality, zero before any selection.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns the name of the bound method, if any.
    pub fn method_name(&self) -> Option<&'static str> {
        self.method.as_ref().map(|method| method.name())
    }

    /// Sets this session's verbosity, overriding the process-wide default.
    pub fn set_verbosity(&mut self, level: Verbosity) {
        self.verbosity = Some(level);
        if let Some(method) = &mut self.method {
            method.set_verbosity(level);
        }
    }

    /// Returns the effective verbosity of this session.
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity.unwrap_or_else(default_verbosity)
    }

    /// Binds the first catalog entry named `name` that initializes for `dim`
    /// dimensions.
    ///
    /// Discards any previously bound method along with its state and resets
    /// best-seen tracking.
    pub fn select(&mut self, name: &str, dim: usize) -> Result<(), Error> {
        if dim < 1 {
            return Err(Error::InvalidArgument(format!(
                "dimension must be at least 1, got {dim}"
            )));
        }

        let verbosity = self.verbosity();
        let mut method = self.catalog.instantiate(name, dim, verbosity)?;
        method.set_verbosity(verbosity);

        if verbosity.allows(Verbosity::Info) {
            info!("selected method `{}` for {dim} dimension(s)", method.name());
        }

        self.method = Some(method);
        self.dim = dim;
        self.best_x = None;
        self.best_fx = f64::INFINITY;
        self.pending = false;
        self.complete = false;

        Ok(())
    }

    /// Returns the bound method's description text.
    pub fn info(&self) -> Result<&'static str, Error> {
        let method = self.method.as_ref().ok_or(Error::NoMethod)?;
        method.info().ok_or_else(|| {
            Error::Unsupported(format!(
                "method `{}` does not provide additional info",
                method.name()
            ))
        })
    }

    /// Sets a hyper-parameter on the bound method.
    pub fn hparam_set(&mut self, id: &str, value: impl Into<Value>) -> Result<(), Error> {
        let verbosity = self.verbosity();
        let method = self.method.as_mut().ok_or(Error::NoMethod)?;

        match method.hparam_set(id, value.into()) {
            Ok(()) => {
                if verbosity.allows(Verbosity::Info) {
                    info!("set hyper-parameter `{id}`");
                }
                Ok(())
            }
            Err(err) => {
                if verbosity.allows(Verbosity::Error) {
                    error!("failed to set hyper-parameter `{id}`: {err}");
                }
                Err(err)
            }
        }
    }

    /// Gets a hyper-parameter from the bound method.
    pub fn hparam_get(&self, id: &str) -> Result<Value, Error> {
        let method = self.method.as_ref().ok_or(Error::NoMethod)?;
        method.hparam_get(id)
    }

    /// Supplies an initial input point.
    ///
    /// Forwarded blindly; the method enforces that it is still in its
    /// initial mode.
    pub fn seed(&mut self, x: &DVector<f64>) -> Result<(), Error> {
        self.check_len(x, "seed vector")?;
        let verbosity = self.verbosity();
        let method = self.method.as_mut().ok_or(Error::NoMethod)?;

        match method.seed(x) {
            Ok(()) => {
                if verbosity.allows(Verbosity::Info) {
                    info!("seeded input vector");
                }
                Ok(())
            }
            Err(err) => {
                if verbosity.allows(Verbosity::Error) {
                    error!("failed to seed input vector: {err}");
                }
                Err(err)
            }
        }
    }

    /// Writes the next input point to evaluate into `out`.
    ///
    /// Calling `next` again before handing the value back is a state
    /// violation; the method is not re-entered.
    pub fn next(&mut self, out: &mut DVector<f64>) -> Result<(), Error> {
        self.check_len(out, "output vector")?;
        if self.complete {
            return Err(Error::StateViolation(
                "next requested after completion".into(),
            ));
        }
        if self.pending {
            return Err(Error::StateViolation(
                "next requested again before the previous point was evaluated".into(),
            ));
        }

        let verbosity = self.verbosity();
        let method = self.method.as_mut().ok_or(Error::NoMethod)?;

        match method.next(out) {
            Ok(()) => {
                self.pending = true;
                if verbosity.allows(Verbosity::Debug) {
                    debug!("retrieved next input vector");
                }
                Ok(())
            }
            Err(err) => {
                if verbosity.allows(Verbosity::Error) {
                    error!("failed to retrieve next input vector: {err}");
                }
                Err(err)
            }
        }
    }

    /// Hands the observed objective value for `x` back to the method and
    /// updates the best-seen pair.
    pub fn set_value(&mut self, x: &DVector<f64>, fx: f64) -> Result<(), Error> {
        self.check_len(x, "input vector")?;
        if self.complete {
            return Err(Error::StateViolation(
                "set_value after completion".into(),
            ));
        }
        self.pending = false;

        let verbosity = self.verbosity();
        let method = self.method.as_mut().ok_or(Error::NoMethod)?;

        match method.set_value(x, fx) {
            Ok(()) => {
                self.track_best(x, fx);
                if verbosity.allows(Verbosity::Debug) {
                    debug!("recorded objective value {fx}");
                }
                Ok(())
            }
            Err(err) => {
                if verbosity.allows(Verbosity::Error) {
                    error!("failed to record objective value: {err}");
                }
                Err(err)
            }
        }
    }

    /// As [`set_value`](Session::set_value), with the gradient of the
    /// objective at `x`.
    ///
    /// Methods that do not consume gradients fall back to plain value
    /// intake.
    pub fn set_value_with_gradient(
        &mut self,
        x: &DVector<f64>,
        fx: f64,
        gradient: &DVector<f64>,
    ) -> Result<(), Error> {
        self.check_len(x, "input vector")?;
        self.check_len(gradient, "gradient vector")?;
        if self.complete {
            return Err(Error::StateViolation(
                "set_value after completion".into(),
            ));
        }
        self.pending = false;

        let verbosity = self.verbosity();
        let method = self.method.as_mut().ok_or(Error::NoMethod)?;

        match method.set_value_with_gradient(x, fx, gradient) {
            Ok(()) => {
                self.track_best(x, fx);
                if verbosity.allows(Verbosity::Debug) {
                    debug!("recorded objective value {fx} with gradient");
                }
                Ok(())
            }
            Err(err) => {
                if verbosity.allows(Verbosity::Error) {
                    error!("failed to record objective value with gradient: {err}");
                }
                Err(err)
            }
        }
    }

    /// Checks the bound method for termination.
    pub fn done(&mut self) -> Result<Status, Error> {
        let verbosity = self.verbosity();
        let method = self.method.as_mut().ok_or(Error::NoMethod)?;

        let status = method.done()?;
        if status.is_complete() {
            if !self.complete && verbosity.allows(Verbosity::Debug) {
                debug!("method `{}` has finished", method.name());
            }
            self.complete = true;
        }
        Ok(status)
    }

    /// Returns the best input observed so far and its value.
    ///
    /// Tracked by the session across every value handed back, with ties
    /// keeping the earliest winner. `None` before the first value.
    pub fn best(&self) -> Option<(&DVector<f64>, f64)> {
        self.best_x.as_ref().map(|x| (x, self.best_fx))
    }

    /// Retrieves a named result from the bound method.
    ///
    /// Fails with [`Error::NotReady`] unless [`done`](Session::done)
    /// reports completion.
    pub fn result(&mut self, id: &str) -> Result<Value, Error> {
        if self.done()? != Status::Complete {
            return Err(Error::NotReady(format!(
                "result `{id}` requested before completion"
            )));
        }

        let method = self.method.as_ref().ok_or(Error::NoMethod)?;
        method.result(id)
    }

    /// Closes the session, releasing the bound method and its state.
    ///
    /// Dropping the session has the same effect; `close` exists for callers
    /// that want the release to be explicit.
    pub fn close(mut self) {
        if self.verbosity().allows(Verbosity::Debug) {
            if let Some(method) = &self.method {
                debug!("released method `{}`", method.name());
            }
        }
        self.method = None;
    }

    fn check_len(&self, x: &DVector<f64>, what: &str) -> Result<(), Error> {
        if self.method.is_some() && x.nrows() != self.dim {
            return Err(Error::InvalidArgument(format!(
                "{what} has length {}, expected {}",
                x.nrows(),
                self.dim
            )));
        }
        Ok(())
    }

    fn track_best(&mut self, x: &DVector<f64>, fx: f64) {
        match &mut self.best_x {
            Some(best) if fx < self.best_fx => {
                best.copy_from(x);
                self.best_fx = fx;
            }
            None => {
                self.best_x = Some(x.clone());
                self.best_fx = fx;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out scripted points and completes after a fixed number of
    /// evaluations, for driver-level tests.
    struct Scripted {
        points: Vec<Vec<f64>>,
        served: usize,
        received: usize,
    }

    impl Scripted {
        fn new(points: Vec<Vec<f64>>) -> Self {
            Self {
                points,
                served: 0,
                received: 0,
            }
        }
    }

    impl Method for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn hparam_set(&mut self, id: &str, _value: Value) -> Result<(), Error> {
            Err(Error::UnknownHParam(id.to_owned()))
        }

        fn hparam_get(&self, id: &str) -> Result<Value, Error> {
            Err(Error::UnknownHParam(id.to_owned()))
        }

        fn next(&mut self, out: &mut DVector<f64>) -> Result<(), Error> {
            if self.served >= self.points.len() {
                return Err(Error::StateViolation("script exhausted".into()));
            }
            out.copy_from(&DVector::from_vec(self.points[self.served].clone()));
            self.served += 1;
            Ok(())
        }

        fn set_value(&mut self, _x: &DVector<f64>, _fx: f64) -> Result<(), Error> {
            if self.received >= self.points.len() {
                return Err(Error::StateViolation("script exhausted".into()));
            }
            self.received += 1;
            Ok(())
        }

        fn done(&mut self) -> Result<Status, Error> {
            Ok(if self.received >= self.points.len() {
                Status::Complete
            } else {
                Status::Continue
            })
        }
    }

    fn scripted_catalog(points: Vec<Vec<f64>>) -> Catalog {
        let mut catalog = Catalog::empty();
        catalog.register("scripted", "test", move |_| {
            Ok(Box::new(Scripted::new(points.clone())))
        });
        catalog
    }

    #[test]
    fn sessions_move_between_threads() {
        fn assert_send<T: Send>() {}
        assert_send::<Session>();

        let handle = std::thread::spawn(|| {
            let mut session = Session::builtin();
            session.select("bisection", 1).unwrap();
            session.hparam_set("lower", 0.0).unwrap();
            session.hparam_set("upper", 2.0).unwrap();

            let mut x = DVector::zeros(1);
            while session.done().unwrap() == Status::Continue {
                session.next(&mut x).unwrap();
                let fx = x[0] * x[0] - 2.0;
                session.set_value(&x, fx).unwrap();
            }
            session.result("root").unwrap().as_float().unwrap()
        });

        let root = handle.join().unwrap();
        assert!((root - 2f64.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn no_method_bound() {
        let mut session = Session::builtin();
        let mut x = DVector::zeros(1);

        assert!(matches!(session.next(&mut x), Err(Error::NoMethod)));
        assert!(matches!(session.done(), Err(Error::NoMethod)));
        assert!(matches!(session.hparam_get("x_0"), Err(Error::NoMethod)));
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let mut session = Session::builtin();
        assert!(matches!(
            session.select("bisection", 0),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn single_variate_methods_reject_higher_dimensions() {
        let mut session = Session::builtin();
        for name in [
            "bisection",
            "secant",
            "newton-raphson",
            "brent-dekker",
            "brents-localmin",
            "trapezoidal",
            "simpson",
        ] {
            assert!(
                matches!(session.select(name, 2), Err(Error::Unsupported(_))),
                "`{name}` accepted 2 dimensions"
            );
        }
    }

    #[test]
    fn unknown_method() {
        let mut session = Session::builtin();
        assert!(matches!(
            session.select("no-such-method", 1),
            Err(Error::UnknownMethod(_))
        ));
    }

    #[test]
    fn double_next_is_a_state_violation() {
        let mut session = Session::open(scripted_catalog(vec![vec![0.0], vec![1.0]]));
        session.select("scripted", 1).unwrap();

        let mut x = DVector::zeros(1);
        session.next(&mut x).unwrap();
        assert!(matches!(
            session.next(&mut x),
            Err(Error::StateViolation(_))
        ));

        // Supplying the value unblocks the loop again.
        session.set_value(&x, 1.0).unwrap();
        session.next(&mut x).unwrap();
    }

    #[test]
    fn best_is_argmin_with_earliest_tie() {
        let points = vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]];
        let mut session = Session::open(scripted_catalog(points.clone()));
        session.select("scripted", 1).unwrap();

        let values = [5.0, 2.0, 2.0, 7.0];
        let mut x = DVector::zeros(1);
        for fx in values {
            session.next(&mut x).unwrap();
            session.set_value(&x, fx).unwrap();
        }

        let (best, best_fx) = session.best().unwrap();
        assert_eq!(best_fx, 2.0);
        // The first of the tied minima wins.
        assert_eq!(best[0], 2.0);
    }

    #[test]
    fn result_before_completion_is_not_ready() {
        let mut session = Session::open(scripted_catalog(vec![vec![0.0]]));
        session.select("scripted", 1).unwrap();

        assert!(matches!(
            session.result("anything"),
            Err(Error::NotReady(_))
        ));
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut session = Session::open(scripted_catalog(vec![vec![0.0, 0.0]]));
        session.select("scripted", 2).unwrap();

        let mut short = DVector::zeros(1);
        assert!(matches!(
            session.next(&mut short),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            session.set_value(&short, 0.0),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn select_resets_best_tracking() {
        let mut session = Session::open(scripted_catalog(vec![vec![0.0], vec![1.0]]));
        session.select("scripted", 1).unwrap();

        let mut x = DVector::zeros(1);
        session.next(&mut x).unwrap();
        session.set_value(&x, -3.0).unwrap();
        assert!(session.best().is_some());

        session.select("scripted", 1).unwrap();
        assert!(session.best().is_none());
    }

    #[test]
    fn session_reports_method_name() {
        let mut session = Session::builtin();
        assert_eq!(session.method_name(), None);
        session.select("bisection", 1).unwrap();
        assert_eq!(session.method_name(), Some("bisection"));
    }

    #[test]
    fn info_is_forwarded() {
        let mut session = Session::builtin();
        session.select("bisection", 1).unwrap();
        assert!(session.info().unwrap().contains("bisection"));
    }

    #[test]
    fn gradient_intake_works_through_the_session() {
        let mut session = Session::builtin();
        session.select("newton-raphson", 1).unwrap();
        session.hparam_set("x_0", 1.5).unwrap();
        session.hparam_set("f_tol", 1e-10).unwrap();

        crate::testing::drive_with_gradient(
            &mut session,
            |x| x[0] * x[0] - 2.0,
            |x| DVector::from_vec(vec![2.0 * x[0]]),
            100,
        )
        .unwrap();

        let root = session.result("root").unwrap().as_float().unwrap();
        assert!((root - 2f64.sqrt()).abs() < 1e-5);

        let (_, best_fx) = session.best().unwrap();
        assert!(best_fx.abs() < 1e-10);
    }

    #[test]
    fn full_root_finding_loop() {
        let mut session = Session::builtin();
        session.select("bisection", 1).unwrap();
        session.hparam_set("lower", 1.0).unwrap();
        session.hparam_set("upper", 2.0).unwrap();

        let mut x = DVector::zeros(1);
        while session.done().unwrap() == Status::Continue {
            session.next(&mut x).unwrap();
            let fx = x[0] * x[0] - 2.0;
            session.set_value(&x, fx).unwrap();
        }

        let root = session.result("root").unwrap().as_float().unwrap();
        assert!((root - 2f64.sqrt()).abs() < 1e-5);

        // Post-completion calls are state violations (driver may not call
        // into the method).
        assert!(matches!(
            session.next(&mut x),
            Err(Error::StateViolation(_))
        ));
        assert!(matches!(
            session.set_value(&x, 0.0),
            Err(Error::StateViolation(_))
        ));
    }
}
