//! Secant root finder.
//!
//! The [secant method](https://en.wikipedia.org/wiki/Secant_method) draws a
//! line through the two most recent points on the function and follows it to
//! the x-axis to obtain the next query point. Convergence is superlinear
//! when it works, but unlike bisection nothing guarantees progress.
//!
//! **Important:** only one-dimensional inputs are supported.
//!
//! # References
//!
//! \[1\] Fausett, L.V. (2002). Numerical Methods: Algorithms and
//! Applications. ISBN 0-13-031400-5

use getset::{CopyGetters, Setters};
use log::error;
use nalgebra::DVector;

use crate::core::{Error, Method, Status, Value};
use crate::diagnostics::{default_verbosity, Verbosity};

/// Protection threshold for the divided difference in the update step.
const SINGULARITY_EPS: f64 = 1e-6;

const INFO: &str = "\
The secant method is a root finding method that uses two points on the
function to construct a line, then extends that line to the x-axis to
find a new point to construct a line through.

Hyper-parameters:
name    required        type    default Description
x_0     REQUIRED        float   none    x value for first point.
x_1     REQUIRED        float   none    x value for second point.
f_tol   optional        float   1e-6    Method stops when |f(x)| < f_tol.

Results:
name    type    Description
root    float   The value of x where |f(x)| < f_tol.

References:
Fausett, L.V. (2002). Numerical Methods: Algorithms and Applications.
        ISBN 0-13-031400-5
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    Running,
    Failed,
    Done,
}

/// Secant root finder. See [module](self) documentation for more details.
#[derive(CopyGetters, Setters)]
pub struct Secant {
    state: State,
    verbosity: Verbosity,

    /// First bootstrap point. Default: `0`.
    #[getset(get_copy = "pub", set = "pub")]
    x_0: f64,
    /// Second bootstrap point. Default: `0`.
    #[getset(get_copy = "pub", set = "pub")]
    x_1: f64,
    /// Termination threshold on `|f(x)|`. Default: `1e-6`.
    #[getset(get_copy = "pub", set = "pub")]
    f_tol: f64,

    x_prev: f64,
    fx_prev: f64,
    x_next: f64,
    root: f64,
}

impl Secant {
    /// Initializes the method for the given input dimensionality.
    pub fn new(dim: usize) -> Result<Self, Error> {
        if dim != 1 {
            return Err(Error::Unsupported(format!(
                "secant is a single-variate method, {dim} dimensions requested"
            )));
        }

        Ok(Self {
            state: State::Initial,
            verbosity: default_verbosity(),
            x_0: 0.0,
            x_1: 0.0,
            f_tol: 1e-6,
            x_prev: 0.0,
            fx_prev: 0.0,
            x_next: 0.0,
            root: 0.0,
        })
    }
}

impl Method for Secant {
    fn name(&self) -> &'static str {
        "secant"
    }

    fn info(&self) -> Option<&'static str> {
        Some(INFO)
    }

    fn set_verbosity(&mut self, level: Verbosity) {
        self.verbosity = level;
    }

    fn hparam_set(&mut self, id: &str, value: Value) -> Result<(), Error> {
        match id {
            "x_0" => self.x_0 = value.as_float()?,
            "x_1" => self.x_1 = value.as_float()?,
            "f_tol" => self.f_tol = value.as_float()?,
            _ => return Err(Error::UnknownHParam(id.to_owned())),
        }
        Ok(())
    }

    fn hparam_get(&self, id: &str) -> Result<Value, Error> {
        match id {
            "x_0" => Ok(Value::Float(self.x_0)),
            "x_1" => Ok(Value::Float(self.x_1)),
            "f_tol" => Ok(Value::Float(self.f_tol)),
            _ => Err(Error::UnknownHParam(id.to_owned())),
        }
    }

    fn next(&mut self, out: &mut DVector<f64>) -> Result<(), Error> {
        if out.nrows() != 1 {
            return Err(Error::InvalidArgument(
                "output vector must have length 1".into(),
            ));
        }

        match self.state {
            State::Initial => out[0] = self.x_0,
            State::Running => out[0] = self.x_next,
            State::Failed => {
                return Err(Error::Singularity(
                    "secant denominator vanished".into(),
                ))
            }
            State::Done => {
                return Err(Error::StateViolation(
                    "next requested after completion".into(),
                ))
            }
        }

        Ok(())
    }

    fn set_value(&mut self, x: &DVector<f64>, fx: f64) -> Result<(), Error> {
        if x.nrows() != 1 {
            return Err(Error::InvalidArgument(
                "input vector must have length 1".into(),
            ));
        }

        match self.state {
            State::Initial => {
                self.x_prev = x[0];
                self.fx_prev = fx;
                self.x_next = self.x_1;
                self.state = State::Running;
                Ok(())
            }
            State::Running => {
                let delta_x = x[0] - self.x_prev;
                let delta_fx = fx - self.fx_prev;

                if delta_fx.abs() < SINGULARITY_EPS {
                    if self.verbosity.allows(Verbosity::Error) {
                        error!(
                            "secant denominator {delta_fx} below protection threshold"
                        );
                    }
                    self.state = State::Failed;
                    return Err(Error::Singularity(
                        "secant denominator vanished".into(),
                    ));
                }

                // Note: when delta_fx is small, the error in x_next can be
                // very large.
                self.x_next = self.x_prev - self.fx_prev * delta_x / delta_fx;
                self.x_prev = x[0];
                self.fx_prev = fx;
                Ok(())
            }
            State::Failed => Err(Error::Singularity(
                "secant denominator vanished".into(),
            )),
            State::Done => Err(Error::StateViolation(
                "set_value after completion".into(),
            )),
        }
    }

    fn done(&mut self) -> Result<Status, Error> {
        match self.state {
            State::Initial => Ok(Status::Continue),
            State::Failed => Err(Error::Singularity(
                "secant denominator vanished".into(),
            )),
            State::Done => Ok(Status::Complete),
            State::Running => {
                if self.fx_prev.abs() < self.f_tol {
                    self.root = self.x_prev;
                    self.state = State::Done;
                    Ok(Status::Complete)
                } else {
                    Ok(Status::Continue)
                }
            }
        }
    }

    fn result(&self, id: &str) -> Result<Value, Error> {
        if self.state != State::Done {
            return Err(Error::NotReady(
                "result requested before completion".into(),
            ));
        }
        match id {
            "root" => Ok(Value::Float(self.root)),
            _ => Err(Error::UnknownResult(id.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::drive_method;

    #[test]
    fn finds_sqrt_two() {
        let mut method = Secant::new(1).unwrap();
        method.set_x_0(1.5).set_x_1(2.0).set_f_tol(1e-10);

        drive_method(&mut method, 1, |x| x[0] * x[0] - 2.0, 100).unwrap();

        let root = method.result("root").unwrap().as_float().unwrap();
        assert!((root - 2f64.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn bootstrap_requests_both_points() {
        let mut method = Secant::new(1).unwrap();
        method.set_x_0(1.5).set_x_1(2.0);

        let mut out = DVector::zeros(1);
        method.next(&mut out).unwrap();
        assert_eq!(out[0], 1.5);
        method.set_value(&out, 1.5 * 1.5 - 2.0).unwrap();

        method.next(&mut out).unwrap();
        assert_eq!(out[0], 2.0);
    }

    #[test]
    fn flat_function_is_a_singularity() {
        let mut method = Secant::new(1).unwrap();
        method.set_x_0(0.0).set_x_1(1.0);

        let err = drive_method(&mut method, 1, |_| 3.0, 100).unwrap_err();
        assert!(err.to_string().contains("singularity"));
    }

    #[test]
    fn progresses_like_newton_raphson() {
        // From the same bootstrap, the secant step moves toward the root
        // from the same side as the Newton-Raphson step.
        let mut method = Secant::new(1).unwrap();
        method.set_x_0(1.5).set_x_1(2.0);

        let mut out = DVector::zeros(1);
        method.next(&mut out).unwrap();
        method.set_value(&out, out[0] * out[0] - 2.0).unwrap();
        method.next(&mut out).unwrap();
        method.set_value(&out, out[0] * out[0] - 2.0).unwrap();
        method.next(&mut out).unwrap();

        let secant_step = out[0];
        let newton_step = 1.5 - (1.5f64 * 1.5 - 2.0) / (2.0 * 1.5);
        let root = 2f64.sqrt();

        assert_eq!(
            (secant_step - root).signum(),
            (newton_step - root).signum()
        );
        assert!((secant_step - root).abs() < (1.5 - root).abs());
    }
}
