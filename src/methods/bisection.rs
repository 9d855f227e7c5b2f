//! Bisection root finder.
//!
//! [Bisection](https://en.wikipedia.org/wiki/Bisection_method) repeatedly
//! halves an interval bracketing a sign change of the objective. It is slow
//! but unconditionally convergent on continuous functions, which makes it a
//! useful baseline and fallback.
//!
//! **Important:** only one-dimensional inputs are supported.
//!
//! # References
//!
//! \[1\] [Wikipedia](https://en.wikipedia.org/wiki/Bisection_method)

use getset::{CopyGetters, Setters};
use log::{error, info};
use nalgebra::DVector;

use crate::core::{Error, Method, Status, Value};
use crate::diagnostics::{default_verbosity, Verbosity};

const INFO: &str = "\
The bisection method is a root finding technique that works by repeatedly
dividing a search region in half until it converges on the root.

Hyper-parameters:
name    required        type    default Description
lower   REQUIRED        float   -1e6    Lower bound of the region.
upper   REQUIRED        float   1e6     Upper bound of the region.
f_tol   optional        float   1e-6    Terminates when |f(b)-f(a)| < f_tol.
x_tol   optional        float   1e-6    Terminates when |b-a| < x_tol.

Results:
name    type    Description
root    float   Point within the termination thresholds of the root.

References:
https://en.wikipedia.org/wiki/Bisection_method
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NeedFa,
    NeedFb,
    Running,
    Failed,
    Done,
}

/// Bisection root finder. See [module](self) documentation for more details.
#[derive(CopyGetters, Setters)]
pub struct Bisection {
    state: State,
    verbosity: Verbosity,

    /// Lower end of the search region. Default: `-1e6`.
    #[getset(get_copy = "pub", set = "pub")]
    lower: f64,
    /// Upper end of the search region. Default: `1e6`.
    #[getset(get_copy = "pub", set = "pub")]
    upper: f64,
    /// Termination threshold on the bracket width. Default: `1e-6`.
    #[getset(get_copy = "pub", set = "pub")]
    x_tol: f64,
    /// Termination threshold on the endpoint value spread. Default: `1e-6`.
    #[getset(get_copy = "pub", set = "pub")]
    f_tol: f64,

    a: f64,
    b: f64,
    f_a: f64,
    f_b: f64,
    root: f64,
}

impl Bisection {
    /// Initializes the method for the given input dimensionality.
    pub fn new(dim: usize) -> Result<Self, Error> {
        if dim != 1 {
            return Err(Error::Unsupported(format!(
                "bisection is a single-variate method, {dim} dimensions requested"
            )));
        }

        Ok(Self {
            state: State::NeedFa,
            verbosity: default_verbosity(),
            lower: -1e6,
            upper: 1e6,
            x_tol: 1e-6,
            f_tol: 1e-6,
            a: 0.0,
            b: 0.0,
            f_a: 0.0,
            f_b: 0.0,
            root: 0.0,
        })
    }

    fn finish(&mut self, reason: &str) -> Status {
        if self.verbosity.allows(Verbosity::Info) {
            info!("{reason}");
        }
        self.root = 0.5 * (self.a + self.b);
        self.state = State::Done;
        Status::Complete
    }
}

impl Method for Bisection {
    fn name(&self) -> &'static str {
        "bisection"
    }

    fn info(&self) -> Option<&'static str> {
        Some(INFO)
    }

    fn set_verbosity(&mut self, level: Verbosity) {
        self.verbosity = level;
    }

    fn hparam_set(&mut self, id: &str, value: Value) -> Result<(), Error> {
        match id {
            "lower" => self.lower = value.as_float()?,
            "upper" => self.upper = value.as_float()?,
            "x_tol" => self.x_tol = value.as_float()?,
            "f_tol" => self.f_tol = value.as_float()?,
            _ => return Err(Error::UnknownHParam(id.to_owned())),
        }
        Ok(())
    }

    fn hparam_get(&self, id: &str) -> Result<Value, Error> {
        match id {
            "lower" => Ok(Value::Float(self.lower)),
            "upper" => Ok(Value::Float(self.upper)),
            "x_tol" => Ok(Value::Float(self.x_tol)),
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
            State::NeedFa => {
                self.a = self.lower;
                self.b = self.upper;
                out[0] = self.a;
            }
            State::NeedFb => out[0] = self.b,
            State::Running => out[0] = 0.5 * (self.a + self.b),
            State::Failed => return Err(Error::BracketInvalid),
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
            State::NeedFa => {
                self.f_a = fx;
                self.state = State::NeedFb;
            }
            State::NeedFb => {
                self.f_b = fx;

                // Arrange the endpoints so that f(a) <= f(b).
                if self.f_b < self.f_a {
                    std::mem::swap(&mut self.a, &mut self.b);
                    std::mem::swap(&mut self.f_a, &mut self.f_b);
                }

                if self.f_a > 0.0 || self.f_b < 0.0 {
                    if self.verbosity.allows(Verbosity::Error) {
                        error!(
                            "objective must straddle zero (f({})={}; f({})={})",
                            self.a, self.f_a, self.b, self.f_b
                        );
                    }
                    self.state = State::Failed;
                    return Err(Error::BracketInvalid);
                }

                self.state = State::Running;
            }
            State::Running => {
                let xq = x[0];
                if fx < 0.0 {
                    self.a = xq;
                    self.f_a = fx;
                } else if fx > 0.0 {
                    self.b = xq;
                    self.f_b = fx;
                } else if fx == 0.0 {
                    self.a = xq;
                    self.b = xq;
                    self.f_a = 0.0;
                    self.f_b = 0.0;
                    self.root = xq;
                    self.state = State::Done;
                } else {
                    return Err(Error::InvalidArgument(format!(
                        "value {fx} is not comparable to zero"
                    )));
                }
            }
            State::Failed => return Err(Error::BracketInvalid),
            State::Done => {
                return Err(Error::StateViolation(
                    "set_value after completion".into(),
                ))
            }
        }

        Ok(())
    }

    fn done(&mut self) -> Result<Status, Error> {
        match self.state {
            State::NeedFa | State::NeedFb => Ok(Status::Continue),
            State::Failed => Err(Error::BracketInvalid),
            State::Done => Ok(Status::Complete),
            State::Running => {
                if (self.b - self.a).abs() < self.x_tol {
                    return Ok(self.finish("bracket width within termination threshold"));
                }
                if (self.f_b - self.f_a).abs() < self.f_tol {
                    return Ok(
                        self.finish("endpoint value spread within termination threshold")
                    );
                }
                Ok(Status::Continue)
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
        let mut method = Bisection::new(1).unwrap();
        method.set_lower(0.0).set_upper(2.0);

        drive_method(&mut method, 1, |x| x[0] * x[0] - 2.0, 100).unwrap();

        let root = method.result("root").unwrap().as_float().unwrap();
        assert!((root - 2f64.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn swapped_bounds_are_reordered() {
        let mut method = Bisection::new(1).unwrap();
        // f is increasing, so f(lower) > f(upper) triggers the swap.
        method.set_lower(2.0).set_upper(-1.0);

        drive_method(&mut method, 1, |x| x[0], 100).unwrap();

        let root = method.result("root").unwrap().as_float().unwrap();
        assert!(root.abs() < 1e-5);
    }

    #[test]
    fn exact_zero_terminates_immediately() {
        let mut method = Bisection::new(1).unwrap();
        method.set_lower(-1.0).set_upper(1.0);

        drive_method(&mut method, 1, |x| x[0], 100).unwrap();

        let root = method.result("root").unwrap().as_float().unwrap();
        assert_eq!(root, 0.0);
    }

    #[test]
    fn invalid_bracket_is_rejected() {
        let mut method = Bisection::new(1).unwrap();
        method.set_lower(1.0).set_upper(2.0);

        // Strictly positive objective cannot bracket a root.
        let err = drive_method(&mut method, 1, |x| x[0] * x[0] + 1.0, 100).unwrap_err();
        assert!(err.to_string().contains("bracket"));
    }

    #[test]
    fn calls_after_completion_fail() {
        let mut method = Bisection::new(1).unwrap();
        method.set_lower(-1.0).set_upper(1.0);
        drive_method(&mut method, 1, |x| x[0], 100).unwrap();

        let mut out = DVector::zeros(1);
        assert!(matches!(
            method.next(&mut out),
            Err(Error::StateViolation(_))
        ));
        assert!(matches!(
            method.set_value(&out, 0.0),
            Err(Error::StateViolation(_))
        ));
    }

    #[test]
    fn multi_dimensional_init_is_unsupported() {
        assert!(matches!(Bisection::new(2), Err(Error::Unsupported(_))));
    }

    #[test]
    fn unknown_names_are_rejected() {
        let mut method = Bisection::new(1).unwrap();
        assert!(matches!(
            method.hparam_set("nope", Value::Float(0.0)),
            Err(Error::UnknownHParam(_))
        ));
        assert!(matches!(
            method.hparam_get("nope"),
            Err(Error::UnknownHParam(_))
        ));
        assert!(matches!(
            method.hparam_set("lower", Value::Int(1)),
            Err(Error::InvalidArgument(_))
        ));
    }
}
