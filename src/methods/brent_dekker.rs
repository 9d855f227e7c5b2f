//! Brent-Dekker root finder.
//!
//! The [Brent-Dekker
//! method](https://en.wikipedia.org/wiki/Brent%27s_method) combines inverse
//! quadratic interpolation, linear interpolation and bisection, keeping a
//! bracket on the root at all times. It converges superlinearly on well
//! behaved functions while retaining bisection's guarantee.
//!
//! **Important:** only one-dimensional inputs are supported.
//!
//! # References
//!
//! \[1\] Brent, R.P. (1973). Algorithms for Minimization without
//! Derivatives. Prentice-Hall. ISBN 0-13-022335-2
//!
//! \[2\] [Wikipedia](https://en.wikipedia.org/wiki/Brent%27s_method)

use getset::{CopyGetters, Setters};
use log::{debug, error};
use nalgebra::DVector;

use crate::core::{Error, Method, Status, Value};
use crate::diagnostics::{default_verbosity, Verbosity};

const INFO: &str = "\
The Brent-Dekker method is a root finding technique combining inverse
quadratic interpolation, linear interpolation and bisection. The root
stays bracketed throughout, so the method cannot diverge on continuous
objectives.

Hyper-parameters:
name    required        type    default Description
x_0     REQUIRED        float   none    One end of the search region.
x_1     REQUIRED        float   none    Other end of the search region.
macheps optional        float   1e-10   Relative tolerance scale.
t       optional        float   1e-6    Absolute tolerance floor.

Results:
name    type    Description
root    float   The bracketed point within tolerance of the root.

References:
Brent, R.P. (1973). Algorithms for Minimization without Derivatives.
        ISBN 0-13-022335-2
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NeedFa,
    NeedFb,
    Running,
    Failed,
    Done,
}

/// Brent-Dekker root finder. See [module](self) documentation for more
/// details.
#[derive(CopyGetters, Setters)]
pub struct BrentDekker {
    state: State,
    verbosity: Verbosity,

    /// One end of the search region.
    #[getset(get_copy = "pub", set = "pub")]
    x_0: f64,
    /// Other end of the search region.
    #[getset(get_copy = "pub", set = "pub")]
    x_1: f64,
    /// Relative tolerance scale. Default: `1e-10`.
    #[getset(get_copy = "pub", set = "pub")]
    macheps: f64,
    /// Absolute tolerance floor. Default: `1e-6`.
    #[getset(get_copy = "pub", set = "pub")]
    t: f64,

    a: f64,
    b: f64,
    c: f64,
    f_a: f64,
    f_b: f64,
    f_c: f64,
    d: f64,
    e: f64,
    root: f64,
}

impl BrentDekker {
    /// Initializes the method for the given input dimensionality.
    pub fn new(dim: usize) -> Result<Self, Error> {
        if dim != 1 {
            return Err(Error::Unsupported(format!(
                "brent-dekker is a single-variate method, {dim} dimensions requested"
            )));
        }

        Ok(Self {
            state: State::NeedFa,
            verbosity: default_verbosity(),
            x_0: 0.0,
            x_1: 0.0,
            macheps: 1e-10,
            t: 1e-6,
            a: 0.0,
            b: 0.0,
            c: 0.0,
            f_a: 0.0,
            f_b: 0.0,
            f_c: 0.0,
            d: 0.0,
            e: 0.0,
            root: 0.0,
        })
    }

    /// One update of the bracketing triple after a fresh `f(b)`.
    ///
    /// Either records the root and completes, or computes the next query
    /// point into `b`.
    fn step(&mut self) {
        let mut a = self.a;
        let mut b = self.b;
        let mut c = self.c;
        let mut f_a = self.f_a;
        let mut f_b = self.f_b;
        let mut f_c = self.f_c;
        let mut d = self.d;
        let mut e = self.e;

        // Re-establish the bracket when b and c ended up on the same side.
        if (f_b > 0.0 && f_c > 0.0) || (f_b <= 0.0 && f_c <= 0.0) {
            c = a;
            f_c = f_a;
            d = b - a;
            e = d;
        }

        // Keep |f(b)| <= |f(c)|.
        if f_c.abs() < f_b.abs() {
            a = b;
            b = c;
            c = a;
            f_a = f_b;
            f_b = f_c;
            f_c = f_a;
        }

        let tol = 2.0 * self.macheps * b.abs() + self.t;
        let m = 0.5 * (c - b);

        if m.abs() <= tol || f_b == 0.0 {
            if self.verbosity.allows(Verbosity::Debug) {
                debug!("converged with b = {b}, f(b) = {f_b}");
            }
            self.root = b;
            self.state = State::Done;
        } else {
            if e.abs() < tol || f_a.abs() <= f_b.abs() {
                // Bisection is forced.
                d = m;
                e = m;
            } else {
                let mut s = f_b / f_a;
                let mut p;
                let mut q;

                if a == c {
                    // Linear interpolation.
                    p = 2.0 * m * s;
                    q = 1.0 - s;
                } else {
                    // Inverse quadratic interpolation.
                    q = f_a / f_c;
                    let r = f_b / f_c;
                    p = s * (2.0 * m * q * (q - r) - (b - a) * (r - 1.0));
                    q = (q - 1.0) * (r - 1.0) * (s - 1.0);
                }

                if p > 0.0 {
                    q = -q;
                } else {
                    p = -p;
                }

                s = e;
                e = d;

                if 2.0 * p < 3.0 * m * q - (tol * q).abs() && p < (0.5 * s * q).abs() {
                    d = p / q;
                } else {
                    d = m;
                    e = m;
                }
            }

            a = b;
            f_a = f_b;
            b += if d.abs() > tol {
                d
            } else if m > 0.0 {
                tol
            } else {
                -tol
            };
        }

        self.a = a;
        self.b = b;
        self.c = c;
        self.f_a = f_a;
        self.f_b = f_b;
        self.f_c = f_c;
        self.d = d;
        self.e = e;
    }
}

impl Method for BrentDekker {
    fn name(&self) -> &'static str {
        "brent-dekker"
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
            "macheps" => self.macheps = value.as_float()?,
            "t" => self.t = value.as_float()?,
            _ => return Err(Error::UnknownHParam(id.to_owned())),
        }
        Ok(())
    }

    fn hparam_get(&self, id: &str) -> Result<Value, Error> {
        match id {
            "x_0" => Ok(Value::Float(self.x_0)),
            "x_1" => Ok(Value::Float(self.x_1)),
            "macheps" => Ok(Value::Float(self.macheps)),
            "t" => Ok(Value::Float(self.t)),
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
                self.a = self.x_0;
                self.b = self.x_1;
                out[0] = self.a;
            }
            // After seeding, only f(b) is required per iteration.
            State::NeedFb | State::Running => out[0] = self.b,
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
                Ok(())
            }
            State::NeedFb => {
                self.f_b = fx;

                if self.f_a * self.f_b > 0.0 {
                    if self.verbosity.allows(Verbosity::Error) {
                        error!(
                            "objective must have opposite sign at each end of the search \
                             region (f({})={}; f({})={})",
                            self.a, self.f_a, self.b, self.f_b
                        );
                    }
                    self.state = State::Failed;
                    return Err(Error::BracketInvalid);
                }

                self.c = self.a;
                self.f_c = self.f_a;
                self.d = self.b - self.a;
                self.e = self.d;
                self.state = State::Running;
                self.step();
                Ok(())
            }
            State::Running => {
                self.f_b = fx;
                self.step();
                Ok(())
            }
            State::Failed => Err(Error::BracketInvalid),
            State::Done => Err(Error::StateViolation(
                "set_value after completion".into(),
            )),
        }
    }

    fn done(&mut self) -> Result<Status, Error> {
        match self.state {
            State::NeedFa | State::NeedFb | State::Running => Ok(Status::Continue),
            State::Failed => Err(Error::BracketInvalid),
            State::Done => Ok(Status::Complete),
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
    fn seeding_requests_both_endpoints() {
        let mut method = BrentDekker::new(1).unwrap();
        method.set_x_0(2.0).set_x_1(3.0);

        let mut out = DVector::zeros(1);
        method.next(&mut out).unwrap();
        assert_eq!(out[0], 2.0);
        method.set_value(&out, -1.0).unwrap();

        method.next(&mut out).unwrap();
        assert_eq!(out[0], 3.0);
    }

    #[test]
    fn finds_cubic_root() {
        let mut method = BrentDekker::new(1).unwrap();
        method.set_x_0(2.0).set_x_1(3.0);

        let evals =
            drive_method(&mut method, 1, |x| x[0].powi(3) - 2.0 * x[0] - 5.0, 100).unwrap();

        let root = method.result("root").unwrap().as_float().unwrap();
        assert!((root - 2.094_551_481_542_33).abs() < 1e-5);
        // Interpolation should beat plain bisection by a wide margin.
        assert!(evals < 15, "took {evals} evaluations");
    }

    #[test]
    fn finds_sqrt_two() {
        let mut method = BrentDekker::new(1).unwrap();
        method.set_x_0(1.0).set_x_1(2.0);

        drive_method(&mut method, 1, |x| x[0] * x[0] - 2.0, 100).unwrap();

        let root = method.result("root").unwrap().as_float().unwrap();
        assert!((root - 2f64.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn invalid_bracket_is_rejected() {
        let mut method = BrentDekker::new(1).unwrap();
        method.set_x_0(1.0).set_x_1(2.0);

        let err = drive_method(&mut method, 1, |x| x[0] * x[0] + 1.0, 100).unwrap_err();
        assert!(err.to_string().contains("bracket"));
    }

    #[test]
    fn calls_after_completion_fail() {
        let mut method = BrentDekker::new(1).unwrap();
        method.set_x_0(1.0).set_x_1(2.0);
        drive_method(&mut method, 1, |x| x[0] * x[0] - 2.0, 100).unwrap();

        let mut out = DVector::zeros(1);
        assert!(matches!(
            method.next(&mut out),
            Err(Error::StateViolation(_))
        ));
    }
}
