//! Brent's localmin one-dimensional minimizer.
//!
//! Brent's *localmin* procedure minimizes a function of one variable over a
//! bracket without derivatives, combining golden-section search with
//! parabolic interpolation through the three best points seen so far. The
//! parabolic step is only accepted when it is provably sensible, so the
//! method never does worse than golden-section search.
//!
//! **Important:** only one-dimensional inputs are supported.
//!
//! # References
//!
//! \[1\] Brent, R.P. (1973). Algorithms for Minimization without
//! Derivatives, chapter 5. Prentice-Hall. ISBN 0-13-022335-2

use getset::{CopyGetters, Setters};
use log::debug;
use nalgebra::DVector;

use crate::core::{Error, Method, Status, Value};
use crate::diagnostics::{default_verbosity, Verbosity};

/// Golden-section constant `(3 - sqrt(5)) / 2`.
fn golden() -> f64 {
    (3.0 - 5f64.sqrt()) / 2.0
}

const INFO: &str = "\
Brent's localmin procedure finds a local minimum of a function of one
variable inside a bracket, without derivatives. Golden-section steps
guarantee progress; parabolic interpolation through the three best
points accelerates convergence when the function cooperates.

Hyper-parameters:
name    required        type    default Description
x_0     REQUIRED        float   none    Lower end of the bracket.
x_1     REQUIRED        float   none    Upper end of the bracket.
eps     optional        float   1e-10   Relative tolerance scale.
t       optional        float   1e-6    Absolute tolerance floor.

Results:
name            type    Description
minimum x       float   Abscissa of the located minimum.
minimum f       float   Objective value at the located minimum.

References:
Brent, R.P. (1973). Algorithms for Minimization without Derivatives.
        ISBN 0-13-022335-2
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    Starting,
    Running,
    Done,
}

/// Brent's localmin minimizer. See [module](self) documentation for more
/// details.
#[derive(CopyGetters, Setters)]
pub struct BrentsLocalmin {
    state: State,
    verbosity: Verbosity,

    /// Lower end of the bracket.
    #[getset(get_copy = "pub", set = "pub")]
    x_0: f64,
    /// Upper end of the bracket.
    #[getset(get_copy = "pub", set = "pub")]
    x_1: f64,
    /// Relative tolerance scale. Default: `1e-10`.
    #[getset(get_copy = "pub", set = "pub")]
    eps: f64,
    /// Absolute tolerance floor. Default: `1e-6`.
    #[getset(get_copy = "pub", set = "pub")]
    t: f64,

    a: f64,
    b: f64,
    u: f64,
    v: f64,
    w: f64,
    x: f64,
    f_v: f64,
    f_w: f64,
    f_x: f64,
    d: f64,
    e: f64,
}

impl BrentsLocalmin {
    /// Initializes the method for the given input dimensionality.
    pub fn new(dim: usize) -> Result<Self, Error> {
        if dim != 1 {
            return Err(Error::Unsupported(format!(
                "brents-localmin is a single-variate method, {dim} dimensions requested"
            )));
        }

        Ok(Self {
            state: State::Initial,
            verbosity: default_verbosity(),
            x_0: 0.0,
            x_1: 0.0,
            eps: 1e-10,
            t: 1e-6,
            a: 0.0,
            b: 0.0,
            u: 0.0,
            v: 0.0,
            w: 0.0,
            x: 0.0,
            f_v: 0.0,
            f_w: 0.0,
            f_x: 0.0,
            d: 0.0,
            e: 0.0,
        })
    }
}

impl Method for BrentsLocalmin {
    fn name(&self) -> &'static str {
        "brents-localmin"
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
            "eps" => self.eps = value.as_float()?,
            "t" => self.t = value.as_float()?,
            _ => return Err(Error::UnknownHParam(id.to_owned())),
        }
        Ok(())
    }

    fn hparam_get(&self, id: &str) -> Result<Value, Error> {
        match id {
            "x_0" => Ok(Value::Float(self.x_0)),
            "x_1" => Ok(Value::Float(self.x_1)),
            "eps" => Ok(Value::Float(self.eps)),
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
            State::Initial => {
                if self.x_1 <= self.x_0 {
                    return Err(Error::InvalidArgument(format!(
                        "bracket is empty: x_0 = {}, x_1 = {}",
                        self.x_0, self.x_1
                    )));
                }

                self.a = self.x_0;
                self.b = self.x_1;
                self.x = self.a + golden() * (self.b - self.a);
                out[0] = self.x;
                Ok(())
            }
            State::Starting | State::Running => {
                let (a, b, x) = (self.a, self.b, self.x);
                let m = 0.5 * (a + b);
                let tol = self.eps * x.abs() + self.t;
                let t2 = 2.0 * tol;

                let mut p = 0.0;
                let mut q = 0.0;
                let mut r = 0.0;

                if self.e.abs() > tol {
                    // Fit a parabola through (v, f_v), (w, f_w), (x, f_x).
                    r = (x - self.w) * (self.f_x - self.f_v);
                    q = (x - self.v) * (self.f_x - self.f_w);
                    p = (x - self.v) * q - (x - self.w) * r;
                    q = 2.0 * (q - r);
                    if q > 0.0 {
                        p = -p;
                    } else {
                        q = -q;
                    }
                    r = self.e;
                    self.e = self.d;
                }

                if p.abs() < (0.5 * q * r).abs() && p > q * (a - x) && p < q * (b - x) {
                    // Parabolic interpolation step.
                    self.d = p / q;
                    let u = x + self.d;
                    // f must not be evaluated too close to a or b.
                    if u - a < t2 || b - u < t2 {
                        self.d = if x < m { tol } else { -tol };
                    }
                } else {
                    // Golden-section step.
                    self.e = (if x < m { b } else { a }) - x;
                    self.d = golden() * self.e;
                }

                // f must not be evaluated too close to x.
                self.u = if self.d.abs() >= tol {
                    x + self.d
                } else if self.d > 0.0 {
                    x + tol
                } else {
                    x - tol
                };

                out[0] = self.u;
                self.state = State::Running;
                Ok(())
            }
            State::Done => Err(Error::StateViolation(
                "next requested after completion".into(),
            )),
        }
    }

    fn set_value(&mut self, x: &DVector<f64>, fx: f64) -> Result<(), Error> {
        if x.nrows() != 1 {
            return Err(Error::InvalidArgument(
                "input vector must have length 1".into(),
            ));
        }

        match self.state {
            State::Initial => {
                self.v = self.x;
                self.w = self.x;
                self.f_v = fx;
                self.f_w = fx;
                self.f_x = fx;
                self.d = 0.0;
                self.e = 0.0;
                self.state = State::Starting;
                Ok(())
            }
            State::Running => {
                let u = self.u;
                let f_u = fx;

                // Update a, b, v, w and x.
                if f_u <= self.f_x {
                    if u < self.x {
                        self.b = self.x;
                    } else {
                        self.a = self.x;
                    }
                    self.v = self.w;
                    self.f_v = self.f_w;
                    self.w = self.x;
                    self.f_w = self.f_x;
                    self.x = u;
                    self.f_x = f_u;
                } else {
                    if u < self.x {
                        self.a = u;
                    } else {
                        self.b = u;
                    }
                    if f_u <= self.f_w || self.w == self.x {
                        self.v = self.w;
                        self.f_v = self.f_w;
                        self.w = u;
                        self.f_w = f_u;
                    } else if f_u <= self.f_v || self.v == self.x || self.v == self.w {
                        self.v = u;
                        self.f_v = f_u;
                    }
                }
                Ok(())
            }
            State::Starting => Err(Error::StateViolation(
                "value supplied without a matching query".into(),
            )),
            State::Done => Err(Error::StateViolation(
                "set_value after completion".into(),
            )),
        }
    }

    fn done(&mut self) -> Result<Status, Error> {
        match self.state {
            State::Initial => Ok(Status::Continue),
            State::Done => Ok(Status::Complete),
            State::Starting | State::Running => {
                let m = 0.5 * (self.a + self.b);
                let tol = self.eps * self.x.abs() + self.t;
                let t2 = 2.0 * tol;

                if (self.x - m).abs() <= t2 - 0.5 * (self.b - self.a) {
                    if self.verbosity.allows(Verbosity::Debug) {
                        debug!("localmin converged at x = {}, f(x) = {}", self.x, self.f_x);
                    }
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
            "minimum x" => Ok(Value::Float(self.x)),
            "minimum f" => Ok(Value::Float(self.f_x)),
            _ => Err(Error::UnknownResult(id.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::drive_method;

    #[test]
    fn first_query_is_the_golden_interior_point() {
        let mut method = BrentsLocalmin::new(1).unwrap();
        method.set_x_0(0.0).set_x_1(1.0);

        let mut out = DVector::zeros(1);
        method.next(&mut out).unwrap();
        assert!((out[0] - golden()).abs() < 1e-15);
    }

    #[test]
    fn minimizes_shifted_parabola() {
        let mut method = BrentsLocalmin::new(1).unwrap();
        method.set_x_0(0.0).set_x_1(1.0);

        drive_method(&mut method, 1, |x| (x[0] - 0.5).powi(2), 100).unwrap();

        let min_x = method.result("minimum x").unwrap().as_float().unwrap();
        let min_f = method.result("minimum f").unwrap().as_float().unwrap();
        assert!((min_x - 0.5).abs() < 1e-5);
        assert!(min_f < 1e-8);
    }

    #[test]
    fn minimizes_cosine() {
        let mut method = BrentsLocalmin::new(1).unwrap();
        method.set_x_0(2.0).set_x_1(4.0);

        drive_method(&mut method, 1, |x| x[0].cos(), 100).unwrap();

        let min_x = method.result("minimum x").unwrap().as_float().unwrap();
        approx::assert_abs_diff_eq!(min_x, std::f64::consts::PI, epsilon = 1e-4);
    }

    #[test]
    fn starting_mode_bridges_bootstrap_and_iteration() {
        // The first evaluated point is the interior golden point; the next
        // query only exists after its value arrives.
        let mut method = BrentsLocalmin::new(1).unwrap();
        method.set_x_0(0.0).set_x_1(1.0);

        assert_eq!(method.done().unwrap(), Status::Continue);

        let mut out = DVector::zeros(1);
        method.next(&mut out).unwrap();
        method.set_value(&out, (out[0] - 0.5).powi(2)).unwrap();
        assert_eq!(method.state, State::Starting);

        assert_eq!(method.done().unwrap(), Status::Continue);
        method.next(&mut out).unwrap();
        assert_eq!(method.state, State::Running);
        // The follow-up query is a golden-section step away from x.
        assert!(out[0] > golden());
    }

    #[test]
    fn empty_bracket_is_rejected() {
        let mut method = BrentsLocalmin::new(1).unwrap();
        method.set_x_0(1.0).set_x_1(1.0);

        let mut out = DVector::zeros(1);
        assert!(matches!(
            method.next(&mut out),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn calls_after_completion_fail() {
        let mut method = BrentsLocalmin::new(1).unwrap();
        method.set_x_0(0.0).set_x_1(1.0);
        drive_method(&mut method, 1, |x| (x[0] - 0.5).powi(2), 100).unwrap();

        let mut out = DVector::zeros(1);
        assert!(matches!(
            method.next(&mut out),
            Err(Error::StateViolation(_))
        ));
    }
}
