//! Trapezoidal-rule integrator.
//!
//! The [trapezoidal
//! rule](https://en.wikipedia.org/wiki/Trapezoidal_rule) samples the
//! integrand at `n + 1` evenly spaced abscissas and sums the areas of the
//! trapezoids between them. Exact for linear integrands.
//!
//! **Important:** only one-dimensional inputs are supported.
//!
//! # References
//!
//! \[1\] Fausett, L.V. (2002). Numerical Methods: Algorithms and
//! Applications. ISBN 0-13-031400-5

use getset::{CopyGetters, Setters};
use log::debug;
use nalgebra::DVector;

use crate::core::{Error, Method, Status, Value};
use crate::diagnostics::{default_verbosity, Verbosity};

const INFO: &str = "\
The trapezoidal rule is an integration method that samples the interval
being integrated at regular subintervals and sums the trapezoids under
the curve.

Hyper-parameters:
name    required        type    default Description
lower   REQUIRED        float   0.0     Lower end of the interval (alias x_0).
upper   REQUIRED        float   1.0     Upper end of the interval (alias x_1).
n       REQUIRED        int     10      Number of subintervals
                                        (alias subintervals).

Results:
name    type    Description
area    float   Area under the function between lower and upper.

References:
Fausett, L.V. (2002). Numerical Methods: Algorithms and Applications.
        ISBN 0-13-031400-5
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    Running,
    Done,
}

/// Trapezoidal-rule integrator. See [module](self) documentation for more
/// details.
#[derive(CopyGetters, Setters)]
pub struct Trapezoidal {
    state: State,
    verbosity: Verbosity,

    /// Lower end of the interval. Default: `0`.
    #[getset(get_copy = "pub", set = "pub")]
    x_0: f64,
    /// Upper end of the interval. Default: `1`.
    #[getset(get_copy = "pub", set = "pub")]
    x_1: f64,
    n: usize,

    first_fx: f64,
    last_fx: f64,
    sum: f64,
    subinterval: usize,
    area: f64,
}

impl Trapezoidal {
    /// Initializes the method for the given input dimensionality.
    pub fn new(dim: usize) -> Result<Self, Error> {
        if dim != 1 {
            return Err(Error::Unsupported(format!(
                "trapezoidal is a single-variate method, {dim} dimensions requested"
            )));
        }

        Ok(Self {
            state: State::Initial,
            verbosity: default_verbosity(),
            x_0: 0.0,
            x_1: 1.0,
            n: 10,
            first_fx: 0.0,
            last_fx: 0.0,
            sum: 0.0,
            subinterval: 0,
            area: 0.0,
        })
    }

    /// Sets the subinterval count, which must be positive.
    pub fn set_n(&mut self, n: usize) -> Result<&mut Self, Error> {
        if n < 1 {
            return Err(Error::InvalidArgument(format!(
                "subinterval count must be positive, got {n}"
            )));
        }
        self.n = n;
        Ok(self)
    }

    /// Returns the subinterval count.
    pub fn n(&self) -> usize {
        self.n
    }
}

impl Method for Trapezoidal {
    fn name(&self) -> &'static str {
        "trapezoidal"
    }

    fn info(&self) -> Option<&'static str> {
        Some(INFO)
    }

    fn set_verbosity(&mut self, level: Verbosity) {
        self.verbosity = level;
    }

    fn hparam_set(&mut self, id: &str, value: Value) -> Result<(), Error> {
        match id {
            "lower" | "x_0" => self.x_0 = value.as_float()?,
            "upper" | "x_1" => self.x_1 = value.as_float()?,
            "n" | "subintervals" => {
                let n = value.as_int()?;
                if n < 1 {
                    return Err(Error::InvalidArgument(format!(
                        "subinterval count must be positive, got {n}"
                    )));
                }
                self.n = n as usize;
            }
            _ => return Err(Error::UnknownHParam(id.to_owned())),
        }
        Ok(())
    }

    fn hparam_get(&self, id: &str) -> Result<Value, Error> {
        match id {
            "lower" | "x_0" => Ok(Value::Float(self.x_0)),
            "upper" | "x_1" => Ok(Value::Float(self.x_1)),
            "n" | "subintervals" => Ok(Value::Int(self.n as i64)),
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
            State::Running => {
                out[0] =
                    self.x_0 + self.subinterval as f64 * (self.x_1 - self.x_0) / self.n as f64;
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
                if self.verbosity.allows(Verbosity::Debug) {
                    debug!("recording first f({}) = {fx}", x[0]);
                }
                self.first_fx = fx;
                self.sum = 0.0;
                self.subinterval = 1;
                self.state = State::Running;
            }
            State::Running if self.subinterval >= self.n => {
                self.last_fx = fx;
                let h = (self.x_1 - self.x_0) / self.n as f64;
                self.area = 0.5 * h * (self.first_fx + self.last_fx + 2.0 * self.sum);
                if self.verbosity.allows(Verbosity::Debug) {
                    debug!("recorded final f({}) = {fx}, area = {}", x[0], self.area);
                }
                self.state = State::Done;
            }
            State::Running => {
                self.sum += fx;
                self.subinterval += 1;
            }
            State::Done => {
                return Err(Error::StateViolation(
                    "set_value after completion".into(),
                ))
            }
        }

        Ok(())
    }

    fn done(&mut self) -> Result<Status, Error> {
        Ok(match self.state {
            State::Done => Status::Complete,
            _ => Status::Continue,
        })
    }

    fn result(&self, id: &str) -> Result<Value, Error> {
        if self.state != State::Done {
            return Err(Error::NotReady(
                "result requested before completion".into(),
            ));
        }
        match id {
            "area" => Ok(Value::Float(self.area)),
            _ => Err(Error::UnknownResult(id.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::drive_method;

    fn integrate(n: usize, f: impl FnMut(&DVector<f64>) -> f64) -> f64 {
        let mut method = Trapezoidal::new(1).unwrap();
        method.set_n(n).unwrap();
        drive_method(&mut method, 1, f, n + 2).unwrap();
        method.result("area").unwrap().as_float().unwrap()
    }

    #[test]
    fn linear_integrand_is_exact_for_any_n() {
        for n in [1, 2, 3, 7, 100] {
            assert_eq!(integrate(n, |x| x[0]), 0.5, "n = {n}");
        }
    }

    #[test]
    fn quadratic_integrand_converges() {
        let area = integrate(1000, |x| x[0] * x[0]);
        assert!((area - 1.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn abscissas_sweep_the_interval() {
        let mut method = Trapezoidal::new(1).unwrap();
        method.set_n(4).unwrap();
        method.set_x_0(2.0).set_x_1(4.0);

        let mut seen = Vec::new();
        let mut out = DVector::zeros(1);
        while method.done().unwrap() == Status::Continue {
            method.next(&mut out).unwrap();
            seen.push(out[0]);
            method.set_value(&out, 1.0).unwrap();
        }

        assert_eq!(seen, vec![2.0, 2.5, 3.0, 3.5, 4.0]);
        let area = method.result("area").unwrap().as_float().unwrap();
        assert_eq!(area, 2.0);
    }

    #[test]
    fn zero_subintervals_are_rejected() {
        let mut method = Trapezoidal::new(1).unwrap();
        assert!(matches!(
            method.hparam_set("n", Value::Int(0)),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn calls_after_completion_fail() {
        let mut method = Trapezoidal::new(1).unwrap();
        method.set_n(2).unwrap();
        drive_method(&mut method, 1, |x| x[0], 10).unwrap();

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
}
