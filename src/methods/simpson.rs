//! Simpson's-rule integrator.
//!
//! [Simpson's rule](https://en.wikipedia.org/wiki/Simpson%27s_rule) samples
//! the integrand at `n + 1` evenly spaced abscissas and fits parabolas
//! through consecutive triples, which makes it exact for cubic integrands.
//! The subinterval count must be even.
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
Simpson's rule is an integration method that samples the interval being
integrated at regular subintervals and uses parabolas to estimate the
area under the curve.

Hyper-parameters:
name    required        type    default Description
lower   REQUIRED        float   0.0     Lower end of the interval (alias x_0).
upper   REQUIRED        float   1.0     Upper end of the interval (alias x_1).
n       REQUIRED        int     10      Number of subintervals, must be even
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

/// Simpson's-rule integrator. See [module](self) documentation for more
/// details.
#[derive(CopyGetters, Setters)]
pub struct Simpson {
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
    /// Sum of even-indexed interior samples.
    sum1: f64,
    /// Sum of odd-indexed interior samples.
    sum2: f64,
    subinterval: usize,
    area: f64,
}

impl Simpson {
    /// Initializes the method for the given input dimensionality.
    pub fn new(dim: usize) -> Result<Self, Error> {
        if dim != 1 {
            return Err(Error::Unsupported(format!(
                "simpson is a single-variate method, {dim} dimensions requested"
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
            sum1: 0.0,
            sum2: 0.0,
            subinterval: 0,
            area: 0.0,
        })
    }

    /// Sets the subinterval count, which must be positive and even.
    pub fn set_n(&mut self, n: usize) -> Result<&mut Self, Error> {
        if n < 1 || n % 2 != 0 {
            return Err(Error::InvalidArgument(format!(
                "subinterval count must be a positive even number, got {n}"
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

impl Method for Simpson {
    fn name(&self) -> &'static str {
        "simpson"
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
                if n < 1 || n % 2 != 0 {
                    return Err(Error::InvalidArgument(format!(
                        "subinterval count must be a positive even number, got {n}"
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
                self.sum1 = 0.0;
                self.sum2 = 0.0;
                self.subinterval = 1;
                self.state = State::Running;
            }
            State::Running if self.subinterval >= self.n => {
                self.last_fx = fx;
                let h = (self.x_1 - self.x_0) / self.n as f64;
                self.area = (h / 3.0)
                    * (self.first_fx + self.last_fx + 2.0 * self.sum1 + 4.0 * self.sum2);
                if self.verbosity.allows(Verbosity::Debug) {
                    debug!("recorded final f({}) = {fx}, area = {}", x[0], self.area);
                }
                self.state = State::Done;
            }
            State::Running => {
                if self.subinterval % 2 == 0 {
                    self.sum1 += fx;
                } else {
                    self.sum2 += fx;
                }
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
        let mut method = Simpson::new(1).unwrap();
        method.set_n(n).unwrap();
        drive_method(&mut method, 1, f, n + 2).unwrap();
        method.result("area").unwrap().as_float().unwrap()
    }

    #[test]
    fn quadratic_integrand_is_exact_at_two_subintervals() {
        assert_eq!(integrate(2, |x| x[0] * x[0]), 1.0 / 3.0);
    }

    #[test]
    fn estimates_quarter_pi() {
        let area = integrate(4, |x| 1.0 / (1.0 + x[0] * x[0]));
        approx::assert_abs_diff_eq!(area, std::f64::consts::FRAC_PI_4, epsilon = 1e-3);
    }

    #[test]
    fn cubic_integrand_is_exact() {
        let area = integrate(2, |x| x[0].powi(3));
        assert!((area - 0.25).abs() < 1e-15);
    }

    #[test]
    fn odd_subinterval_counts_are_rejected() {
        let mut method = Simpson::new(1).unwrap();
        assert!(matches!(
            method.hparam_set("n", Value::Int(5)),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            method.hparam_set("subintervals", Value::Int(0)),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn calls_after_completion_fail() {
        let mut method = Simpson::new(1).unwrap();
        method.set_n(2).unwrap();
        drive_method(&mut method, 1, |x| x[0], 10).unwrap();

        let mut out = DVector::zeros(1);
        assert!(matches!(
            method.next(&mut out),
            Err(Error::StateViolation(_))
        ));
    }
}
