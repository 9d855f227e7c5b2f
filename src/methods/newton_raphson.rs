//! Newton-Raphson root finder.
//!
//! [Newton's method](https://en.wikipedia.org/wiki/Newton%27s_method)
//! follows the tangent line at the current point to the x-axis. It needs
//! the derivative at every query point, so values must be handed back with
//! [`set_value_with_gradient`](crate::Method::set_value_with_gradient);
//! plain value intake is rejected.
//!
//! **Important:** only one-dimensional inputs are supported.
//!
//! # References
//!
//! \[1\] [Wikipedia](https://en.wikipedia.org/wiki/Newton%27s_method)

use getset::{CopyGetters, Setters};
use log::error;
use nalgebra::DVector;

use crate::core::{Error, Method, Status, Value};
use crate::diagnostics::{default_verbosity, Verbosity};

/// Protection threshold for the derivative in the update step.
const SINGULARITY_EPS: f64 = 1e-6;

const INFO: &str = "\
The Newton-Raphson method is a root finding method that follows the
tangent of the function at the most recent point down to the x-axis.
It requires the derivative of the objective at every sampled point,
supplied through the gradient intake.

Hyper-parameters:
name    required        type    default Description
x_0     REQUIRED        float   0       Starting point.
f_tol   optional        float   1e-6    Method stops when |f(x)| < f_tol.

Results:
name    type    Description
root    float   The value of x where |f(x)| < f_tol.

References:
https://en.wikipedia.org/wiki/Newton%27s_method
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    Running,
    Failed,
    Done,
}

/// Newton-Raphson root finder. See [module](self) documentation for more
/// details.
#[derive(CopyGetters, Setters)]
pub struct NewtonRaphson {
    state: State,
    verbosity: Verbosity,

    /// Termination threshold on `|f(x)|`. Default: `1e-6`.
    #[getset(get_copy = "pub", set = "pub")]
    f_tol: f64,

    last_x: f64,
    last_fx: f64,
    next_x: f64,
    root: f64,
}

impl NewtonRaphson {
    /// Initializes the method for the given input dimensionality.
    pub fn new(dim: usize) -> Result<Self, Error> {
        if dim != 1 {
            return Err(Error::Unsupported(format!(
                "newton-raphson is a single-variate method, {dim} dimensions requested"
            )));
        }

        Ok(Self {
            state: State::Initial,
            verbosity: default_verbosity(),
            f_tol: 1e-6,
            last_x: 0.0,
            last_fx: 0.0,
            next_x: 0.0,
            root: 0.0,
        })
    }

    /// Sets the starting point.
    pub fn set_x_0(&mut self, x_0: f64) -> &mut Self {
        self.next_x = x_0;
        self
    }
}

impl Method for NewtonRaphson {
    fn name(&self) -> &'static str {
        "newton-raphson"
    }

    fn info(&self) -> Option<&'static str> {
        Some(INFO)
    }

    fn set_verbosity(&mut self, level: Verbosity) {
        self.verbosity = level;
    }

    fn hparam_set(&mut self, id: &str, value: Value) -> Result<(), Error> {
        match id {
            "x_0" => self.next_x = value.as_float()?,
            "f_tol" => self.f_tol = value.as_float()?,
            _ => return Err(Error::UnknownHParam(id.to_owned())),
        }
        Ok(())
    }

    fn hparam_get(&self, id: &str) -> Result<Value, Error> {
        match id {
            "x_0" => Ok(Value::Float(self.next_x)),
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
            State::Initial | State::Running => {
                out[0] = self.next_x;
                Ok(())
            }
            State::Failed => Err(Error::Singularity("derivative vanished".into())),
            State::Done => Err(Error::StateViolation(
                "next requested after completion".into(),
            )),
        }
    }

    fn set_value(&mut self, _x: &DVector<f64>, _fx: f64) -> Result<(), Error> {
        if self.verbosity.allows(Verbosity::Error) {
            error!("newton-raphson requires a derivative");
        }
        Err(Error::Unsupported(
            "newton-raphson requires a derivative; supply values with a gradient".into(),
        ))
    }

    fn set_value_with_gradient(
        &mut self,
        x: &DVector<f64>,
        fx: f64,
        gradient: &DVector<f64>,
    ) -> Result<(), Error> {
        if x.nrows() != 1 || gradient.nrows() != 1 {
            return Err(Error::InvalidArgument(
                "input and gradient vectors must have length 1".into(),
            ));
        }

        match self.state {
            State::Initial | State::Running => {
                let derivative = gradient[0];
                if derivative.abs() < SINGULARITY_EPS {
                    if self.verbosity.allows(Verbosity::Error) {
                        error!(
                            "derivative {derivative} below protection threshold"
                        );
                    }
                    self.state = State::Failed;
                    return Err(Error::Singularity("derivative vanished".into()));
                }

                self.last_x = x[0];
                self.last_fx = fx;
                self.next_x = x[0] - fx / derivative;
                self.state = State::Running;
                Ok(())
            }
            State::Failed => Err(Error::Singularity("derivative vanished".into())),
            State::Done => Err(Error::StateViolation(
                "set_value after completion".into(),
            )),
        }
    }

    fn done(&mut self) -> Result<Status, Error> {
        match self.state {
            State::Initial => Ok(Status::Continue),
            State::Failed => Err(Error::Singularity("derivative vanished".into())),
            State::Done => Ok(Status::Complete),
            State::Running => {
                if self.last_fx.abs() < self.f_tol {
                    self.root = self.last_x;
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
