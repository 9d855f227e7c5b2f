//! Finite-difference gradient estimation.
//!
//! Estimates the gradient of the objective at a base point with one forward
//! difference per dimension: the base point is evaluated once, then each
//! axis is stepped in turn and the slope recorded. The step can be a single
//! scalar or a per-dimension vector.
//!
//! # References
//!
//! \[1\] Anton, H. (1992). Calculus with analytic geometry -- 4th ed.
//! ISBN 0-471-50901-9

use getset::CopyGetters;
use log::debug;
use nalgebra::DVector;

use crate::core::{Error, Method, Status, Value};
use crate::diagnostics::{default_verbosity, Verbosity};

const INFO: &str = "\
The gradient estimation method uses small steps in each dimension to
estimate the gradient of a function at a specified point.

Hyper-parameters:
name            required        type    default Description
x0              REQUIRED        vector  zeros   Point where the gradient is
                                                estimated.
step            optional        float   1e-3    Step size to use.
step_vec        optional        vector  none    Step sizes to use per
                                                dimension.

Results:
name            type    Description
gradient        vector  Estimated gradient at x0.

References:
Anton, H. (1992). Calculus with analytic geometry -- 4th ed.
        ISBN 0-471-50901-9
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    Running,
    Done,
}

/// Forward-difference gradient estimator. See [module](self) documentation
/// for more details.
#[derive(CopyGetters)]
pub struct GradientEstimate {
    dim: usize,
    state: State,
    verbosity: Verbosity,

    x0: DVector<f64>,
    /// Scalar step size. Default: `1e-3`.
    #[getset(get_copy = "pub")]
    step: f64,
    steps: DVector<f64>,
    has_step_vec: bool,

    fx0: f64,
    axis: usize,
    gradient: DVector<f64>,
}

impl GradientEstimate {
    /// Initializes the method for the given input dimensionality.
    pub fn new(dim: usize) -> Result<Self, Error> {
        if dim < 1 {
            return Err(Error::InvalidArgument(
                "dimension must be at least 1".into(),
            ));
        }

        Ok(Self {
            dim,
            state: State::Initial,
            verbosity: default_verbosity(),
            x0: DVector::zeros(dim),
            step: 1e-3,
            steps: DVector::from_element(dim, 1e-3),
            has_step_vec: false,
            fx0: 0.0,
            axis: 0,
            gradient: DVector::zeros(dim),
        })
    }

    /// Sets the base point.
    pub fn set_x0(&mut self, x0: &DVector<f64>) -> Result<&mut Self, Error> {
        if x0.nrows() != self.dim {
            return Err(Error::InvalidArgument(format!(
                "base point has length {}, expected {}",
                x0.nrows(),
                self.dim
            )));
        }
        self.x0.copy_from(x0);
        Ok(self)
    }

    /// Sets the scalar step size, which must be nonzero.
    pub fn set_step(&mut self, step: f64) -> Result<&mut Self, Error> {
        if step == 0.0 {
            return Err(Error::InvalidArgument("step must be nonzero".into()));
        }
        self.step = step;
        Ok(self)
    }

    fn axis_step(&self, axis: usize) -> f64 {
        if self.has_step_vec {
            self.steps[axis]
        } else {
            self.step
        }
    }
}

impl Method for GradientEstimate {
    fn name(&self) -> &'static str {
        "gradient estimate"
    }

    fn info(&self) -> Option<&'static str> {
        Some(INFO)
    }

    fn set_verbosity(&mut self, level: Verbosity) {
        self.verbosity = level;
    }

    fn hparam_set(&mut self, id: &str, value: Value) -> Result<(), Error> {
        match id {
            "step" => {
                let step = value.as_float()?;
                if step == 0.0 {
                    return Err(Error::InvalidArgument("step must be nonzero".into()));
                }
                self.step = step;
            }
            "x0" => {
                let x0 = value.into_vector()?;
                self.set_x0(&x0)?;
            }
            "step_vec" => {
                let steps = value.into_vector()?;
                if steps.nrows() != self.dim {
                    return Err(Error::InvalidArgument(format!(
                        "step vector has length {}, expected {}",
                        steps.nrows(),
                        self.dim
                    )));
                }
                if steps.iter().any(|step| *step == 0.0) {
                    return Err(Error::InvalidArgument(
                        "step vector entries must be nonzero".into(),
                    ));
                }
                self.steps = steps;
                self.has_step_vec = true;
            }
            _ => return Err(Error::UnknownHParam(id.to_owned())),
        }
        Ok(())
    }

    fn hparam_get(&self, id: &str) -> Result<Value, Error> {
        match id {
            "step" => Ok(Value::Float(self.step)),
            "x0" => Ok(Value::Vector(self.x0.clone())),
            "step_vec" => {
                if self.has_step_vec {
                    Ok(Value::Vector(self.steps.clone()))
                } else {
                    Err(Error::InvalidArgument(
                        "step vector has not been set".into(),
                    ))
                }
            }
            _ => Err(Error::UnknownHParam(id.to_owned())),
        }
    }

    fn next(&mut self, out: &mut DVector<f64>) -> Result<(), Error> {
        if out.nrows() != self.dim {
            return Err(Error::InvalidArgument(format!(
                "output vector has length {}, expected {}",
                out.nrows(),
                self.dim
            )));
        }

        match self.state {
            State::Initial => {
                out.copy_from(&self.x0);
                Ok(())
            }
            State::Running => {
                out.copy_from(&self.x0);
                let step = self.axis_step(self.axis);
                if self.verbosity.allows(Verbosity::Debug) {
                    debug!("stepping axis {} by {step}", self.axis);
                }
                out[self.axis] += step;
                Ok(())
            }
            State::Done => Err(Error::StateViolation(
                "next requested after completion".into(),
            )),
        }
    }

    fn set_value(&mut self, x: &DVector<f64>, fx: f64) -> Result<(), Error> {
        if x.nrows() != self.dim {
            return Err(Error::InvalidArgument(format!(
                "input vector has length {}, expected {}",
                x.nrows(),
                self.dim
            )));
        }

        match self.state {
            State::Initial => {
                self.fx0 = fx;
                self.axis = 0;
                self.state = State::Running;
                Ok(())
            }
            State::Running => {
                let step = self.axis_step(self.axis);
                self.gradient[self.axis] = (fx - self.fx0) / step;
                self.axis += 1;
                if self.axis >= self.dim {
                    self.state = State::Done;
                }
                Ok(())
            }
            State::Done => Err(Error::StateViolation(
                "set_value after completion".into(),
            )),
        }
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
            "gradient" => Ok(Value::Vector(self.gradient.clone())),
            _ => Err(Error::UnknownResult(id.to_owned())),
        }
    }
}
