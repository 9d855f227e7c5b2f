//! Differential evolution global minimizer.
//!
//! [Differential
//! evolution](https://en.wikipedia.org/wiki/Differential_evolution) evolves
//! a population of candidate vectors: each generation, every member is
//! challenged by a trial vector mixed from scaled differences of other
//! members, and the better of the two survives. It needs no derivatives and
//! copes well with rugged, multi-modal objectives at the cost of many
//! evaluations.
//!
//! Randomness comes from a per-instance [`fastrand::Rng`], so runs are
//! reproducible under a fixed seed via
//! [`with_rng`](DifferentialEvolution::with_rng).
//!
//! Note: crossover is not currently implemented.
//!
//! # References
//!
//! \[1\] Storn, R., Price, K. Differential Evolution -- A Simple and
//! Efficient Heuristic for global Optimization over Continuous Spaces.
//! Journal of Global Optimization 11, 341-359 (1997).
//! <https://doi.org/10.1023/A:1008202821328>

use getset::{CopyGetters, Setters};
use log::{debug, info, warn};
use nalgebra::DVector;

use crate::core::{Error, Method, Status, Value};
use crate::diagnostics::{default_verbosity, Verbosity};

const INFO: &str = "\
Differential evolution is a minimization method that uses a population of
randomized guesses that are systematically updated with better guesses
until a minimum value is found.

Note: crossover is not currently implemented.

Hyper-parameters:
name       required  type    default Description
lower      optional  vector  none    Lower bounds on the search region.
upper      optional  vector  none    Upper bounds on the search region.
start      optional  vector  none    Center of the initial search region.
NP         optional  int     10*dims Population size (at least 3).
F          optional  float   0.5     Scaling of the vector difference.
lambda     optional  float   0.1     Scaling of the best-vector difference.
iterations optional  int     1000    Number of generations to run.

Results:
name            type    Description
minimum x       vector  Best vector of the final generation.
minimum f       float   Objective value of the best vector.

References:
Storn, R., Price, K. Differential Evolution - A Simple and Efficient
        Heuristic for global Optimization over Continuous Spaces.
        Journal of Global Optimization 11, 341-359 (1997).
        https://doi.org/10.1023/A:1008202821328
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    Running,
    Done,
}

/// Differential evolution minimizer. See [module](self) documentation for
/// more details.
#[derive(CopyGetters, Setters)]
pub struct DifferentialEvolution {
    dim: usize,
    state: State,
    verbosity: Verbosity,
    rng: fastrand::Rng,

    np: usize,
    allocated_np: usize,
    /// Scaling factor applied to the difference of two random members.
    /// Default: `0.5`.
    #[getset(get_copy = "pub", set = "pub")]
    f_scale: f64,
    /// Scaling factor applied to the difference toward the best member.
    /// Default: `0.1`.
    #[getset(get_copy = "pub", set = "pub")]
    lambda: f64,
    /// Remaining generation budget. Default: `1000`.
    #[getset(get_copy = "pub", set = "pub")]
    iterations: i64,
    start: Option<DVector<f64>>,
    lower: Option<DVector<f64>>,
    upper: Option<DVector<f64>>,

    x: Vec<DVector<f64>>,
    x_prev: Vec<DVector<f64>>,
    fx: Vec<f64>,
    fx_prev: Vec<f64>,
    current: usize,
    best: usize,
    trial: DVector<f64>,

    min_x: DVector<f64>,
    min_f: f64,
}

impl DifferentialEvolution {
    /// Initializes the method for the given input dimensionality with a
    /// freshly seeded random source.
    pub fn new(dim: usize) -> Result<Self, Error> {
        Self::with_rng(dim, fastrand::Rng::new())
    }

    /// Initializes the method with the given random source.
    ///
    /// Two instances built with identically seeded sources and identical
    /// configuration produce identical sampling sequences.
    pub fn with_rng(dim: usize, rng: fastrand::Rng) -> Result<Self, Error> {
        if dim < 1 {
            return Err(Error::InvalidArgument(
                "dimension must be at least 1".into(),
            ));
        }

        let np = 10 * dim;
        Ok(Self {
            dim,
            state: State::Initial,
            verbosity: default_verbosity(),
            rng,
            np,
            allocated_np: np,
            f_scale: 0.5,
            lambda: 0.1,
            iterations: 1000,
            start: None,
            lower: None,
            upper: None,
            x: vec![DVector::zeros(dim); np],
            x_prev: vec![DVector::zeros(dim); np],
            fx: vec![0.0; np],
            fx_prev: vec![0.0; np],
            current: 0,
            best: 0,
            trial: DVector::zeros(dim),
            min_x: DVector::zeros(dim),
            min_f: 0.0,
        })
    }

    /// Sets the population size.
    ///
    /// Values below 3 are floored at the start of iteration, with a
    /// warning.
    pub fn set_np(&mut self, np: usize) -> &mut Self {
        self.np = np;
        self
    }

    /// Returns the population size.
    pub fn np(&self) -> usize {
        self.np
    }

    /// Repairs inconsistent settings and resizes the generations when the
    /// population size changed.
    fn validate_hparams(&mut self) {
        if let (Some(lower), Some(upper)) = (&mut self.lower, &mut self.upper) {
            for j in 0..self.dim {
                if upper[j] < lower[j] {
                    if self.verbosity.allows(Verbosity::Warn) {
                        warn!(
                            "bounds for dimension {j} are out of order (lower = {}, \
                             upper = {}), swapping them",
                            lower[j], upper[j]
                        );
                    }
                    std::mem::swap(&mut lower[j], &mut upper[j]);
                }
            }
        }

        if self.np < 3 {
            if self.verbosity.allows(Verbosity::Warn) {
                warn!("NP must be at least 3, was {}, changing it to 3", self.np);
            }
            self.np = 3;
        }

        if self.np != self.allocated_np {
            if self.verbosity.allows(Verbosity::Debug) {
                debug!(
                    "resizing generations from {} to {} members",
                    self.allocated_np, self.np
                );
            }
            self.x = vec![DVector::zeros(self.dim); self.np];
            self.x_prev = vec![DVector::zeros(self.dim); self.np];
            self.fx = vec![0.0; self.np];
            self.fx_prev = vec![0.0; self.np];
            self.current = 0;
            self.best = 0;
            self.allocated_np = self.np;
        }
    }

    /// Fills the trial vector with an initial-generation sample.
    fn fill_first_gen(&mut self) {
        if let Some(start) = &self.start {
            // A point scattered around the start point.
            for j in 0..self.dim {
                self.trial[j] = start[j] + (self.rng.f64() - 0.5);
            }
            self.clamp_trial();
        } else if let (Some(lower), Some(upper)) = (&self.lower, &self.upper) {
            // Uniform in the bounding box.
            for j in 0..self.dim {
                self.trial[j] = lower[j] + self.rng.f64() * (upper[j] - lower[j]);
            }
        } else {
            for j in 0..self.dim {
                self.trial[j] = self.rng.f64() - 0.5;
            }
            self.clamp_trial();
        }
    }

    fn clamp_trial(&mut self) {
        if let Some(lower) = &self.lower {
            for j in 0..self.dim {
                if self.trial[j] < lower[j] {
                    self.trial[j] = lower[j];
                }
            }
        }
        if let Some(upper) = &self.upper {
            for j in 0..self.dim {
                if self.trial[j] > upper[j] {
                    self.trial[j] = upper[j];
                }
            }
        }
    }

    fn check_bounds_vector(&self, x: &DVector<f64>, what: &str) -> Result<(), Error> {
        if x.nrows() != self.dim {
            return Err(Error::InvalidArgument(format!(
                "{what} has length {}, expected {}",
                x.nrows(),
                self.dim
            )));
        }
        Ok(())
    }
}

impl Method for DifferentialEvolution {
    fn name(&self) -> &'static str {
        "differential evolution"
    }

    fn info(&self) -> Option<&'static str> {
        Some(INFO)
    }

    fn set_verbosity(&mut self, level: Verbosity) {
        self.verbosity = level;
    }

    fn hparam_set(&mut self, id: &str, value: Value) -> Result<(), Error> {
        match id {
            "NP" => self.np = value.as_int()?.max(0) as usize,
            "F" => self.f_scale = value.as_float()?,
            "lambda" => self.lambda = value.as_float()?,
            "iterations" => self.iterations = value.as_int()?,
            "start" => {
                let start = value.into_vector()?;
                self.check_bounds_vector(&start, "start vector")?;
                self.start = Some(start);
            }
            "lower" => {
                let lower = value.into_vector()?;
                self.check_bounds_vector(&lower, "lower bounds vector")?;
                self.lower = Some(lower);
            }
            "upper" => {
                let upper = value.into_vector()?;
                self.check_bounds_vector(&upper, "upper bounds vector")?;
                self.upper = Some(upper);
            }
            _ => return Err(Error::UnknownHParam(id.to_owned())),
        }
        Ok(())
    }

    fn hparam_get(&self, id: &str) -> Result<Value, Error> {
        match id {
            "NP" => Ok(Value::Int(self.np as i64)),
            "F" => Ok(Value::Float(self.f_scale)),
            "lambda" => Ok(Value::Float(self.lambda)),
            "iterations" => Ok(Value::Int(self.iterations)),
            "start" => self
                .start
                .clone()
                .map(Value::Vector)
                .ok_or_else(|| Error::InvalidArgument("start point has not been set".into())),
            "lower" => self
                .lower
                .clone()
                .map(Value::Vector)
                .ok_or_else(|| Error::InvalidArgument("lower bounds have not been set".into())),
            "upper" => self
                .upper
                .clone()
                .map(Value::Vector)
                .ok_or_else(|| Error::InvalidArgument("upper bounds have not been set".into())),
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
                self.validate_hparams();
                self.fill_first_gen();
                out.copy_from(&self.trial);
                Ok(())
            }
            State::Running => {
                // Pick distinct r1, r2, r3.
                let np = self.np;
                let r1 = self.rng.usize(0..np);
                let mut r2 = self.rng.usize(0..np);
                while r2 == r1 {
                    r2 = self.rng.usize(0..np);
                }
                let mut r3 = self.rng.usize(0..np);
                while r3 == r1 || r3 == r2 {
                    r3 = self.rng.usize(0..np);
                }
                if self.verbosity.allows(Verbosity::Debug) {
                    debug!("r1, r2, r3 = {r1}, {r2}, {r3}");
                }

                let i = self.current;
                if self.lambda != 0.0 {
                    let trial = &self.x_prev[i]
                        + (&self.x_prev[self.best] - &self.x_prev[i]) * self.lambda
                        + (&self.x_prev[r2] - &self.x_prev[r3]) * self.f_scale;
                    self.trial.copy_from(&trial);
                } else if self.f_scale != 0.0 {
                    let trial =
                        &self.x_prev[r1] + (&self.x_prev[r2] - &self.x_prev[r3]) * self.f_scale;
                    self.trial.copy_from(&trial);
                } else {
                    // Both scaling factors disabled; resubmit the current
                    // member.
                    self.trial.copy_from(&self.x_prev[i]);
                }

                self.clamp_trial();
                out.copy_from(&self.trial);
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
        if self.state == State::Done {
            return Err(Error::StateViolation(
                "set_value after completion".into(),
            ));
        }

        // Greedy per-slot replacement; the initial generation accepts
        // unconditionally.
        let i = self.current;
        if self.state == State::Initial || fx < self.fx_prev[i] {
            self.x[i].copy_from(x);
            self.fx[i] = fx;
        } else {
            self.x[i].copy_from(&self.x_prev[i]);
            self.fx[i] = self.fx_prev[i];
        }

        if fx < self.fx[self.best] {
            if self.verbosity.allows(Verbosity::Info) {
                info!(
                    "new best value {fx} for input {:?} at position {i}",
                    x.as_slice()
                );
            }
            self.best = i;
        }

        self.current += 1;

        if self.current >= self.np {
            if self.state == State::Initial {
                if self.verbosity.allows(Verbosity::Debug) {
                    debug!("finished initial generation of size {}", self.np);
                }
                self.state = State::Running;
            }

            std::mem::swap(&mut self.x, &mut self.x_prev);
            std::mem::swap(&mut self.fx, &mut self.fx_prev);
            self.current = 0;
            self.iterations -= 1;
        }

        Ok(())
    }

    fn done(&mut self) -> Result<Status, Error> {
        match self.state {
            State::Initial => Ok(Status::Continue),
            State::Done => Ok(Status::Complete),
            State::Running => {
                if self.iterations <= 0 {
                    // The just-completed generation sits in x_prev after the
                    // swap.
                    self.min_f = self.fx_prev[self.best];
                    self.min_x.copy_from(&self.x_prev[self.best]);
                    self.state = State::Done;

                    if self.verbosity.allows(Verbosity::Info) {
                        info!(
                            "generation budget exhausted, minimum f = {}",
                            self.min_f
                        );
                    }

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
            "minimum x" => Ok(Value::Vector(self.min_x.clone())),
            "minimum f" => Ok(Value::Float(self.min_f)),
            _ => Err(Error::UnknownResult(id.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ackley, drive_method, sphere};

    fn seeded(dim: usize, seed: u64) -> DifferentialEvolution {
        DifferentialEvolution::with_rng(dim, fastrand::Rng::with_seed(seed)).unwrap()
    }

    #[test]
    fn minimizes_ackley() {
        let mut method = seeded(2, 11);
        method.set_np(20).set_iterations(10_000);
        method
            .hparam_set("start", Value::from(vec![1.0, 1.0]))
            .unwrap();

        drive_method(&mut method, 2, ackley, 20 * 10_001).unwrap();

        let min_f = method.result("minimum f").unwrap().as_float().unwrap();
        assert!(min_f < 1e-2, "minimum f = {min_f}");
    }

    #[test]
    fn sampling_is_deterministic_under_a_fixed_seed() {
        let run = |seed: u64| {
            let mut method = seeded(2, seed);
            method.set_np(10).set_iterations(50);
            drive_method(&mut method, 2, sphere, 10 * 51).unwrap();
            (
                method.result("minimum x").unwrap(),
                method.result("minimum f").unwrap(),
            )
        };

        let (x_a, f_a) = run(42);
        let (x_b, f_b) = run(42);
        let (_, f_c) = run(43);

        assert_eq!(x_a, x_b);
        assert_eq!(f_a, f_b);
        assert_ne!(f_a, f_c);
    }

    #[test]
    fn population_floor_is_repaired() {
        let mut method = seeded(2, 1);
        method.set_np(1);

        let mut out = DVector::zeros(2);
        method.next(&mut out).unwrap();
        assert_eq!(method.np(), 3);
    }

    #[test]
    fn inverted_bounds_are_swapped() {
        let mut method = seeded(1, 1);
        method
            .hparam_set("lower", Value::from(vec![5.0]))
            .unwrap();
        method
            .hparam_set("upper", Value::from(vec![-5.0]))
            .unwrap();

        let mut out = DVector::zeros(1);
        method.next(&mut out).unwrap();

        let lower = method.hparam_get("lower").unwrap().into_vector().unwrap();
        let upper = method.hparam_get("upper").unwrap().into_vector().unwrap();
        assert_eq!(lower[0], -5.0);
        assert_eq!(upper[0], 5.0);
        assert!((-5.0..=5.0).contains(&out[0]));
    }

    #[test]
    fn bounds_clamp_every_sample() {
        let mut method = seeded(2, 3);
        method.set_np(5).set_iterations(20);
        method
            .hparam_set("lower", Value::from(vec![-0.25, -0.25]))
            .unwrap();
        method
            .hparam_set("upper", Value::from(vec![0.25, 0.25]))
            .unwrap();

        let mut out = DVector::zeros(2);
        for _ in 0..5 * 21 {
            if method.done().unwrap() == Status::Complete {
                break;
            }
            method.next(&mut out).unwrap();
            assert!(out.iter().all(|v| (-0.25..=0.25).contains(v)));
            method.set_value(&out, sphere(&out)).unwrap();
        }
    }

    #[test]
    fn calls_after_completion_fail() {
        let mut method = seeded(1, 5);
        method.set_np(3).set_iterations(1);
        drive_method(&mut method, 1, sphere, 100).unwrap();

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
    fn wrong_length_bounds_are_rejected() {
        let mut method = seeded(2, 1);
        assert!(matches!(
            method.hparam_set("lower", Value::from(vec![0.0])),
            Err(Error::InvalidArgument(_))
        ));
    }
}
