//! Nelder-Mead (simplex) multi-dimensional minimizer.
//!
//! [Nelder-Mead](https://en.wikipedia.org/wiki/Nelder%E2%80%93Mead_method)
//! maintains a simplex of *n + 1* points and walks it downhill by
//! reflecting, expanding or contracting the worst point against the
//! centroid of the rest, shrinking the whole simplex toward the best point
//! when nothing else helps. Every candidate point is emitted to the caller
//! for evaluation, so one classical iteration spans several ask/tell
//! rounds; the shrink transformation in particular is split into two
//! adjacent states because it needs two external evaluations.
//!
//! # References
//!
//! \[1\] [Scholarpedia](http://www.scholarpedia.org/article/Nelder-Mead_algorithm)
//!
//! \[2\] [Wikipedia](https://en.wikipedia.org/wiki/Nelder%E2%80%93Mead_method)

use getset::{CopyGetters, Setters};
use log::{debug, info, warn};
use nalgebra::DVector;

use crate::core::{Error, Method, Status, Value};
use crate::diagnostics::{default_verbosity, Verbosity};

const INFO: &str = "\
The Nelder-Mead method minimizes a multi-dimensional function by moving
a simplex of n+1 points downhill through reflection, expansion,
contraction and shrinking, using only function values.

Hyper-parameters:
name            required        type    default Description
alpha           optional        float   1       Reflection coefficient (> 0).
beta            optional        float   0.5     Contraction coefficient (0 < beta < 1).
gamma           optional        float   2       Expansion coefficient (> 1).
delta           optional        float   0.5     Shrink coefficient (0 < delta < 1).
max_iterations  optional        int     30      Evaluation budget.
dist_threshold  optional        float   1e-5    Terminates when the best and
                                                worst simplex points are
                                                closer than this.

Seeding:
The seed vector is the first simplex point; the remaining points are
perturbations of it, one per dimension.

References:
http://www.scholarpedia.org/article/Nelder-Mead_algorithm
";

#[derive(Debug, Clone)]
struct Sample {
    point: DVector<f64>,
    value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    Reflect,
    Expand,
    ContractOut,
    ContractIn,
    Shrink,
    ShrinkSecond,
}

/// Nelder-Mead minimizer. See [module](self) documentation for more
/// details.
#[derive(CopyGetters, Setters)]
pub struct NelderMead {
    dim: usize,
    state: State,
    verbosity: Verbosity,
    finished: bool,
    iterations: usize,

    simplex: Vec<Sample>,
    seed: DVector<f64>,
    reflected: Option<Sample>,
    shrink_second: DVector<f64>,

    /// Reflection coefficient. Default: `1`.
    #[getset(get_copy = "pub", set = "pub")]
    alpha: f64,
    /// Contraction coefficient. Default: `0.5`.
    #[getset(get_copy = "pub", set = "pub")]
    beta: f64,
    /// Expansion coefficient. Default: `2`.
    #[getset(get_copy = "pub", set = "pub")]
    gamma: f64,
    /// Shrink coefficient. Default: `0.5`.
    #[getset(get_copy = "pub", set = "pub")]
    delta: f64,
    /// Evaluation budget. Default: `30`.
    #[getset(get_copy = "pub", set = "pub")]
    max_iterations: usize,
    /// Termination threshold on the best-to-worst simplex distance.
    /// Default: `1e-5`.
    #[getset(get_copy = "pub", set = "pub")]
    dist_threshold: f64,
}

impl NelderMead {
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
            finished: false,
            iterations: 0,
            simplex: Vec::with_capacity(dim + 1),
            seed: DVector::zeros(dim),
            reflected: None,
            shrink_second: DVector::zeros(dim),
            alpha: 1.0,
            beta: 0.5,
            gamma: 2.0,
            delta: 0.5,
            max_iterations: 30,
            dist_threshold: 1e-5,
        })
    }

    /// Returns the best simplex point seen so far, once the simplex exists.
    pub fn best_point(&self) -> Option<(&DVector<f64>, f64)> {
        self.simplex
            .iter()
            .min_by(|a, b| {
                a.value
                    .partial_cmp(&b.value)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|sample| (&sample.point, sample.value))
    }

    fn in_shrink(&self) -> bool {
        matches!(self.state, State::Shrink | State::ShrinkSecond)
    }

    fn sort_simplex(&mut self) {
        self.simplex.sort_by(|a, b| {
            a.value
                .partial_cmp(&b.value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        if self.verbosity.allows(Verbosity::Debug) {
            for sample in &self.simplex {
                debug!(
                    "simplex: value = {}; point = {:?}",
                    sample.value,
                    sample.point.as_slice()
                );
            }
        }
    }

    fn centroid(&self) -> DVector<f64> {
        // Mean of all simplex points except the worst.
        let n = self.simplex.len() - 1;
        let mut centroid = DVector::zeros(self.dim);
        for sample in &self.simplex[..n] {
            centroid += &sample.point;
        }
        centroid / n as f64
    }

    fn reflected(&self) -> Result<&Sample, Error> {
        self.reflected
            .as_ref()
            .ok_or_else(|| Error::StateViolation("reflection sample missing".into()))
    }
}

impl Method for NelderMead {
    fn name(&self) -> &'static str {
        "nelder-mead"
    }

    fn info(&self) -> Option<&'static str> {
        Some(INFO)
    }

    fn set_verbosity(&mut self, level: Verbosity) {
        self.verbosity = level;
    }

    fn hparam_set(&mut self, id: &str, value: Value) -> Result<(), Error> {
        match id {
            "alpha" => {
                self.alpha = value.as_float()?;
                if self.alpha <= 0.0 && self.verbosity.allows(Verbosity::Warn) {
                    warn!("alpha should be greater than 0, got {}", self.alpha);
                }
            }
            "beta" => {
                self.beta = value.as_float()?;
                if !(0.0 < self.beta && self.beta < 1.0) && self.verbosity.allows(Verbosity::Warn)
                {
                    warn!("beta should be inside (0, 1), got {}", self.beta);
                }
            }
            "gamma" => {
                self.gamma = value.as_float()?;
                if self.gamma <= 1.0 && self.verbosity.allows(Verbosity::Warn) {
                    warn!("gamma should be greater than 1, got {}", self.gamma);
                }
            }
            "delta" => {
                self.delta = value.as_float()?;
                if !(0.0 < self.delta && self.delta < 1.0)
                    && self.verbosity.allows(Verbosity::Warn)
                {
                    warn!("delta should be inside (0, 1), got {}", self.delta);
                }
            }
            "max_iterations" => {
                let budget = value.as_int()?;
                if budget < 0 {
                    return Err(Error::InvalidArgument(format!(
                        "max_iterations must be non-negative, got {budget}"
                    )));
                }
                self.max_iterations = budget as usize;
            }
            "dist_threshold" => self.dist_threshold = value.as_float()?,
            _ => return Err(Error::UnknownHParam(id.to_owned())),
        }
        Ok(())
    }

    fn hparam_get(&self, id: &str) -> Result<Value, Error> {
        match id {
            "alpha" => Ok(Value::Float(self.alpha)),
            "beta" => Ok(Value::Float(self.beta)),
            "gamma" => Ok(Value::Float(self.gamma)),
            "delta" => Ok(Value::Float(self.delta)),
            "max_iterations" => Ok(Value::Int(self.max_iterations as i64)),
            "dist_threshold" => Ok(Value::Float(self.dist_threshold)),
            _ => Err(Error::UnknownHParam(id.to_owned())),
        }
    }

    fn seed(&mut self, x: &DVector<f64>) -> Result<(), Error> {
        if x.nrows() != self.dim {
            return Err(Error::InvalidArgument(format!(
                "seed vector has length {}, expected {}",
                x.nrows(),
                self.dim
            )));
        }
        if self.state != State::Initial {
            return Err(Error::NotReady(
                "seed is only accepted before iteration starts".into(),
            ));
        }

        self.seed.copy_from(x);
        Ok(())
    }

    fn next(&mut self, out: &mut DVector<f64>) -> Result<(), Error> {
        if out.nrows() != self.dim {
            return Err(Error::InvalidArgument(format!(
                "output vector has length {}, expected {}",
                out.nrows(),
                self.dim
            )));
        }
        if self.finished {
            return Err(Error::StateViolation(
                "next requested after completion".into(),
            ));
        }

        // Bootstrap: the seed first, then one perturbed copy per dimension.
        if self.state == State::Initial {
            if self.simplex.len() >= self.dim + 1 {
                return Err(Error::StateViolation(
                    "initial state with a full simplex".into(),
                ));
            }
            out.copy_from(&self.seed);
            if !self.simplex.is_empty() {
                let pos = self.simplex.len() - 1;
                out[pos] += self.simplex.len() as f64;
            }
            return Ok(());
        }

        if !self.in_shrink() {
            self.sort_simplex();
        }

        let centroid = self.centroid();
        let n = self.simplex.len() - 1;

        match self.state {
            State::Reflect => {
                let worst = &self.simplex[n].point;
                let point = &centroid + (&centroid - worst) * self.alpha;
                out.copy_from(&point);
            }
            State::Expand => {
                let reflected = self.reflected()?;
                let point = &centroid + (&reflected.point - &centroid) * self.gamma;
                out.copy_from(&point);
            }
            State::ContractOut => {
                let reflected = self.reflected()?;
                let point = &centroid + (&reflected.point - &centroid) * self.beta;
                out.copy_from(&point);
            }
            State::ContractIn => {
                let worst = &self.simplex[n].point;
                let point = &centroid + (worst - &centroid) * self.beta;
                out.copy_from(&point);
            }
            State::Shrink => {
                // Emit the replacement for the worst point and stash the
                // replacement for the second worst until its turn.
                let best = &self.simplex[0].point;
                let second = &self.simplex[n - 1].point;
                let worst = &self.simplex[n].point;
                self.shrink_second = best + (second - best) * self.delta;
                let point = best + (worst - best) * self.delta;
                out.copy_from(&point);
            }
            State::ShrinkSecond => out.copy_from(&self.shrink_second),
            State::Initial => unreachable!("handled above"),
        }

        if self.verbosity.allows(Verbosity::Debug) {
            debug!("next point ({:?}): {:?}", self.state, out.as_slice());
        }

        Ok(())
    }

    fn set_value(&mut self, x: &DVector<f64>, fx: f64) -> Result<(), Error> {
        if x.nrows() != self.dim {
            return Err(Error::InvalidArgument(format!(
                "input vector has length {}, expected {}",
                x.nrows(),
                self.dim
            )));
        }
        if self.finished {
            return Err(Error::StateViolation(
                "set_value after completion".into(),
            ));
        }

        self.iterations += 1;

        let sample = Sample {
            point: x.clone(),
            value: fx,
        };

        // The shrink states replace points directly; values arrive for the
        // positions emitted by the matching `next` calls.
        let n = self.simplex.len().saturating_sub(1);
        match self.state {
            State::ShrinkSecond => {
                self.simplex[n - 1] = sample;
                self.state = State::Reflect;
                return Ok(());
            }
            State::Shrink => {
                self.simplex[n] = sample;
                self.state = State::ShrinkSecond;
                return Ok(());
            }
            _ => {}
        }

        // Bootstrap samples fill the simplex.
        if self.simplex.len() <= self.dim {
            self.simplex.push(sample);
            if self.simplex.len() >= self.dim + 1 {
                self.state = State::Reflect;
            }
            return Ok(());
        }

        self.sort_simplex();

        let n = self.simplex.len() - 1;
        let value_worst = self.simplex[n].value;
        let value_second = self.simplex[n - 1].value;
        let value_best = self.simplex[0].value;

        if self.verbosity.allows(Verbosity::Debug) {
            debug!(
                "f(h) = {value_worst}, f(s) = {value_second}, f(l) = {value_best}, f(r) = {fx}"
            );
        }

        match self.state {
            State::Reflect => {
                if value_best <= fx && fx < value_second {
                    // Accept the reflected point and end the iteration.
                    self.simplex[n] = sample;
                    return Ok(());
                }
                self.reflected = Some(sample);
            }
            State::Expand => {
                let reflected = self.reflected()?;
                if fx < reflected.value {
                    self.simplex[n] = sample;
                } else {
                    self.simplex[n] = reflected.clone();
                }
                self.state = State::Reflect;
                return Ok(());
            }
            State::ContractOut => {
                if fx < self.reflected()?.value {
                    self.simplex[n] = sample;
                    self.state = State::Reflect;
                } else {
                    self.state = State::Shrink;
                }
                return Ok(());
            }
            State::ContractIn => {
                if fx < value_worst {
                    self.simplex[n] = sample;
                    self.state = State::Reflect;
                } else {
                    self.state = State::Shrink;
                }
                return Ok(());
            }
            State::Initial | State::Shrink | State::ShrinkSecond => {
                return Err(Error::StateViolation(
                    "unexpected value in the current state".into(),
                ))
            }
        }

        // The reflected point was not accepted outright; pick the follow-up
        // transformation from its value.
        if fx < value_best {
            self.state = State::Expand;
        } else if value_second <= fx && fx < value_worst {
            self.state = State::ContractOut;
        } else {
            self.state = State::ContractIn;
        }

        Ok(())
    }

    fn done(&mut self) -> Result<Status, Error> {
        if self.finished {
            return Ok(Status::Complete);
        }
        if self.state == State::Initial {
            return Ok(Status::Continue);
        }

        if self.iterations > self.max_iterations {
            if self.verbosity.allows(Verbosity::Info) {
                info!(
                    "evaluation count ({}) exceeded limit ({})",
                    self.iterations, self.max_iterations
                );
            }
            self.finished = true;
            return Ok(Status::Complete);
        }

        if !self.in_shrink() {
            self.sort_simplex();
        }

        let n = self.simplex.len() - 1;
        let dist = (&self.simplex[0].point - &self.simplex[n].point).norm();
        if dist < self.dist_threshold {
            if self.verbosity.allows(Verbosity::Info) {
                info!(
                    "simplex size limit ({}) reached ({dist})",
                    self.dist_threshold
                );
            }
            self.finished = true;
            return Ok(Status::Complete);
        }

        Ok(Status::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{drive_method, rosenbrock, sphere};

    #[test]
    fn bootstrap_perturbs_the_seed() {
        let mut method = NelderMead::new(2).unwrap();
        method
            .seed(&DVector::from_vec(vec![3.0, 4.0]))
            .unwrap();

        let mut out = DVector::zeros(2);
        method.next(&mut out).unwrap();
        assert_eq!(out.as_slice(), &[3.0, 4.0]);
        method.set_value(&out, 1.0).unwrap();

        method.next(&mut out).unwrap();
        assert_eq!(out.as_slice(), &[4.0, 4.0]);
        method.set_value(&out, 2.0).unwrap();

        method.next(&mut out).unwrap();
        assert_eq!(out.as_slice(), &[3.0, 6.0]);
    }

    #[test]
    fn seed_after_bootstrap_is_rejected() {
        let mut method = NelderMead::new(2).unwrap();
        let seed = DVector::zeros(2);
        method.seed(&seed).unwrap();

        let mut out = DVector::zeros(2);
        for _ in 0..3 {
            method.next(&mut out).unwrap();
            method.set_value(&out, sphere(&out)).unwrap();
        }

        assert!(matches!(method.seed(&seed), Err(Error::NotReady(_))));
    }

    #[test]
    fn two_phase_shrink_emits_both_replacements() {
        // Feed values chosen to force reflect -> contract-in -> shrink and
        // check every emitted point against the hand-computed trace for a
        // simplex {(0,0), (1,0), (0,2)} with values {0, 1, 2}.
        let mut method = NelderMead::new(2).unwrap();
        method.seed(&DVector::zeros(2)).unwrap();

        let values = [0.0, 1.0, 2.0, 5.0, 5.0, 0.5, 0.25];
        let expected = [
            [0.0, 0.0],  // seed
            [1.0, 0.0],  // bootstrap
            [0.0, 2.0],  // bootstrap
            [1.0, -2.0], // reflection of (0,2) over centroid (0.5,0)
            [0.25, 1.0], // inner contraction toward (0,2)
            [0.0, 1.0],  // shrink: replacement for the worst point
            [0.5, 0.0],  // shrink second phase: replacement for the second worst
        ];

        let mut out = DVector::zeros(2);
        for (fx, point) in values.iter().zip(expected) {
            method.next(&mut out).unwrap();
            assert_eq!(out.as_slice(), point);
            method.set_value(&out, *fx).unwrap();
        }

        // Shrink is finished; the machine reflects again.
        assert_eq!(method.state, State::Reflect);
        method.next(&mut out).unwrap();
        assert_eq!(out.as_slice(), &[0.5, -1.0]);
    }

    #[test]
    fn rosenbrock_converges_into_the_valley() {
        let mut method = NelderMead::new(2).unwrap();
        method.set_max_iterations(150);
        method.seed(&DVector::zeros(2)).unwrap();

        drive_method(&mut method, 2, rosenbrock, 200).unwrap();

        let (best, _) = method.best_point().unwrap();
        let dist = (best - DVector::from_vec(vec![1.0, 1.0])).norm();
        assert!(dist < 0.5, "best point {:?} too far", best.as_slice());
    }

    #[test]
    fn sphere_reaches_default_budget() {
        let mut method = NelderMead::new(2).unwrap();
        method
            .seed(&DVector::from_vec(vec![1.0, -1.0]))
            .unwrap();

        drive_method(&mut method, 2, sphere, 100).unwrap();

        let (_, best_value) = method.best_point().unwrap();
        assert!(best_value <= 2.0);
    }

    #[test]
    fn distance_threshold_terminates() {
        let mut method = NelderMead::new(1).unwrap();
        method.set_max_iterations(10_000);
        method.seed(&DVector::from_vec(vec![2.0])).unwrap();

        let evals = drive_method(&mut method, 1, sphere, 10_000).unwrap();
        assert!(evals < 10_000);

        let (best, _) = method.best_point().unwrap();
        assert!(best[0].abs() < 1e-3);
    }

    #[test]
    fn calls_after_completion_fail() {
        let mut method = NelderMead::new(2).unwrap();
        method.seed(&DVector::zeros(2)).unwrap();
        drive_method(&mut method, 2, sphere, 100).unwrap();

        let mut out = DVector::zeros(2);
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
    fn out_of_range_coefficients_are_accepted_with_warning() {
        let mut method = NelderMead::new(2).unwrap();
        method.hparam_set("alpha", Value::Float(-1.0)).unwrap();
        method.hparam_set("beta", Value::Float(2.0)).unwrap();
        assert_eq!(method.alpha(), -1.0);
        assert_eq!(method.beta(), 2.0);
    }
}
