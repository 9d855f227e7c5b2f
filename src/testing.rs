//! Testing objectives and loop helpers useful for benchmarking, debugging
//! and smoke testing.
//!
//! The objective functions are classical optimization benchmarks; since the
//! caller owns the evaluation loop in this crate, they are plain functions
//! over a vector rather than trait implementations. [`drive`] and
//! [`drive_method`] pump a session or a bare method against such a function
//! until completion or budget exhaustion.
//!
//! # References
//!
//! \[1\] [A Literature Survey of Benchmark Functions For Global Optimization
//! Problems](https://arxiv.org/abs/1308.4008)

#![allow(unused)]

use std::f64::consts::{E, PI};

use nalgebra::DVector;
use thiserror::Error;

use crate::core::{Error as DriverError, Method, Status};
use crate::driver::Session;

/// Sphere function; the global minimum 0 is at the origin.
///
/// A simple paraboloid useful for sanity checking.
pub fn sphere(x: &DVector<f64>) -> f64 {
    x.iter().map(|xi| xi * xi).sum()
}

/// Two-dimensional [Rosenbrock
/// function](https://en.wikipedia.org/wiki/Rosenbrock_function); the global
/// minimum 0 is at (1, 1), inside a long, narrow, parabolic valley.
pub fn rosenbrock(x: &DVector<f64>) -> f64 {
    let (a, b) = (1.0, 100.0);
    (a - x[0]).powi(2) + b * (x[1] - x[0] * x[0]).powi(2)
}

/// Two-dimensional [Ackley
/// function](https://en.wikipedia.org/wiki/Ackley_function); the global
/// minimum 0 is at the origin, surrounded by a regular grid of local
/// minima.
pub fn ackley(x: &DVector<f64>) -> f64 {
    let (a, b) = (x[0], x[1]);
    -20.0 * (-0.2 * (0.5 * (a * a + b * b)).sqrt()).exp()
        - (0.5 * ((2.0 * PI * a).cos() + (2.0 * PI * b).cos())).exp()
        + E
        + 20.0
}

/// [Rastrigin function](https://en.wikipedia.org/wiki/Rastrigin_function)
/// in any dimension; the global minimum 0 is at the origin, with a large
/// number of regularly spaced local minima around it.
pub fn rastrigin(x: &DVector<f64>) -> f64 {
    let a = 10.0;
    a * x.nrows() as f64
        + x.iter()
            .map(|xi| xi * xi - a * (2.0 * PI * xi).cos())
            .sum::<f64>()
}

/// Two-dimensional [Beale
/// function](https://en.wikipedia.org/wiki/Test_functions_for_optimization);
/// the global minimum 0 is at (3, 0.5).
pub fn beale(x: &DVector<f64>) -> f64 {
    let (a, b) = (x[0], x[1]);
    (1.5 - a + a * b).powi(2)
        + (2.25 - a + a * b * b).powi(2)
        + (2.625 - a + a * b * b * b).powi(2)
}

/// Error of the testing loop helpers.
#[derive(Debug, Error)]
pub enum TestingError {
    /// Error surfaced by the driver or the method.
    #[error("{0}")]
    Driver(#[from] DriverError),
    /// The evaluation budget ran out before the method completed.
    #[error("evaluation budget exhausted before completion")]
    Budget,
}

/// Pumps a session against an objective until completion, returning the
/// number of evaluations spent.
pub fn drive<F>(
    session: &mut Session,
    mut objective: F,
    max_evals: usize,
) -> Result<usize, TestingError>
where
    F: FnMut(&DVector<f64>) -> f64,
{
    let mut x = DVector::zeros(session.dim());
    let mut evals = 0;

    while session.done()? == Status::Continue {
        if evals >= max_evals {
            return Err(TestingError::Budget);
        }
        session.next(&mut x)?;
        let fx = objective(&x);
        session.set_value(&x, fx)?;
        evals += 1;
    }

    Ok(evals)
}

/// As [`drive`], with a gradient supplied alongside every value.
pub fn drive_with_gradient<F, G>(
    session: &mut Session,
    mut objective: F,
    mut gradient: G,
    max_evals: usize,
) -> Result<usize, TestingError>
where
    F: FnMut(&DVector<f64>) -> f64,
    G: FnMut(&DVector<f64>) -> DVector<f64>,
{
    let mut x = DVector::zeros(session.dim());
    let mut evals = 0;

    while session.done()? == Status::Continue {
        if evals >= max_evals {
            return Err(TestingError::Budget);
        }
        session.next(&mut x)?;
        let fx = objective(&x);
        let gx = gradient(&x);
        session.set_value_with_gradient(&x, fx, &gx)?;
        evals += 1;
    }

    Ok(evals)
}

/// Pumps a bare method instance against an objective until completion,
/// returning the number of evaluations spent.
pub fn drive_method<F>(
    method: &mut dyn Method,
    dim: usize,
    mut objective: F,
    max_evals: usize,
) -> Result<usize, TestingError>
where
    F: FnMut(&DVector<f64>) -> f64,
{
    let mut x = DVector::zeros(dim);
    let mut evals = 0;

    while method.done()? == Status::Continue {
        if evals >= max_evals {
            return Err(TestingError::Budget);
        }
        method.next(&mut x)?;
        let fx = objective(&x);
        method.set_value(&x, fx)?;
        evals += 1;
    }

    Ok(evals)
}

/// As [`drive_method`], with a gradient supplied alongside every value.
pub fn drive_method_with_gradient<F, G>(
    method: &mut dyn Method,
    dim: usize,
    mut objective: F,
    mut gradient: G,
    max_evals: usize,
) -> Result<usize, TestingError>
where
    F: FnMut(&DVector<f64>) -> f64,
    G: FnMut(&DVector<f64>) -> DVector<f64>,
{
    let mut x = DVector::zeros(dim);
    let mut evals = 0;

    while method.done()? == Status::Continue {
        if evals >= max_evals {
            return Err(TestingError::Budget);
        }
        method.next(&mut x)?;
        let fx = objective(&x);
        let gx = gradient(&x);
        method.set_value_with_gradient(&x, fx, &gx)?;
        evals += 1;
    }

    Ok(evals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minima_evaluate_to_zero() {
        assert_eq!(sphere(&DVector::zeros(3)), 0.0);
        assert_eq!(rosenbrock(&DVector::from_vec(vec![1.0, 1.0])), 0.0);
        assert!(ackley(&DVector::zeros(2)).abs() < 1e-12);
        assert_eq!(rastrigin(&DVector::zeros(4)), 0.0);
        assert_eq!(beale(&DVector::from_vec(vec![3.0, 0.5])), 0.0);
    }

    #[test]
    fn benchmark_values_away_from_minima_are_positive() {
        let x = DVector::from_vec(vec![0.3, -0.7]);
        assert!(sphere(&x) > 0.0);
        assert!(rosenbrock(&x) > 0.0);
        assert!(ackley(&x) > 0.0);
        assert!(rastrigin(&x) > 0.0);
        assert!(beale(&x) > 0.0);
    }

    #[test]
    fn vector_arithmetic_matches_definitions() {
        let v = DVector::from_vec(vec![3.0, 4.0]);
        let w = DVector::from_vec(vec![1.0, 1.0]);

        assert_eq!((&v * 2.0).as_slice(), &[6.0, 8.0]);
        assert_eq!((&v + &w).as_slice(), &[4.0, 5.0]);
        assert_eq!((&v - &w).as_slice(), &[2.0, 3.0]);
        assert_eq!(v.norm(), 5.0);
        assert_eq!((&v - &w).norm(), 13f64.sqrt());
    }
}
