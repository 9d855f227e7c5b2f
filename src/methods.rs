//! The methods bundled with the toolbox.

pub mod bisection;
pub mod brent_dekker;
pub mod brents_localmin;
pub mod differential_evolution;
pub mod gradient_estimate;
pub mod nelder_mead;
pub mod newton_raphson;
pub mod secant;
pub mod simpson;
pub mod trapezoidal;

pub use bisection::Bisection;
pub use brent_dekker::BrentDekker;
pub use brents_localmin::BrentsLocalmin;
pub use differential_evolution::DifferentialEvolution;
pub use gradient_estimate::GradientEstimate;
pub use nelder_mead::NelderMead;
pub use newton_raphson::NewtonRaphson;
pub use secant::Secant;
pub use simpson::Simpson;
pub use trapezoidal::Trapezoidal;
