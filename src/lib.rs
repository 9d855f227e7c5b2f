#![allow(clippy::many_single_char_names)]
#![warn(missing_docs)]

//! # Tandem
//!
//! A toolbox of numerical methods with the control flow turned inside out:
//! instead of handing the library a callback, *you* drive the iteration
//! loop. At each step you ask the bound method for the next input point,
//! evaluate your objective function however you like (with whatever context
//! it needs), and hand the observed value back. Any method can be swapped
//! for any other without touching the objective, because they all speak the
//! same ask/tell contract.
//!
//! ## Methods
//!
//! * Root finders: [bisection](methods::bisection),
//!   [secant](methods::secant),
//!   [newton-raphson](methods::newton_raphson),
//!   [brent-dekker](methods::brent_dekker).
//! * One-dimensional minimizer:
//!   [brents-localmin](methods::brents_localmin).
//! * Multi-dimensional minimizers:
//!   [nelder-mead](methods::nelder_mead),
//!   [differential evolution](methods::differential_evolution).
//! * Integrators: [trapezoidal](methods::trapezoidal),
//!   [simpson](methods::simpson).
//! * [Gradient estimation](methods::gradient_estimate).
//!
//! ## Usage
//!
//! Open a [`Session`] against a [`Catalog`], select a method by name for a
//! fixed input dimensionality, configure it through name-keyed typed
//! hyper-parameters, then pump the loop:
//!
//! ```rust
//! use tandem::nalgebra::DVector;
//! use tandem::{Catalog, Session, Status};
//!
//! # fn main() -> Result<(), tandem::Error> {
//! let mut session = Session::open(Catalog::builtin());
//! session.select("bisection", 1)?;
//! session.hparam_set("lower", 1.0)?;
//! session.hparam_set("upper", 2.0)?;
//!
//! let mut x = DVector::zeros(1);
//! while session.done()? == Status::Continue {
//!     session.next(&mut x)?;
//!     // The objective is evaluated by the caller, not by the library.
//!     let fx = x[0] * x[0] - 2.0;
//!     session.set_value(&x, fx)?;
//! }
//!
//! let root = session.result("root")?.as_float()?;
//! assert!((root - 2f64.sqrt()).abs() < 1e-5);
//! # Ok(())
//! # }
//! ```
//!
//! The session tracks the best input seen so far across all handed-back
//! values ([`Session::best`]), and methods expose named results (such as
//! `root`, `area`, `minimum x`) once [`Session::done`] reports
//! [`Status::Complete`].
//!
//! Methods that need derivatives (newton-raphson) receive them through
//! [`Session::set_value_with_gradient`]; methods that need randomness
//! (differential evolution) take an injected [`fastrand::Rng`] so runs can
//! be made reproducible.
//!
//! ## Custom methods
//!
//! Implement the [`Method`] trait and register a constructor with
//! [`Catalog::register`]; sessions then select it by name exactly like a
//! bundled method. See the [`Method`] documentation for a minimal
//! implementation.
//!
//! ## Diagnostics
//!
//! All diagnostics go through the [`log`] facade, gated by a per-session
//! [`Verbosity`] with a process-wide default
//! ([`diagnostics::set_default_verbosity`]).
//!
//! ## License
//!
//! Licensed under MIT.

mod core;

pub mod catalog;
pub mod diagnostics;
pub mod driver;
pub mod methods;

pub use catalog::Catalog;
pub use core::*;
pub use diagnostics::Verbosity;
pub use driver::Session;

#[cfg(feature = "testing")]
pub mod testing;

#[cfg(not(feature = "testing"))]
pub(crate) mod testing;

pub use nalgebra;
