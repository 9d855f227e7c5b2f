//! Ordered registry of available methods.
//!
//! A [`Catalog`] maps method names to constructors. [`Catalog::builtin`]
//! registers the ten bundled methods; additional providers can be appended
//! with [`Catalog::register`], which makes the catalog the plug-in surface
//! for externally supplied methods. Entries are scanned in registration
//! order and the *first* entry that matches the requested name and
//! constructs successfully wins, so names do not have to be unique: a later
//! entry with the same name acts as a fallback.

use getset::Getters;
use log::{debug, warn};

use crate::core::{Error, Method};
use crate::diagnostics::{default_verbosity, Verbosity};
use crate::methods::{
    Bisection, BrentDekker, BrentsLocalmin, DifferentialEvolution, GradientEstimate, NelderMead,
    NewtonRaphson, Secant, Simpson, Trapezoidal,
};

/// Maximum length, in bytes, of a method name in the catalog.
pub const MAX_NAME_LEN: usize = 63;

type Constructor = Box<dyn Fn(usize) -> Result<Box<dyn Method>, Error> + Send>;

/// A single catalog entry: a method name, where it came from, and how to
/// build an instance of it.
#[derive(Getters)]
pub struct CatalogEntry {
    /// Method name matched during selection.
    #[getset(get = "pub")]
    name: String,
    /// Free-form locator describing where the entry was registered from.
    #[getset(get = "pub")]
    origin: String,
    make: Constructor,
}

/// Ordered collection of method providers.
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Creates a catalog holding the methods bundled with the crate.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        catalog
            .register("bisection", "builtin", |dim| {
                Ok(Box::new(Bisection::new(dim)?))
            })
            .register("secant", "builtin", |dim| Ok(Box::new(Secant::new(dim)?)))
            .register("newton-raphson", "builtin", |dim| {
                Ok(Box::new(NewtonRaphson::new(dim)?))
            })
            .register("brent-dekker", "builtin", |dim| {
                Ok(Box::new(BrentDekker::new(dim)?))
            })
            .register("brents-localmin", "builtin", |dim| {
                Ok(Box::new(BrentsLocalmin::new(dim)?))
            })
            .register("nelder-mead", "builtin", |dim| {
                Ok(Box::new(NelderMead::new(dim)?))
            })
            .register("differential evolution", "builtin", |dim| {
                Ok(Box::new(DifferentialEvolution::new(dim)?))
            })
            .register("trapezoidal", "builtin", |dim| {
                Ok(Box::new(Trapezoidal::new(dim)?))
            })
            .register("simpson", "builtin", |dim| Ok(Box::new(Simpson::new(dim)?)))
            .register("gradient estimate", "builtin", |dim| {
                Ok(Box::new(GradientEstimate::new(dim)?))
            });
        catalog
    }

    /// Appends an entry to the catalog.
    ///
    /// The constructor receives the input dimensionality and may reject it.
    /// Entries with an empty name or a name longer than [`MAX_NAME_LEN`]
    /// bytes are skipped with a warning instead of being added.
    pub fn register<F>(&mut self, name: &str, origin: &str, make: F) -> &mut Self
    where
        F: Fn(usize) -> Result<Box<dyn Method>, Error> + Send + 'static,
    {
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            if default_verbosity().allows(Verbosity::Warn) {
                warn!(
                    "skipping catalog entry from `{origin}` with invalid name length {}",
                    name.len()
                );
            }
            return self;
        }

        if default_verbosity().allows(Verbosity::Debug) {
            debug!("registered method `{name}` from `{origin}`");
        }

        self.entries.push(CatalogEntry {
            name: name.to_owned(),
            origin: origin.to_owned(),
            make: Box::new(make),
        });
        self
    }

    /// Returns the entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Instantiates the first entry named `name` that constructs
    /// successfully for `dim` dimensions.
    ///
    /// A matching entry whose constructor fails is skipped with a warning
    /// and the scan continues with later entries of the same name. When all
    /// candidates fail, the last construction error is returned; when none
    /// matched at all, [`Error::UnknownMethod`].
    pub(crate) fn instantiate(
        &self,
        name: &str,
        dim: usize,
        verbosity: Verbosity,
    ) -> Result<Box<dyn Method>, Error> {
        let mut last_err = None;

        for entry in &self.entries {
            if entry.name != name {
                continue;
            }

            match (entry.make)(dim) {
                Ok(method) => {
                    if verbosity.allows(Verbosity::Debug) {
                        debug!("instantiated `{name}` from `{}`", entry.origin);
                    }
                    return Ok(method);
                }
                Err(err) => {
                    if verbosity.allows(Verbosity::Warn) {
                        warn!(
                            "candidate for `{name}` from `{}` failed to initialize: {err}",
                            entry.origin
                        );
                    }
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::UnknownMethod(name.to_owned())))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_all_methods() {
        let catalog = Catalog::builtin();
        let names: Vec<_> = catalog.entries().map(|e| e.name().as_str()).collect();

        for name in [
            "bisection",
            "secant",
            "newton-raphson",
            "brent-dekker",
            "brents-localmin",
            "nelder-mead",
            "differential evolution",
            "trapezoidal",
            "simpson",
            "gradient estimate",
        ] {
            assert!(names.contains(&name), "missing `{name}`");
        }
    }

    #[test]
    fn invalid_names_are_skipped() {
        let mut catalog = Catalog::empty();
        let long_name = "x".repeat(MAX_NAME_LEN + 1);

        catalog
            .register("", "test", |dim| Ok(Box::new(Bisection::new(dim)?)))
            .register(&long_name, "test", |dim| Ok(Box::new(Bisection::new(dim)?)));

        assert!(catalog.is_empty());
    }

    #[test]
    fn first_match_wins_with_fallback() {
        let mut catalog = Catalog::empty();
        catalog
            .register("dup", "first", |_| {
                Err(Error::Unsupported("always fails".into()))
            })
            .register("dup", "second", |dim| Ok(Box::new(Secant::new(dim)?)));

        let method = catalog
            .instantiate("dup", 1, Verbosity::None)
            .expect("fallback entry should win");
        assert_eq!(method.name(), "secant");
    }

    #[test]
    fn unknown_name_is_reported() {
        let catalog = Catalog::builtin();
        assert!(matches!(
            catalog.instantiate("no-such-method", 1, Verbosity::None),
            Err(Error::UnknownMethod(_))
        ));
    }

    #[test]
    fn failing_candidates_surface_last_error() {
        let mut catalog = Catalog::empty();
        catalog.register("bad", "test", |_| {
            Err(Error::Unsupported("cannot build".into()))
        });

        assert!(matches!(
            catalog.instantiate("bad", 1, Verbosity::None),
            Err(Error::Unsupported(_))
        ));
    }
}
