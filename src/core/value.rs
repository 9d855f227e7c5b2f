use nalgebra::DVector;

use super::Error;

/// Typed payload of the name-keyed configuration and result registries.
///
/// Each recognized hyper-parameter and result name has a documented type;
/// supplying a value of a different type fails with
/// [`Error::InvalidArgument`]. The accessors are strict on purpose so that a
/// typo like passing `1` where `1.0` is expected surfaces immediately instead
/// of being silently coerced.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An integer, used for counts and budgets (e.g. population size,
    /// subinterval count, iteration budget).
    Int(i64),
    /// A double-precision scalar.
    Float(f64),
    /// A dense vector of double-precision scalars.
    Vector(DVector<f64>),
}

impl Value {
    /// Returns the integer payload, or a wrong-type error.
    pub fn as_int(&self) -> Result<i64, Error> {
        match self {
            Value::Int(value) => Ok(*value),
            other => Err(other.type_mismatch("an integer")),
        }
    }

    /// Returns the scalar payload, or a wrong-type error.
    pub fn as_float(&self) -> Result<f64, Error> {
        match self {
            Value::Float(value) => Ok(*value),
            other => Err(other.type_mismatch("a float")),
        }
    }

    /// Returns a reference to the vector payload, or a wrong-type error.
    pub fn as_vector(&self) -> Result<&DVector<f64>, Error> {
        match self {
            Value::Vector(value) => Ok(value),
            other => Err(other.type_mismatch("a vector")),
        }
    }

    /// Consumes the value and returns the vector payload, or a wrong-type
    /// error.
    pub fn into_vector(self) -> Result<DVector<f64>, Error> {
        match self {
            Value::Vector(value) => Ok(value),
            other => Err(other.type_mismatch("a vector")),
        }
    }

    /// Name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Vector(_) => "vector",
        }
    }

    fn type_mismatch(&self, expected: &str) -> Error {
        Error::InvalidArgument(format!(
            "expected {expected}, got a {} value",
            self.type_name()
        ))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<DVector<f64>> for Value {
    fn from(value: DVector<f64>) -> Self {
        Value::Vector(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Value::Vector(DVector::from_vec(value))
    }
}

impl From<&[f64]> for Value {
    fn from(value: &[f64]) -> Self {
        Value::Vector(DVector::from_column_slice(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        assert_eq!(Value::from(3).as_int().unwrap(), 3);
        assert_eq!(Value::from(0.5).as_float().unwrap(), 0.5);
        assert_eq!(
            Value::from(vec![1.0, 2.0]).as_vector().unwrap().as_slice(),
            &[1.0, 2.0]
        );
    }

    #[test]
    fn wrong_type_is_rejected() {
        assert!(matches!(
            Value::from(1).as_float(),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            Value::from(1.0).as_int(),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            Value::from(1.0).as_vector(),
            Err(Error::InvalidArgument(_))
        ));
    }
}
