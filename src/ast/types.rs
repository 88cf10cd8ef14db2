//! The type model.
//!
//! A closed set of variants compared structurally through
//! [`Type::is_assignable_from`]. Values are never mutated once built; the
//! analyzer and the generator pass them around by clone.

use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// A scalar. An empty unit means dimensionless.
    Number { unit: String },
    String,
    Boolean,
    Function {
        params: Vec<Type>,
        return_type: Box<Type>,
    },
    /// A nominal tag, equal only to a tag of the same name.
    Unit(String),
}

impl Type {
    pub fn number() -> Self {
        Type::Number {
            unit: String::new(),
        }
    }

    pub fn number_with_unit(unit: &str) -> Self {
        Type::Number {
            unit: unit.to_string(),
        }
    }

    pub fn function(params: Vec<Type>, return_type: Type) -> Self {
        Type::Function {
            params,
            return_type: Box::new(return_type),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Type::Number { .. })
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Type::Boolean)
    }

    /// The unit carried by a number, `None` for every other variant.
    pub fn unit(&self) -> Option<&str> {
        match self {
            Type::Number { unit } => Some(unit),
            _ => None,
        }
    }

    /// Whether a value of type `other` may be stored where `self` is expected.
    ///
    /// Dimensionless numbers flow both ways; two dimensioned numbers need the
    /// exact same unit. Functions are covariant in their return type and
    /// contravariant in their parameters.
    pub fn is_assignable_from(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Number { unit }, Type::Number { unit: other_unit }) => {
                unit.is_empty() || other_unit.is_empty() || unit == other_unit
            }
            (Type::String, Type::String) => true,
            (Type::Boolean, Type::Boolean) => true,
            (
                Type::Function {
                    params,
                    return_type,
                },
                Type::Function {
                    params: other_params,
                    return_type: other_return,
                },
            ) => {
                params.len() == other_params.len()
                    && return_type.is_assignable_from(other_return)
                    && params
                        .iter()
                        .zip(other_params.iter())
                        .all(|(param, other_param)| other_param.is_assignable_from(param))
            }
            (Type::Unit(name), Type::Unit(other_name)) => name == other_name,
            _ => false,
        }
    }

    /// Assignable in at least one direction.
    pub fn is_comparable_with(&self, other: &Type) -> bool {
        self.is_assignable_from(other) || other.is_assignable_from(self)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Number { unit } if unit.is_empty() => write!(f, "number"),
            Type::Number { unit } => write!(f, "number<{}>", unit),
            Type::String => write!(f, "string"),
            Type::Boolean => write!(f, "boolean"),
            Type::Function {
                params,
                return_type,
            } => {
                let params = params
                    .iter()
                    .map(|param| param.to_string())
                    .collect::<Vec<String>>()
                    .join(", ");
                write!(f, "fn({}) -> {}", params, return_type)
            }
            Type::Unit(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Type;

    #[test]
    fn test_number_units() {
        let km = Type::number_with_unit("km");
        let s = Type::number_with_unit("s");
        let plain = Type::number();

        assert!(km.is_assignable_from(&km));
        assert!(!km.is_assignable_from(&s));
        assert!(km.is_assignable_from(&plain));
        assert!(plain.is_assignable_from(&km));
        assert!(!km.is_assignable_from(&Type::String));
    }

    #[test]
    fn test_scalars_only_accept_their_own_kind() {
        assert!(Type::String.is_assignable_from(&Type::String));
        assert!(!Type::String.is_assignable_from(&Type::Boolean));
        assert!(Type::Boolean.is_assignable_from(&Type::Boolean));
        assert!(!Type::Boolean.is_assignable_from(&Type::number()));
    }

    #[test]
    fn test_unit_tags_are_nominal() {
        let celsius = Type::Unit("Celsius".to_string());

        assert!(celsius.is_assignable_from(&Type::Unit("Celsius".to_string())));
        assert!(!celsius.is_assignable_from(&Type::Unit("Kelvin".to_string())));
        assert!(!celsius.is_assignable_from(&Type::number()));
    }

    #[test]
    fn test_function_variance() {
        let takes_plain = Type::function(vec![Type::number()], Type::number_with_unit("m"));
        let takes_km = Type::function(vec![Type::number_with_unit("km")], Type::number());

        // Return: number<m> flows into number. Params: number<km> accepts number.
        assert!(takes_km.is_assignable_from(&takes_plain));

        let takes_s = Type::function(vec![Type::number_with_unit("s")], Type::number());
        assert!(!takes_km.is_assignable_from(&takes_s));

        let returns_string = Type::function(vec![Type::number()], Type::String);
        assert!(!takes_km.is_assignable_from(&returns_string));

        let two_params = Type::function(vec![Type::number(), Type::number()], Type::number());
        assert!(!takes_km.is_assignable_from(&two_params));
    }

    #[test]
    fn test_comparable_either_direction() {
        assert!(Type::number_with_unit("km").is_comparable_with(&Type::number()));
        assert!(!Type::number().is_comparable_with(&Type::String));
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::number().to_string(), "number");
        assert_eq!(Type::number_with_unit("km").to_string(), "number<km>");
        assert_eq!(
            Type::function(vec![Type::number(), Type::number()], Type::number()).to_string(),
            "fn(number, number) -> number"
        );
        assert_eq!(Type::function(vec![], Type::Boolean).to_string(), "fn() -> boolean");
        assert_eq!(Type::Unit("Celsius".to_string()).to_string(), "Celsius");
    }
}
