//! Named types and unit conversion factors known to one compilation.
//!
//! The registry is filled before analysis starts and only read afterwards:
//! the analyzer resolves named annotations through it and the code generator
//! declares one `convert_<from>_to_<to>` entry point per registered pair.

use std::collections::{BTreeMap, HashMap};

use crate::ast::types::Type;

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Type>,
    // Ordered so runtime declarations come out in a stable order.
    unit_conversions: BTreeMap<String, BTreeMap<String, f64>>,
}

impl TypeRegistry {
    /// An empty registry: no named types and no conversions.
    pub fn new() -> Self {
        TypeRegistry {
            types: HashMap::new(),
            unit_conversions: BTreeMap::new(),
        }
    }

    /// The stock units: kilometres, metres, minutes, seconds and hours, each
    /// convertible to the dimensionless base (the empty unit).
    pub fn with_default_units() -> Self {
        let mut registry = TypeRegistry::new();

        registry.register_unit_conversion("km", "m", 1000.0);
        registry.register_unit_conversion("m", "km", 0.001);
        registry.register_unit_conversion("min", "s", 60.0);
        registry.register_unit_conversion("s", "min", 1.0 / 60.0);

        registry.register_unit_conversion("km", "", 1000.0);
        registry.register_unit_conversion("m", "", 1.0);
        registry.register_unit_conversion("min", "", 60.0);
        registry.register_unit_conversion("s", "", 1.0);
        registry.register_unit_conversion("h", "", 3600.0);

        registry
    }

    pub fn register_type(&mut self, name: &str, ty: Type) {
        self.types.insert(name.to_string(), ty);
    }

    pub fn get_type(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub fn register_unit_conversion(&mut self, from: &str, to: &str, factor: f64) {
        self.unit_conversions
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string(), factor);
    }

    /// The multiplicative factor from `from` to `to`, 1.0 when unknown.
    pub fn get_conversion_factor(&self, from: &str, to: &str) -> f64 {
        self.unit_conversions
            .get(from)
            .and_then(|targets| targets.get(to))
            .copied()
            .unwrap_or(1.0)
    }

    pub fn has_conversion(&self, from: &str, to: &str) -> bool {
        self.unit_conversions
            .get(from)
            .is_some_and(|targets| targets.contains_key(to))
    }

    /// Every registered `(from, to, factor)` triple.
    pub fn conversions(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.unit_conversions.iter().flat_map(|(from, targets)| {
            targets
                .iter()
                .map(move |(to, factor)| (from.as_str(), to.as_str(), *factor))
        })
    }

    /// Replaces registered named tags with the types they stand for,
    /// recursing into function signatures.
    pub fn resolve(&self, ty: &Type) -> Type {
        match ty {
            Type::Unit(name) => match self.types.get(name) {
                Some(named) => named.clone(),
                None => ty.clone(),
            },
            Type::Function {
                params,
                return_type,
            } => Type::function(
                params.iter().map(|param| self.resolve(param)).collect(),
                self.resolve(return_type),
            ),
            _ => ty.clone(),
        }
    }
}
