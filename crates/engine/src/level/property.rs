use std::fmt;
use std::rc::Rc;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyError {
    #[error("property '{property}' is not recognised by this tile")]
    InvalidProperty { property: String },
    #[error("value {value} is not valid for property '{property}': {reason}")]
    InvalidValue {
        property: String,
        value: PropertyValue,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl PropertyValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "\"{value}\""),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyConstraint {
    Any,
    IntRange { min: i64, max: i64 },
    OneOf(Vec<PropertyValue>),
}

/// Named, typed slot a tile declares for its per-cell state.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    name: String,
    default: PropertyValue,
    constraint: PropertyConstraint,
}

impl Property {
    pub fn new(name: impl Into<String>, default: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
            constraint: PropertyConstraint::Any,
        }
    }

    pub fn with_constraint(mut self, constraint: PropertyConstraint) -> Self {
        self.constraint = constraint;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> &PropertyValue {
        &self.default
    }

    pub fn constraint(&self) -> &PropertyConstraint {
        &self.constraint
    }

    pub fn validate(&self, value: &PropertyValue) -> Result<(), PropertyError> {
        if value.kind() != self.default.kind() {
            return Err(self.invalid(value, "type does not match the property default"));
        }
        match &self.constraint {
            PropertyConstraint::Any => Ok(()),
            PropertyConstraint::IntRange { min, max } => match value {
                PropertyValue::Int(v) if (*min..=*max).contains(v) => Ok(()),
                _ => Err(self.invalid(value, "outside the allowed range")),
            },
            PropertyConstraint::OneOf(allowed) => {
                if allowed.contains(value) {
                    Ok(())
                } else {
                    Err(self.invalid(value, "not one of the allowed values"))
                }
            }
        }
    }

    fn invalid(&self, value: &PropertyValue, reason: &'static str) -> PropertyError {
        PropertyError::InvalidValue {
            property: self.name.clone(),
            value: value.clone(),
            reason,
        }
    }
}

/// Per-cell property values. The recognised properties are fixed when the
/// owning tile creates the container.
#[derive(Debug, Clone, PartialEq)]
pub struct TileStateContainer {
    properties: Rc<[Property]>,
    values: Vec<PropertyValue>,
}

impl TileStateContainer {
    pub fn new(properties: impl Into<Rc<[Property]>>) -> Self {
        let properties = properties.into();
        let values = properties
            .iter()
            .map(|property| property.default.clone())
            .collect();
        Self { properties, values }
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn contains(&self, property: &str) -> bool {
        self.index_of(property).is_some()
    }

    pub fn get(&self, property: &str) -> Option<&PropertyValue> {
        self.index_of(property).map(|index| &self.values[index])
    }

    pub fn get_bool(&self, property: &str) -> Option<bool> {
        match self.get(property) {
            Some(PropertyValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_int(&self, property: &str) -> Option<i64> {
        match self.get(property) {
            Some(PropertyValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn set_value(
        &mut self,
        property: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<(), PropertyError> {
        let index = self
            .index_of(property)
            .ok_or_else(|| PropertyError::InvalidProperty {
                property: property.to_string(),
            })?;
        let value = value.into();
        self.properties[index].validate(&value)?;
        self.values[index] = value;
        Ok(())
    }

    fn index_of(&self, property: &str) -> Option<usize> {
        self.properties
            .iter()
            .position(|candidate| candidate.name == property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lamp_properties() -> Rc<[Property]> {
        Rc::from(vec![
            Property::new("lit", false),
            Property::new("level", 1i64)
                .with_constraint(PropertyConstraint::IntRange { min: 0, max: 3 }),
            Property::new("colour", "red").with_constraint(PropertyConstraint::OneOf(vec![
                PropertyValue::from("red"),
                PropertyValue::from("green"),
            ])),
        ])
    }

    #[test]
    fn new_container_starts_from_defaults() {
        let container = TileStateContainer::new(lamp_properties());
        assert_eq!(container.get_bool("lit"), Some(false));
        assert_eq!(container.get_int("level"), Some(1));
        assert_eq!(container.get("colour"), Some(&PropertyValue::from("red")));
        assert_eq!(container.properties().len(), 3);
    }

    #[test]
    fn unknown_property_is_rejected() {
        let mut container = TileStateContainer::new(lamp_properties());
        let err = container.set_value("speed", 4i64).expect_err("unknown");
        assert_eq!(
            err,
            PropertyError::InvalidProperty {
                property: "speed".to_string()
            }
        );
        assert!(!container.contains("speed"));
    }

    #[test]
    fn values_are_checked_against_type_and_constraint() {
        let mut container = TileStateContainer::new(lamp_properties());
        assert!(matches!(
            container.set_value("lit", 1i64),
            Err(PropertyError::InvalidValue { .. })
        ));
        assert!(matches!(
            container.set_value("level", 4i64),
            Err(PropertyError::InvalidValue { .. })
        ));
        assert!(matches!(
            container.set_value("colour", "blue"),
            Err(PropertyError::InvalidValue { .. })
        ));

        container.set_value("lit", true).expect("lit");
        container.set_value("level", 3i64).expect("level");
        container.set_value("colour", "green").expect("colour");
        assert_eq!(container.get_bool("lit"), Some(true));
        assert_eq!(container.get_int("level"), Some(3));
    }

    #[test]
    fn containers_sharing_properties_hold_separate_values() {
        let properties = lamp_properties();
        let mut first = TileStateContainer::new(Rc::clone(&properties));
        let second = TileStateContainer::new(properties);
        first.set_value("lit", true).expect("lit");
        assert_eq!(first.get_bool("lit"), Some(true));
        assert_eq!(second.get_bool("lit"), Some(false));
    }
}
