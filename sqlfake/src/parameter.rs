//! Command parameters and the ordered, name-keyed collection that holds them.

use crate::error::{Error, Result};
use crate::value::{DbType, Value};

/// Direction of a parameter relative to the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

/// A named command parameter.
///
/// A parameter whose value was never assigned is distinct from one assigned
/// NULL: [`Parameter::value`] returns `None` for the former and
/// `Some(Value::Null)` for the latter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    value: Option<Value>,
    direction: ParameterDirection,
    db_type: Option<DbType>,
}

impl Parameter {
    /// Create an input parameter with a value.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            direction: ParameterDirection::Input,
            db_type: None,
        }
    }

    /// Create a parameter that has not been assigned a value yet.
    pub fn unset(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            direction: ParameterDirection::Input,
            db_type: None,
        }
    }

    #[must_use]
    pub fn with_direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn with_db_type(mut self, db_type: DbType) -> Self {
        self.db_type = Some(db_type);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.value = Some(value.into());
    }

    pub fn direction(&self) -> ParameterDirection {
        self.direction
    }

    /// The explicit type if one was given, otherwise the type of the value.
    pub fn db_type(&self) -> DbType {
        self.db_type
            .or_else(|| self.value.as_ref().and_then(Value::db_type))
            .unwrap_or(DbType::Object)
    }

    /// Whether this parameter answers to `name`, ignoring case and any
    /// placeholder prefix (`@`, `:`, `$`, `?`).
    pub fn is_named(&self, name: &str) -> bool {
        names_match(&self.name, name)
    }
}

/// Strips the placeholder prefix a provider puts in front of parameter names.
pub(crate) fn bare_name(name: &str) -> &str {
    name.trim_start_matches(['@', ':', '$', '?'])
}

pub(crate) fn names_match(left: &str, right: &str) -> bool {
    bare_name(left).eq_ignore_ascii_case(bare_name(right))
}

/// Ordered parameters of a command, unique by name (case-insensitive).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterCollection {
    params: Vec<Parameter>,
}

impl ParameterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter. Fails if one with the same name already exists.
    pub fn add(&mut self, param: Parameter) -> Result<()> {
        if self.contains(param.name()) {
            return Err(Error::DuplicateParameter {
                name: param.name().to_string(),
            });
        }
        self.params.push(param);
        Ok(())
    }

    /// Append an input parameter with a value.
    pub fn add_with_value(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<()> {
        self.add(Parameter::new(name, value))
    }

    /// Assign `value` to the parameter called `name`, appending it if absent.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        match self.get_mut(&name) {
            Some(param) => param.set_value(value),
            None => self.params.push(Parameter::new(name, value)),
        }
    }

    /// Get a parameter by name (case-insensitive, prefix-insensitive).
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.is_named(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params.iter_mut().find(|p| p.is_named(name))
    }

    /// Get a parameter by position.
    pub fn get_at(&self, index: usize) -> Option<&Parameter> {
        self.params.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.is_named(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Parameter> {
        self.index_of(name).map(|idx| self.params.remove(idx))
    }

    pub fn clear(&mut self) {
        self.params.clear();
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn as_slice(&self) -> &[Parameter] {
        &self.params
    }
}

impl FromIterator<Parameter> for ParameterCollection {
    /// Later parameters replace earlier ones with the same name.
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        let mut collection = Self::new();
        for param in iter {
            match collection.index_of(param.name()) {
                Some(idx) => collection.params[idx] = param,
                None => collection.params.push(param),
            }
        }
        collection
    }
}

impl IntoIterator for ParameterCollection {
    type Item = Parameter;
    type IntoIter = std::vec::IntoIter<Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParameterCollection {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}
