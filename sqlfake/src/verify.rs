//! Assertions over the invocation log.

use std::fmt::{self, Display};

use itertools::Itertools;
use owo_colors::OwoColorize;

use crate::invocation::{Invocation, Invocations};
use crate::parameter::Parameter;
use crate::sql::{same_name, Binding, Statement, StatementKind};
use crate::value::Value;

/// Why a statement in the log did not satisfy an [`Expectation`].
#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    /// No statement with the expected verb was executed.
    NotExecuted,
    /// The verb matched but the table did not.
    Table { found: String },
    /// The column is not assigned by the statement.
    MissingColumn { column: String },
    /// The where clause does not filter on the field.
    MissingWhereField { field: String },
    /// The column is assigned from something other than a parameter.
    Unbound { column: String },
    /// The statement references a parameter the command never supplied.
    MissingParameter { column: String, parameter: String },
    /// The parameter was supplied with another value.
    Value {
        column: String,
        expected: Value,
        actual: Option<Value>,
    },
}

impl Mismatch {
    /// How far the statement got before it diverged. Higher is closer.
    fn closeness(&self) -> u8 {
        match self {
            Mismatch::NotExecuted => 0,
            Mismatch::Table { .. } => 1,
            Mismatch::MissingColumn { .. } | Mismatch::MissingWhereField { .. } => 2,
            Mismatch::Unbound { .. } | Mismatch::MissingParameter { .. } => 3,
            Mismatch::Value { .. } => 4,
        }
    }

    fn fmt_colored(&self, f: &mut fmt::Formatter<'_>, colorize: bool) -> fmt::Result {
        match self {
            Mismatch::Value {
                column,
                expected,
                actual,
            } if colorize => {
                let actual = actual.as_ref().map_or("unset".to_string(), Value::to_string);
                write!(
                    f,
                    "column {column} was expected to be {}, but was {}",
                    expected.bright_green(),
                    actual.bright_red()
                )
            }
            Mismatch::Table { found } if colorize => {
                write!(f, "the statement targeted table {}", found.bright_red())
            }
            _ => write!(f, "{self}"),
        }
    }
}

impl Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::NotExecuted => write!(f, "no such statement was executed"),
            Mismatch::Table { found } => write!(f, "the statement targeted table {found}"),
            Mismatch::MissingColumn { column } => {
                write!(f, "column {column} is not assigned by the statement")
            }
            Mismatch::MissingWhereField { field } => {
                write!(f, "the where clause does not filter on {field}")
            }
            Mismatch::Unbound { column } => {
                write!(f, "column {column} is not bound to a parameter")
            }
            Mismatch::MissingParameter { column, parameter } => {
                write!(f, "parameter {parameter} for column {column} was not supplied")
            }
            Mismatch::Value {
                column,
                expected,
                actual: Some(actual),
            } => write!(f, "column {column} was expected to be {expected}, but was {actual}"),
            Mismatch::Value {
                column,
                expected,
                actual: None,
            } => write!(f, "column {column} was expected to be {expected}, but was unset"),
        }
    }
}

/// The kind of a [`VerificationFailure`].
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationFailureKind {
    /// The number of matching invocations is wrong.
    CountMismatch {
        expected: usize,
        exact: bool,
        actual: usize,
        /// Every invocation in the log, rendered.
        executed: Vec<String>,
    },
    /// No invocation matched a statement expectation.
    StatementMismatch {
        kind: StatementKind,
        table: String,
        /// The closest miss in the log.
        mismatch: Mismatch,
        /// Command text of the closest miss, if any statement came close.
        sql: Option<String>,
    },
}

impl VerificationFailureKind {
    pub fn display(&self, colorize: bool) -> VerificationFailureKindDisplay<'_> {
        VerificationFailureKindDisplay {
            kind: self,
            colorize,
        }
    }
}

impl Display for VerificationFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display(false))
    }
}

/// Overrides the `Display` implementation of [`VerificationFailureKind`] to
/// support controlling colorization.
pub struct VerificationFailureKindDisplay<'a> {
    kind: &'a VerificationFailureKind,
    colorize: bool,
}

impl Display for VerificationFailureKindDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            VerificationFailureKind::CountMismatch {
                expected,
                exact,
                actual,
                executed,
            } => {
                let bound = if *exact { "exactly" } else { "at least" };
                let noun = if *expected == 1 { "invocation" } else { "invocations" };
                if self.colorize {
                    write!(
                        f,
                        "expected {bound} {} matching {noun}, but found {}",
                        expected.bright_green(),
                        actual.bright_red()
                    )?;
                } else {
                    write!(f, "expected {bound} {expected} matching {noun}, but found {actual}")?;
                }
                if executed.is_empty() {
                    write!(f, "\n[Executed] nothing")
                } else {
                    write!(
                        f,
                        "\n[Executed]\n{}",
                        executed.iter().format_with("\n", |line, f| f(&format_args!("    {line}")))
                    )
                }
            }
            VerificationFailureKind::StatementMismatch {
                kind,
                table,
                mismatch,
                sql,
            } => {
                write!(f, "expected {kind} on table {table}: ")?;
                mismatch.fmt_colored(f, self.colorize)?;
                if let Some(sql) = sql {
                    write!(f, "\n[SQL] {sql}")?;
                }
                Ok(())
            }
        }
    }
}

/// A failed verification.
///
/// For colored error message, use `self.display()`.
#[derive(thiserror::Error, Clone, PartialEq)]
pub struct VerificationFailure {
    kind: VerificationFailureKind,
    message: Option<String>,
}

impl VerificationFailure {
    pub fn new(kind: VerificationFailureKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    /// Prefix the failure with a caller-supplied message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn kind(&self) -> &VerificationFailureKind {
        &self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn display(&self, colorize: bool) -> VerificationFailureDisplay<'_> {
        VerificationFailureDisplay {
            failure: self,
            colorize,
        }
    }
}

impl Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display(false))
    }
}

impl fmt::Debug for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// Overrides the `Display` implementation of [`VerificationFailure`] to
/// support controlling colorization.
pub struct VerificationFailureDisplay<'a> {
    failure: &'a VerificationFailure,
    colorize: bool,
}

impl Display for VerificationFailureDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = &self.failure.message {
            writeln!(f, "{message}")?;
        }
        write!(f, "{}", self.failure.kind.display(self.colorize))
    }
}

/// What a statement in the log is expected to look like.
///
/// ```
/// use sqlfake::{Expectation, StatementKind};
///
/// let expectation = Expectation::update("Products")
///     .value("Name", "Boo1")
///     .filter_value("Id", 111);
/// assert_eq!(expectation.kind(), StatementKind::Update);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    kind: StatementKind,
    table: String,
    values: Vec<(String, Value)>,
    filters: Vec<(String, Option<Value>)>,
}

impl Expectation {
    pub fn new(kind: StatementKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            values: vec![],
            filters: vec![],
        }
    }

    pub fn insert(table: impl Into<String>) -> Self {
        Self::new(StatementKind::Insert, table)
    }

    pub fn update(table: impl Into<String>) -> Self {
        Self::new(StatementKind::Update, table)
    }

    pub fn select(table: impl Into<String>) -> Self {
        Self::new(StatementKind::Select, table)
    }

    pub fn delete(table: impl Into<String>) -> Self {
        Self::new(StatementKind::Delete, table)
    }

    /// Expect `column` to be assigned from a parameter holding `value`.
    #[must_use]
    pub fn value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((column.into(), value.into()));
        self
    }

    /// Expect the where clause to filter on `field`.
    #[must_use]
    pub fn filter(mut self, field: impl Into<String>) -> Self {
        self.filters.push((field.into(), None));
        self
    }

    /// Expect the where clause to filter on `field` with a parameter holding `value`.
    #[must_use]
    pub fn filter_value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), Some(value.into())));
        self
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Check one invocation against the expectation.
    pub fn check(&self, invocation: &Invocation) -> Result<(), Mismatch> {
        let statement = Statement::parse(invocation.command_text())
            .filter(|statement| statement.kind() == self.kind)
            .ok_or(Mismatch::NotExecuted)?;
        if !statement.targets(&self.table) {
            return Err(Mismatch::Table {
                found: statement.table().to_string(),
            });
        }

        for (column, expected) in &self.values {
            let binding = statement
                .assignment(column)
                .ok_or_else(|| Mismatch::MissingColumn {
                    column: column.clone(),
                })?;
            check_binding(invocation, column, binding, expected)?;
        }

        for (field, expected) in &self.filters {
            let binding = statement
                .filter(field)
                .ok_or_else(|| Mismatch::MissingWhereField {
                    field: field.clone(),
                })?;
            // Select and bare where-field checks compare no values.
            if let Some(expected) = expected {
                if self.kind != StatementKind::Select {
                    check_binding(invocation, field, binding, expected)?;
                }
            }
        }
        Ok(())
    }
}

fn check_binding(
    invocation: &Invocation,
    column: &str,
    binding: &Binding,
    expected: &Value,
) -> Result<(), Mismatch> {
    let parameter = binding.parameter.as_deref().ok_or_else(|| Mismatch::Unbound {
        column: column.to_string(),
    })?;
    let actual = invocation
        .parameter(parameter)
        .ok_or_else(|| Mismatch::MissingParameter {
            column: column.to_string(),
            parameter: parameter.to_string(),
        })?
        .value();
    if actual.is_some_and(|actual| actual.loosely_eq(expected)) {
        Ok(())
    } else {
        Err(Mismatch::Value {
            column: column.to_string(),
            expected: expected.clone(),
            actual: actual.cloned(),
        })
    }
}

/// Assertions over anything with an invocation log.
///
/// Every method returns `Ok(())` on success. On failure the error names the
/// expected condition, what was found, and the command text involved, so
/// `verify(..).unwrap()` in a test prints an actionable message.
pub trait Verify: Invocations {
    /// Count the invocations accepted by `predicate`. With `exact` the count
    /// must equal `expected`, otherwise it must be at least `expected`.
    fn verify(
        &self,
        predicate: impl Fn(&Invocation) -> bool,
        expected: usize,
        exact: bool,
    ) -> Result<(), VerificationFailure> {
        let invocations = self.invocations();
        let actual = invocations.iter().filter(|i| predicate(i)).count();
        let satisfied = if exact {
            actual == expected
        } else {
            actual >= expected
        };
        if satisfied {
            return Ok(());
        }
        Err(VerificationFailure::new(
            VerificationFailureKind::CountMismatch {
                expected,
                exact,
                actual,
                executed: invocations.iter().map(Invocation::to_string).collect(),
            },
        ))
    }

    /// [`Verify::verify`] with a caller-supplied message on failure.
    fn verify_with_message(
        &self,
        predicate: impl Fn(&Invocation) -> bool,
        expected: usize,
        exact: bool,
        message: impl Into<String>,
    ) -> Result<(), VerificationFailure> {
        self.verify(predicate, expected, exact)
            .map_err(|failure| failure.with_message(message))
    }

    /// Require at least one invocation satisfying `expectation`. On failure
    /// the closest miss in the log is reported.
    fn should_have_executed(&self, expectation: &Expectation) -> Result<(), VerificationFailure> {
        let mut closest: Option<(Mismatch, String)> = None;
        for invocation in self.invocations() {
            match expectation.check(&invocation) {
                Ok(()) => return Ok(()),
                Err(Mismatch::NotExecuted) => {}
                Err(mismatch) => {
                    let closer = closest
                        .as_ref()
                        .map_or(true, |(best, _)| mismatch.closeness() >= best.closeness());
                    if closer {
                        closest = Some((mismatch, invocation.command_text().to_string()));
                    }
                }
            }
        }
        let (mismatch, sql) = match closest {
            Some((mismatch, sql)) => (mismatch, Some(sql)),
            None => (Mismatch::NotExecuted, None),
        };
        tracing::debug!(
            kind = %expectation.kind,
            table = %expectation.table,
            %mismatch,
            "statement expectation not met"
        );
        Err(VerificationFailure::new(
            VerificationFailureKind::StatementMismatch {
                kind: expectation.kind,
                table: expectation.table.clone(),
                mismatch,
                sql,
            },
        ))
    }

    /// Require an insert into `table` whose values clause binds each column
    /// to a parameter holding the expected value.
    fn should_have_inserted<I, K, V>(
        &self,
        table: &str,
        values: I,
    ) -> Result<(), VerificationFailure>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let expectation = values
            .into_iter()
            .fold(Expectation::insert(table), |e, (column, value)| e.value(column, value));
        self.should_have_executed(&expectation)
    }

    /// Require an update of `table` whose set clause binds each column to a
    /// parameter holding the expected value, filtered on `where_field`.
    ///
    /// `where_value` is compared against the where parameter when given.
    /// Otherwise an entry for `where_field` in `values` is used as the where
    /// value instead of a set assignment.
    fn should_have_updated<I, K, V>(
        &self,
        table: &str,
        values: I,
        where_field: &str,
        where_value: Option<Value>,
    ) -> Result<(), VerificationFailure>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let (keyed, assigned): (Vec<(String, Value)>, Vec<(String, Value)>) = values
            .into_iter()
            .map(|(column, value)| (column.into(), value.into()))
            .partition(|(column, _)| where_value.is_none() && same_name(column, where_field));

        let mut expectation = assigned
            .into_iter()
            .fold(Expectation::update(table), |e, (column, value)| e.value(column, value));
        expectation = match where_value.or_else(|| keyed.into_iter().next().map(|(_, v)| v)) {
            Some(value) => expectation.filter_value(where_field, value),
            None => expectation.filter(where_field),
        };
        self.should_have_executed(&expectation)
    }

    /// Require a select from `table` whose where clause mentions each field.
    fn should_have_selected<I, S>(
        &self,
        table: &str,
        where_fields: I,
    ) -> Result<(), VerificationFailure>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let expectation = where_fields
            .into_iter()
            .fold(Expectation::select(table), |e, field| e.filter(field));
        self.should_have_executed(&expectation)
    }

    /// Require a delete from `table` filtered on `where_field`, holding
    /// `where_value` when given.
    fn should_have_deleted(
        &self,
        table: &str,
        where_field: &str,
        where_value: Option<Value>,
    ) -> Result<(), VerificationFailure> {
        let expectation = Expectation::delete(table);
        let expectation = match where_value {
            Some(value) => expectation.filter_value(where_field, value),
            None => expectation.filter(where_field),
        };
        self.should_have_executed(&expectation)
    }
}

impl<T: Invocations + ?Sized> Verify for T {}

/// Predicate matching invocations whose command text contains `needle`,
/// ignoring ASCII case.
pub fn text_contains(needle: &str) -> impl Fn(&Invocation) -> bool + '_ {
    move |invocation| {
        invocation
            .command_text()
            .to_ascii_lowercase()
            .contains(&needle.to_ascii_lowercase())
    }
}

/// Predicate matching invocations that supplied `name` with a value
/// loosely equal to `value`.
pub fn has_parameter(name: &str, value: impl Into<Value>) -> impl Fn(&Invocation) -> bool + '_ {
    let value = value.into();
    move |invocation| {
        invocation
            .parameter(name)
            .and_then(Parameter::value)
            .is_some_and(|actual| actual.loosely_eq(&value))
    }
}
