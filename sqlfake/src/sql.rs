//! A shallow reading of DML statements: enough structure to tell which
//! table a command touched and which parameters it bound to which columns.
//!
//! This is pattern matching over the command text, not a SQL parser.
//! Anything the patterns do not recognize is simply absent from the result.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::predicate::PredicateMap;

/// The leading verb of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Insert,
    Update,
    Select,
    Delete,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Insert => write!(f, "Insert"),
            StatementKind::Update => write!(f, "Update"),
            StatementKind::Select => write!(f, "Select"),
            StatementKind::Delete => write!(f, "Delete"),
        }
    }
}

/// A column paired with the parameter its value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub column: String,
    /// The first parameter referenced on the value side, prefix included.
    /// `None` for literals and expressions without parameters.
    pub parameter: Option<String>,
}

/// The parts of a statement the verifier looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    kind: StatementKind,
    table: String,
    assignments: Vec<Binding>,
    filters: Vec<Binding>,
}

struct Patterns {
    verb: Regex,
    insert: Regex,
    update: Regex,
    delete: Regex,
    select: Regex,
    values: Regex,
    set: Regex,
    where_: Regex,
    clause_end: Regex,
    connective: Regex,
    between: Regex,
    condition: Regex,
    parameter: Regex,
}

const IDENT: &str = r#"[\w\.\[\]"`]+"#;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern must compile")
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        verb: compile(r"^\s*(\w+)"),
        insert: compile(&format!(
            r"(?is)^\s*insert\s+(?:into\s+)?({IDENT})\s*(?:\(([^)]*)\))?"
        )),
        update: compile(&format!(r"(?is)^\s*update\s+({IDENT})")),
        delete: compile(&format!(r"(?is)^\s*delete\s+(?:from\s+)?({IDENT})")),
        select: compile(&format!(r"(?is)\bfrom\s+({IDENT})")),
        values: compile(r"(?is)\bvalues\s*\("),
        set: compile(r"(?is)\bset\b"),
        where_: compile(r"(?is)\bwhere\b"),
        clause_end: compile(
            r"(?is)(?:;|\border\s+by\b|\bgroup\s+by\b|\bhaving\b|\boption\b|\blimit\b|\boffset\b|\bunion\b|\breturning\b)",
        ),
        connective: compile(r"(?is)\b(and|or)\b"),
        between: compile(r"(?is)\bbetween\b"),
        condition: compile(&format!(
            r"(?is)^[\s(]*({IDENT})\s*(?:=|<>|!=|<=|>=|<|>|\bis\b|(?:\bnot\s+)?\b(?:like|in|between)\b)(.*)$"
        )),
        parameter: compile(r"[@:$]\w+"),
    })
}

fn verbs() -> &'static PredicateMap<str, StatementKind> {
    static VERBS: OnceLock<PredicateMap<str, StatementKind>> = OnceLock::new();
    VERBS.get_or_init(|| {
        PredicateMap::new()
            .with(|verb: &str| verb.eq_ignore_ascii_case("insert"), StatementKind::Insert)
            .with(|verb: &str| verb.eq_ignore_ascii_case("update"), StatementKind::Update)
            .with(|verb: &str| verb.eq_ignore_ascii_case("select"), StatementKind::Select)
            .with(|verb: &str| verb.eq_ignore_ascii_case("delete"), StatementKind::Delete)
    })
}

/// The last dotted segment of an identifier, without brackets or quotes.
pub fn unqualified(identifier: &str) -> &str {
    let last = identifier.rsplit('.').next().unwrap_or(identifier);
    last.trim_matches(|c| matches!(c, '[' | ']' | '"' | '`'))
}

/// Case-insensitive comparison of unqualified names.
pub fn same_name(left: &str, right: &str) -> bool {
    unqualified(left).eq_ignore_ascii_case(unqualified(right))
}

/// Whether byte offset `at` falls inside a single-quoted literal.
fn in_literal(text: &str, at: usize) -> bool {
    text[..at].matches('\'').count() % 2 == 1
}

fn first_parameter(expr: &str) -> Option<String> {
    patterns()
        .parameter
        .find_iter(expr)
        .find(|m| !in_literal(expr, m.start()))
        .map(|m| m.as_str().to_string())
}

/// Split `text` on commas that are not nested inside parentheses or quotes.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = vec![];
    let mut depth = 0usize;
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth = depth.saturating_sub(1),
            ',' if !quoted && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let rest = text[start..].trim();
    if !rest.is_empty() || !parts.is_empty() {
        parts.push(rest);
    }
    parts
}

/// The text between an already-consumed `(` and its matching `)`.
fn enclosed(text: &str) -> &str {
    let mut depth = 1usize;
    let mut quoted = false;
    for (i, c) in text.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => {
                depth -= 1;
                if depth == 0 {
                    return &text[..i];
                }
            }
            _ => {}
        }
    }
    text
}

/// The where clause of `sql`, up to the next clause that ends it.
fn where_clause(sql: &str) -> Option<&str> {
    let p = patterns();
    let start = p.where_.find(sql)?.end();
    let clause = &sql[start..];
    let end = p.clause_end.find(clause).map_or(clause.len(), |m| m.start());
    Some(&clause[..end])
}

/// Split a where clause on `and`/`or`. Connectives inside literals and the
/// `and` of a `between` stay within their condition.
fn split_conditions(clause: &str) -> Vec<&str> {
    let p = patterns();
    let mut parts = vec![];
    let mut start = 0;
    let mut range_closed = false;
    for caps in p.connective.captures_iter(clause) {
        let Some(m) = caps.get(0) else { continue };
        if in_literal(clause, m.start()) {
            continue;
        }
        let part = &clause[start..m.start()];
        if !range_closed && caps[1].eq_ignore_ascii_case("and") && p.between.is_match(part) {
            range_closed = true;
            continue;
        }
        parts.push(part);
        start = m.end();
        range_closed = false;
    }
    parts.push(&clause[start..]);
    parts
}

fn parse_filters(sql: &str) -> Vec<Binding> {
    let Some(clause) = where_clause(sql) else {
        return vec![];
    };
    let p = patterns();
    split_conditions(clause)
        .into_iter()
        .filter_map(|condition| {
            let caps = p.condition.captures(condition)?;
            Some(Binding {
                column: unqualified(&caps[1]).to_string(),
                parameter: first_parameter(&caps[2]),
            })
        })
        .collect()
}

fn parse_assignments(clause: &str) -> Vec<Binding> {
    split_top_level(clause)
        .into_iter()
        .filter_map(|assignment| {
            let (column, value) = assignment.split_once('=')?;
            Some(Binding {
                column: unqualified(column.trim()).to_string(),
                parameter: first_parameter(value),
            })
        })
        .collect()
}

fn parse_insert(sql: &str) -> Option<(String, Vec<Binding>)> {
    let p = patterns();
    let caps = p.insert.captures(sql)?;
    let table = unqualified(&caps[1]).to_string();
    let columns: Vec<&str> = caps
        .get(2)
        .map(|m| split_top_level(m.as_str()))
        .unwrap_or_default();

    let values = p
        .values
        .find(sql)
        .map(|m| split_top_level(enclosed(&sql[m.end()..])))
        .unwrap_or_default();

    let bindings = if columns.is_empty() {
        // Without a column list, parameters name the columns they fill.
        values
            .iter()
            .filter_map(|value| first_parameter(value))
            .map(|parameter| Binding {
                column: crate::parameter::bare_name(&parameter).to_string(),
                parameter: Some(parameter),
            })
            .collect()
    } else {
        columns
            .iter()
            .enumerate()
            .map(|(i, column)| Binding {
                column: unqualified(column).to_string(),
                parameter: values.get(i).and_then(|value| first_parameter(value)),
            })
            .collect()
    };
    Some((table, bindings))
}

impl Statement {
    /// Read `sql`. Returns `None` unless it starts with one of the four
    /// DML verbs and names a table.
    pub fn parse(sql: &str) -> Option<Statement> {
        let p = patterns();
        let verb = p.verb.captures(sql)?;
        let kind = *verbs().find(&verb[1])?;

        let statement = match kind {
            StatementKind::Insert => {
                let (table, assignments) = parse_insert(sql)?;
                Statement {
                    kind,
                    table,
                    assignments,
                    filters: vec![],
                }
            }
            StatementKind::Update => {
                let table = unqualified(&p.update.captures(sql)?[1]).to_string();
                let assignments = match p.set.find(sql) {
                    Some(set) => {
                        let clause = &sql[set.end()..];
                        let end = p.where_.find(clause).map_or(clause.len(), |m| m.start());
                        parse_assignments(&clause[..end])
                    }
                    None => vec![],
                };
                Statement {
                    kind,
                    table,
                    assignments,
                    filters: parse_filters(sql),
                }
            }
            StatementKind::Delete | StatementKind::Select => {
                let pattern = if kind == StatementKind::Delete {
                    &p.delete
                } else {
                    &p.select
                };
                let table = unqualified(&pattern.captures(sql)?[1]).to_string();
                Statement {
                    kind,
                    table,
                    assignments: vec![],
                    filters: parse_filters(sql),
                }
            }
        };
        Some(statement)
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Unqualified table name as written.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// `Set` bindings of an update, or column/value pairs of an insert.
    pub fn assignments(&self) -> &[Binding] {
        &self.assignments
    }

    /// Conditions of the where clause.
    pub fn filters(&self) -> &[Binding] {
        &self.filters
    }

    pub fn targets(&self, table: &str) -> bool {
        same_name(&self.table, table)
    }

    pub fn assignment(&self, column: &str) -> Option<&Binding> {
        self.assignments.iter().find(|b| same_name(&b.column, column))
    }

    pub fn filter(&self, column: &str) -> Option<&Binding> {
        self.filters.iter().find(|b| same_name(&b.column, column))
    }
}
