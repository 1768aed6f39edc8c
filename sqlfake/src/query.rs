//! One-call helpers for data-access code: build a command, bind its
//! parameters, execute it and map the result.

use crate::protocol::{Command, Connection, DataReader};
use crate::record::{FromRow, RowRef};
use crate::value::{FromValue, Value};

fn prepare<C: Connection + ?Sized>(conn: &C, sql: &str, params: &[(&str, Value)]) -> C::Command {
    let mut command = conn.create_command();
    command.set_command_text(sql);
    for (name, value) in params {
        command.parameters_mut().set(*name, value.clone());
    }
    command
}

/// Query helpers available on every [`Connection`].
///
/// ```
/// use sqlfake::{FakeConnection, QueryData, QueryExt};
///
/// let conn = FakeConnection::new();
/// conn.set_up_for_query(QueryData::scalars([3, 5]), ["Id"], 1).unwrap();
///
/// let ids: Vec<i32> = conn.query("select Id from Products", &[]).unwrap();
/// assert_eq!(ids, vec![3, 5]);
/// ```
pub trait QueryExt: Connection {
    /// Run a query and hydrate each row as `T`.
    fn query<T: FromRow>(
        &self,
        sql: &str,
        params: &[(&str, Value)],
    ) -> Result<Vec<T>, Self::Error> {
        let mut command = prepare(self, sql, params);
        let mut reader = command.execute_reader()?;
        let names = (0..reader.field_count())
            .map(|i| reader.get_name(i).map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = vec![];
        while reader.read()? {
            let values = (0..names.len())
                .map(|i| reader.get_value(i))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(T::from_row(&RowRef::new(&names, &values))?);
        }
        reader.close();
        tracing::debug!(sql, rows = rows.len(), "query hydrated");
        Ok(rows)
    }

    /// Run a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[(&str, Value)]) -> Result<u64, Self::Error> {
        prepare(self, sql, params).execute_non_query()
    }

    /// Run a query and convert its scalar result to `T`.
    fn execute_scalar_as<T: FromValue>(
        &self,
        sql: &str,
        params: &[(&str, Value)],
    ) -> Result<T, Self::Error> {
        let value = prepare(self, sql, params).execute_scalar()?;
        Ok(T::from_value(value, sql)?)
    }
}

impl<C: Connection + ?Sized> QueryExt for C {}
