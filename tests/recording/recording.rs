//! Recording over a connection that is not the fake one.

use pretty_assertions::assert_eq;
use sqlfake::{
    Command, CommandType, Connection, ConnectionState, DataReader, DbType, ExecutionKind,
    Invocations, ParameterCollection, RecordingConnection, Value, Verify,
};

#[derive(Debug)]
pub enum CounterError {
    Driver(sqlfake::Error),
    Closed,
}

impl std::fmt::Display for CounterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CounterError::Driver(e) => write!(f, "{e}"),
            CounterError::Closed => write!(f, "connection is closed"),
        }
    }
}

impl std::error::Error for CounterError {}

impl From<sqlfake::Error> for CounterError {
    fn from(e: sqlfake::Error) -> Self {
        CounterError::Driver(e)
    }
}

/// A toy driver: every statement "affects" as many rows as it has
/// parameters, and every query returns the numbers 1..=3.
#[derive(Debug, Default)]
pub struct CounterConnection {
    state: ConnectionState,
    interceptable: bool,
}

#[derive(Debug, Default)]
pub struct CounterCommand {
    open: bool,
    text: String,
    command_type: CommandType,
    parameters: ParameterCollection,
}

#[derive(Debug)]
pub struct CounterReader {
    next: i64,
    current: Option<i64>,
}

impl Connection for CounterConnection {
    type Error = CounterError;
    type Command = CounterCommand;

    fn create_command(&self) -> CounterCommand {
        CounterCommand {
            open: self.state == ConnectionState::Open,
            ..Default::default()
        }
    }

    fn open(&mut self) -> Result<(), CounterError> {
        self.state = ConnectionState::Open;
        Ok(())
    }

    fn close(&mut self) -> Result<(), CounterError> {
        self.state = ConnectionState::Closed;
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn supports_interception(&self) -> bool {
        self.interceptable
    }
}

impl Command for CounterCommand {
    type Error = CounterError;
    type Reader = CounterReader;

    fn command_text(&self) -> &str {
        &self.text
    }

    fn set_command_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn command_type(&self) -> CommandType {
        self.command_type
    }

    fn set_command_type(&mut self, command_type: CommandType) {
        self.command_type = command_type;
    }

    fn parameters(&self) -> &ParameterCollection {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterCollection {
        &mut self.parameters
    }

    fn execute_non_query(&mut self) -> Result<u64, CounterError> {
        if !self.open {
            return Err(CounterError::Closed);
        }
        Ok(self.parameters.len() as u64)
    }

    fn execute_scalar(&mut self) -> Result<Value, CounterError> {
        if !self.open {
            return Err(CounterError::Closed);
        }
        Ok(Value::Int64(self.text.len() as i64))
    }

    fn execute_reader(&mut self) -> Result<CounterReader, CounterError> {
        if !self.open {
            return Err(CounterError::Closed);
        }
        Ok(CounterReader {
            next: 1,
            current: None,
        })
    }
}

impl DataReader for CounterReader {
    type Error = CounterError;

    fn read(&mut self) -> Result<bool, CounterError> {
        if self.next > 3 {
            self.current = None;
            return Ok(false);
        }
        self.current = Some(self.next);
        self.next += 1;
        Ok(true)
    }

    fn field_count(&self) -> usize {
        1
    }

    fn get_name(&self, ordinal: usize) -> Result<&str, CounterError> {
        match ordinal {
            0 => Ok("N"),
            index => Err(sqlfake::Error::ColumnIndexOutOfBounds { index, count: 1 }.into()),
        }
    }

    fn get_field_type(&self, ordinal: usize) -> Result<DbType, CounterError> {
        self.get_name(ordinal).map(|_| DbType::Int64)
    }

    fn get_ordinal(&self, name: &str) -> Result<usize, CounterError> {
        if name.eq_ignore_ascii_case("n") {
            Ok(0)
        } else {
            Err(sqlfake::Error::column_not_found(name).into())
        }
    }

    fn get_value(&self, ordinal: usize) -> Result<Value, CounterError> {
        self.get_name(ordinal)?;
        Ok(self.current.map_or(Value::Null, Value::Int64))
    }

    fn close(&mut self) {
        self.next = i64::MAX;
    }

    fn is_closed(&self) -> bool {
        self.next == i64::MAX
    }
}

fn interceptable() -> CounterConnection {
    CounterConnection {
        interceptable: true,
        ..Default::default()
    }
}

#[test]
fn test_records_real_driver() {
    let mut conn = RecordingConnection::new(interceptable()).unwrap();
    conn.open().unwrap();
    assert_eq!(conn.state(), ConnectionState::Open);

    let mut cmd = conn.create_command();
    cmd.set_command_text("Update Products Set Name=@Name Where Id=@Id");
    cmd.parameters_mut().set("@Name", "Boo1");
    cmd.parameters_mut().set("@Id", 111);
    assert_eq!(cmd.execute_non_query().unwrap(), 2);

    let mut query = conn.create_command();
    query.set_command_text("select N from Numbers");
    let mut reader = query.execute_reader().unwrap();
    let mut numbers = vec![];
    while reader.read().unwrap() {
        numbers.push(reader.get_i64(0).unwrap());
    }
    assert_eq!(numbers, vec![1, 2, 3]);

    let kinds = conn
        .invocations()
        .iter()
        .map(|i| i.kind())
        .collect::<Vec<_>>();
    assert_eq!(kinds, vec![ExecutionKind::NonQuery, ExecutionKind::Reader]);
    conn.should_have_updated("Products", [("Name", "Boo1")], "Id", Some(111.into()))
        .unwrap();
}

#[test]
fn test_failures_pass_through_and_are_recorded() {
    // Never opened: the driver refuses.
    let conn = RecordingConnection::new(interceptable()).unwrap();
    let mut cmd = conn.create_command();
    cmd.set_command_text("select count(*) from Numbers");

    assert!(matches!(cmd.execute_scalar(), Err(CounterError::Closed)));
    assert_eq!(conn.log().len(), 1);
}

#[test]
fn test_unsupported_connection_type() {
    let err = RecordingConnection::new(CounterConnection::default()).unwrap_err();
    assert!(matches!(err, sqlfake::Error::UnsupportedConnectionType { .. }));
    assert!(err.to_string().contains("CounterConnection"), "{err}");
}
