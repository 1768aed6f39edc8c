//! A fake database driver for testing data-access code without a database.
//!
//! # Usage
//!
//! Program the responses of a [`FakeConnection`], hand it to the code under
//! test, then assert on what was executed:
//!
//! ```
//! use sqlfake::{Command, Connection, FakeConnection, Verify};
//!
//! let conn = FakeConnection::new();
//! conn.set_up_for_execute_non_query(1, 1);
//!
//! // Code under test.
//! let mut cmd = conn.create_command();
//! cmd.set_command_text("Update Schema.Products Set Name=@Name Where Id=@Id");
//! cmd.parameters_mut().set("@Name", "Boo1");
//! cmd.parameters_mut().set("@Id", 111);
//! cmd.execute_non_query().unwrap();
//!
//! conn.should_have_updated("Products", [("Name", "Boo1")], "Id", Some(111.into()))
//!     .unwrap();
//! ```
//!
//! Queries are answered from typed records, scalars or raw rows:
//!
//! ```
//! use sqlfake::{
//!     ColumnSource, FakeConnection, FieldValue, QueryData, QueryExt, Record, RecordSchema,
//! };
//!
//! struct Product {
//!     id: i32,
//!     name: String,
//! }
//!
//! impl Record for Product {
//!     fn describe() -> RecordSchema {
//!         RecordSchema::new().field::<i32>("Id").field::<String>("Name")
//!     }
//!
//!     fn values(&self) -> Vec<FieldValue> {
//!         vec![FieldValue::scalar(self.id), FieldValue::scalar(self.name.clone())]
//!     }
//! }
//!
//! let conn = FakeConnection::new();
//! let products = [Product { id: 1, name: "Boo1".into() }];
//! conn.set_up_for_query(QueryData::records(&products), ColumnSource::Inferred, 1)
//!     .unwrap();
//!
//! let rows: Vec<(i32, String)> = conn.query("select Id, Name from Products", &[]).unwrap();
//! assert_eq!(rows, vec![(1, "Boo1".to_string())]);
//! ```
//!
//! Code that must run against a real driver can still be observed by
//! wrapping its connection in a [`RecordingConnection`].

pub mod command;
pub mod connection;
pub mod error;
pub mod invocation;
pub mod parameter;
pub mod predicate;
pub mod protocol;
pub mod query;
pub mod reader;
pub mod record;
pub mod recording;
pub mod result_set;
pub mod sql;
pub mod value;
pub mod verify;

pub use self::command::*;
pub use self::connection::*;
pub use self::error::*;
pub use self::invocation::*;
pub use self::parameter::*;
pub use self::predicate::*;
pub use self::protocol::*;
pub use self::query::*;
pub use self::reader::*;
pub use self::record::*;
pub use self::recording::*;
pub use self::result_set::*;
pub use self::sql::*;
pub use self::value::*;
pub use self::verify::*;
