use pretty_assertions::assert_eq;
use sqlfake::{
    ColumnMetadata, ColumnSource, Command, Connection, DataReader, DbType, FakeConnection,
    FieldValue, FromRow, QueryData, QueryExt, Record, RecordSchema, RowRef,
};

#[derive(Debug, Clone, Default, PartialEq)]
struct Category {
    id: i32,
    title: String,
}

impl Record for Category {
    fn describe() -> RecordSchema {
        RecordSchema::new()
            .field::<i32>("Id")
            .field::<String>("Title")
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::scalar(self.id),
            FieldValue::scalar(self.title.clone()),
        ]
    }
}

impl FromRow for Category {
    fn from_row(row: &RowRef<'_>) -> sqlfake::Result<Self> {
        Ok(Category {
            id: row.get("Id")?,
            title: row.get("Title")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Product {
    id: i64,
    name: String,
    price: Option<f64>,
    category: Category,
}

impl Record for Product {
    fn describe() -> RecordSchema {
        RecordSchema::new()
            .field::<i64>("Id")
            .field::<String>("Name")
            .field::<f64>("Price")
            .nested::<Category>("Category")
    }

    fn values(&self) -> Vec<FieldValue> {
        // A default category stands in for "no category".
        let category = (self.category != Category::default()).then_some(&self.category);
        vec![
            FieldValue::scalar(self.id),
            FieldValue::scalar(self.name.clone()),
            FieldValue::scalar(self.price),
            FieldValue::nested(category),
        ]
    }
}

impl FromRow for Product {
    fn from_row(row: &RowRef<'_>) -> sqlfake::Result<Self> {
        Ok(Product {
            id: row.get("Id")?,
            name: row.get("Name")?,
            price: row.get("Price")?,
            category: row.nested("Category")?.unwrap_or_default(),
        })
    }
}

fn products() -> Vec<Product> {
    vec![
        Product {
            id: 1,
            name: "Hammer".to_string(),
            price: Some(9.5),
            category: Category {
                id: 3,
                title: "Tools".to_string(),
            },
        },
        Product {
            id: 2,
            name: "Mystery box".to_string(),
            price: None,
            category: Category::default(),
        },
    ]
}

#[test]
fn test_records_round_trip() {
    let conn = FakeConnection::new();
    let columns = ["Id", "Name", "Price", "Category"];
    conn.set_up_for_query(QueryData::records(&products()), columns, 1)
        .unwrap();

    let rows: Vec<Product> = conn.query("select * from Products", &[]).unwrap();
    assert_eq!(rows, products());
}

#[test]
fn test_shape_matches_schema() {
    let conn = FakeConnection::new();
    conn.set_up_for_query(
        QueryData::records(&products()),
        ["Id", "Name", "Price", "Category.Id", "Category.Title"],
        1,
    )
    .unwrap();

    let mut reader = conn.create_command().execute_reader().unwrap();
    assert_eq!(reader.field_count(), 5);
    assert_eq!(reader.get_name(3).unwrap(), "Category.Id");
    assert_eq!(reader.get_field_type(2).unwrap(), DbType::Double);

    let mut rows = 0;
    while reader.read().unwrap() {
        rows += 1;
        assert_eq!((0..reader.field_count()).filter_map(|i| reader.get_value(i).ok()).count(), 5);
    }
    assert_eq!(rows, 2);
}

#[test]
fn test_default_columns_are_top_level_scalars() {
    let conn = FakeConnection::new();
    conn.set_up_for_query(QueryData::records(&products()), ColumnSource::Inferred, 1)
        .unwrap();

    let reader = conn.create_command().execute_reader().unwrap();
    let names = reader
        .columns()
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Id", "Name", "Price"]);
}

#[test]
fn test_explicit_metadata_overrides_types() {
    let conn = FakeConnection::new();
    conn.set_up_for_query(
        QueryData::records(&products()),
        vec![
            ColumnMetadata::new("Id", DbType::Int64),
            ColumnMetadata::new("Price", DbType::Object),
        ],
        1,
    )
    .unwrap();

    let mut reader = conn.create_command().execute_reader().unwrap();
    assert_eq!(reader.get_field_type(1).unwrap(), DbType::Object);
    reader.read().unwrap();
    assert_eq!(reader.get_f64(1).unwrap(), 9.5);
}

#[test]
fn test_unknown_column_is_rejected() {
    let conn = FakeConnection::new();
    let err = conn
        .set_up_for_query(QueryData::records(&products()), ["Id", "Weight"], 1)
        .unwrap_err();
    assert_eq!(err, sqlfake::Error::column_not_found("Weight"));
}
