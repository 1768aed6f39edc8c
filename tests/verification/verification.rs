use pretty_assertions::assert_eq;
use regex::Regex;
use sqlfake::{
    text_contains, Command, Connection, Expectation, FakeConnection, Mismatch, StatementKind,
    Value, VerificationFailureKind, Verify,
};

fn run(conn: &FakeConnection, sql: &str, params: &[(&str, Value)]) {
    let mut cmd = conn.create_command();
    cmd.set_command_text(sql);
    for (name, value) in params {
        cmd.parameters_mut().set(*name, value.clone());
    }
    cmd.execute_non_query().unwrap();
}

fn updated_products(id: i32) -> FakeConnection {
    let conn = FakeConnection::new();
    conn.set_up_for_execute_non_query(1, 1);
    run(
        &conn,
        "Update Schema.Products Set Name=@Name Where Id=@Id",
        &[("@Name", "Boo1".into()), ("@Id", id.into())],
    );
    conn
}

#[test]
fn test_exact_count_reports_actual() {
    let conn = FakeConnection::new();
    conn.set_up_for_execute_non_query(1, 3);
    for _ in 0..3 {
        run(&conn, "delete from Carts", &[]);
    }

    conn.verify(text_contains("carts"), 3, true).unwrap();
    conn.verify(text_contains("carts"), 2, false).unwrap();

    let failure = conn.verify(text_contains("carts"), 2, true).unwrap_err();
    let pattern = Regex::new(r"expected exactly 2 .*but found 3").unwrap();
    assert!(pattern.is_match(&failure.to_string()), "{failure}");
    assert!(matches!(
        failure.kind(),
        VerificationFailureKind::CountMismatch { actual: 3, .. }
    ));
}

#[test]
fn test_custom_message() {
    let conn = FakeConnection::new();
    let failure = conn
        .verify_with_message(|_| true, 1, false, format!("checkout for cart {} never ran", 7))
        .unwrap_err();
    assert_eq!(
        failure.to_string(),
        "checkout for cart 7 never ran\nexpected at least 1 matching invocation, but found 0\n[Executed] nothing"
    );
}

#[test]
fn test_should_have_updated() {
    updated_products(111)
        .should_have_updated("Products", [("Name", "Boo1")], "Id", Some(111.into()))
        .unwrap();

    let failure = updated_products(222)
        .should_have_updated("Products", [("Name", "Boo1")], "Id", Some(111.into()))
        .unwrap_err();
    assert_eq!(
        failure.to_string(),
        "expected Update on table Products: column Id was expected to be 111, but was 222\n[SQL] Update Schema.Products Set Name=@Name Where Id=@Id"
    );
}

#[test]
fn test_wrong_verb_fails() {
    let failure = updated_products(111)
        .should_have_inserted("Products", [("Name", "Boo1")])
        .unwrap_err();
    assert_eq!(
        failure.kind(),
        &VerificationFailureKind::StatementMismatch {
            kind: StatementKind::Insert,
            table: "Products".to_string(),
            mismatch: Mismatch::NotExecuted,
            sql: None,
        }
    );
}

#[test]
fn test_mismatch_names_table_and_column() {
    let conn = updated_products(111);

    let failure = conn
        .should_have_updated("Orders", [("Name", "Boo1")], "Id", None)
        .unwrap_err();
    assert!(failure.to_string().contains("Orders"));
    assert!(failure.to_string().contains("targeted table Products"));

    let failure = conn
        .should_have_updated("Products", [("Title", "Boo1")], "Id", None)
        .unwrap_err();
    assert!(failure.to_string().contains("column Title"));
}

#[test]
fn test_select_and_delete() {
    let conn = FakeConnection::new();
    conn.set_up_for_execute_non_query(1, 2);
    run(
        &conn,
        "SELECT p.Id FROM dbo.Products p WHERE p.Category = @Category OR p.Name LIKE @Pattern",
        &[("@Category", 3.into())],
    );
    run(&conn, "delete from [Products] where [Id] = @Id", &[("@Id", 5i64.into())]);

    // Select compares field names only.
    conn.should_have_selected("Products", ["Category", "Name"])
        .unwrap();
    conn.should_have_deleted("products", "id", Some(5.into()))
        .unwrap();
    assert!(conn.should_have_selected("Products", ["Price"]).is_err());
    assert!(conn.should_have_deleted("Products", "Id", Some(6.into())).is_err());
}

#[test]
fn test_expectation_builder() {
    let conn = FakeConnection::new();
    conn.set_up_for_execute_non_query(1, 1);
    run(
        &conn,
        "insert into Orders (Id, Customer, Total) values (@Id, @Customer, @Total)",
        &[
            ("@Id", 1.into()),
            ("@Customer", "ada".into()),
            ("@Total", 12.5.into()),
        ],
    );

    conn.should_have_executed(
        &Expectation::insert("Orders")
            .value("Customer", "ada")
            .value("Total", 12.5),
    )
    .unwrap();

    let failure = conn
        .should_have_executed(&Expectation::insert("Orders").value("Total", 13.0))
        .unwrap_err();
    let colored = failure.display(true).to_string();
    assert!(colored.contains("\u{1b}["));
    assert_eq!(
        failure.display(false).to_string(),
        "expected Insert on table Orders: column Total was expected to be 13, but was 12.5\n[SQL] insert into Orders (Id, Customer, Total) values (@Id, @Customer, @Total)"
    );
}

#[test]
fn test_negated_and_range_filters() {
    let conn = FakeConnection::new();
    conn.set_up_for_execute_non_query(1, 2);
    run(
        &conn,
        "delete from Products where Id not in (@A, @B)",
        &[("@A", 1.into()), ("@B", 2.into())],
    );
    run(
        &conn,
        "select Id from Products where Price between @Lo and @Hi and Name not like @Name",
        &[("@Lo", 1.into()), ("@Hi", 9.into()), ("@Name", "B%".into())],
    );

    conn.should_have_deleted("Products", "Id", None).unwrap();
    conn.should_have_deleted("Products", "Id", Some(1.into()))
        .unwrap();
    conn.should_have_selected("Products", ["Price", "Name"])
        .unwrap();
}

#[test]
fn test_literal_assignment_is_unbound() {
    let conn = FakeConnection::new();
    conn.set_up_for_execute_non_query(1, 1);
    run(
        &conn,
        "update Shifts set Starts = '12:30' where Id = @Id",
        &[("@Id", 4.into())],
    );

    let failure = conn
        .should_have_updated("Shifts", [("Starts", "12:30")], "Id", Some(4.into()))
        .unwrap_err();
    assert_eq!(
        failure.kind(),
        &VerificationFailureKind::StatementMismatch {
            kind: StatementKind::Update,
            table: "Shifts".to_string(),
            mismatch: Mismatch::Unbound {
                column: "Starts".to_string(),
            },
            sql: Some("update Shifts set Starts = '12:30' where Id = @Id".to_string()),
        }
    );
}
