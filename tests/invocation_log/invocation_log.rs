use pretty_assertions::assert_eq;
use sqlfake::{
    Command, CommandType, Connection, ConnectionState, ExecutionKind, FakeConnection, Invocations,
    Parameter, ParameterDirection, Value,
};

#[test]
fn test_identical_text_gives_independent_records() {
    let conn = FakeConnection::new();
    conn.set_up_for_execute_non_query(1, 2);

    let mut cmd = conn.create_command();
    cmd.set_command_text("Update Products Set Name=@Name Where Id=@Id");
    cmd.parameters_mut().set("@Name", "first");
    cmd.parameters_mut().set("@Id", 1);
    cmd.execute_non_query().unwrap();

    cmd.parameters_mut().set("@Name", "second");
    cmd.execute_non_query().unwrap();

    // Mutating the live command afterwards changes neither record.
    cmd.parameters_mut().set("@Name", "third");
    cmd.parameters_mut().remove("@Id");

    let log = conn.invocations();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].command_text(), log[1].command_text());
    assert_eq!(log[0].parameter_value("Name"), Some(&Value::from("first")));
    assert_eq!(log[1].parameter_value("Name"), Some(&Value::from("second")));
    assert_eq!(log[1].parameter_value("Id"), Some(&Value::Int32(1)));
}

#[test]
fn test_record_captures_type_kind_and_direction() {
    let conn = FakeConnection::new();
    conn.set_up_for_execute_scalar(5, 1);

    let mut cmd = conn.create_command();
    cmd.set_command_type(CommandType::StoredProcedure);
    cmd.set_command_text("CountProducts");
    cmd.parameters_mut()
        .add(Parameter::unset("@Total").with_direction(ParameterDirection::Output))
        .unwrap();
    cmd.execute_scalar().unwrap();

    let record = &conn.invocations()[0];
    assert_eq!(record.kind(), ExecutionKind::Scalar);
    assert_eq!(record.command_type(), CommandType::StoredProcedure);
    assert_eq!(
        record.parameter("Total").map(Parameter::direction),
        Some(ParameterDirection::Output)
    );
    assert_eq!(record.to_string(), "[ExecuteScalar] CountProducts (@Total unset)");
}

#[test]
fn test_duplicate_parameter_is_rejected() {
    let conn = FakeConnection::new();
    let mut cmd = conn.create_command();
    cmd.parameters_mut().add_with_value("@Id", 1).unwrap();

    let err = cmd.parameters_mut().add_with_value("Id", 2).unwrap_err();
    assert_eq!(
        err,
        sqlfake::Error::DuplicateParameter {
            name: "Id".to_string(),
        }
    );
}

#[test]
fn test_log_survives_dispose() {
    let mut conn = FakeConnection::new();
    conn.open().unwrap();
    conn.set_up_for_execute_non_query(1, 1);
    conn.create_command().execute_non_query().unwrap();

    conn.dispose().unwrap();
    conn.dispose().unwrap();
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert_eq!(conn.invocations().len(), 1);
}
