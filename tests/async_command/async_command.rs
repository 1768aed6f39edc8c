use futures::executor::block_on;
use pretty_assertions::assert_eq;
use sqlfake::{
    AsyncCommand, Command, Connection, DataReader, Error, FakeConnection, Invocations, QueryData,
    Value,
};

async fn rename_product(conn: &FakeConnection, id: i32, name: &str) -> Result<u64, Error> {
    let mut cmd = conn.create_command();
    cmd.set_command_text("Update Products Set Name=@Name Where Id=@Id");
    cmd.parameters_mut().set("@Name", name);
    cmd.parameters_mut().set("@Id", id);
    cmd.execute_non_query_async().await
}

#[test]
fn test_async_variants_share_the_queue() {
    let conn = FakeConnection::new();
    conn.set_up_for_execute_non_query(1, 1)
        .set_up_for_execute_scalar("Boo1", 1);
    conn.set_up_for_query(QueryData::scalars([1, 2]), ["Id"], 1)
        .unwrap();

    block_on(async {
        assert_eq!(rename_product(&conn, 111, "Boo1").await.unwrap(), 1);

        let mut cmd = conn.create_command();
        assert_eq!(cmd.execute_scalar_async().await.unwrap(), Value::from("Boo1"));

        let mut reader = cmd.execute_reader_async().await.unwrap();
        let mut ids = vec![];
        while reader.read().unwrap() {
            ids.push(reader.get_i32(0).unwrap());
        }
        assert_eq!(ids, vec![1, 2]);
    });

    assert_eq!(conn.invocations().len(), 3);
}

#[test]
fn test_async_failure_is_recorded() {
    let conn = FakeConnection::new();
    let result = block_on(rename_product(&conn, 1, "x"));

    assert!(matches!(result, Err(Error::NoSetupAvailable { .. })));
    assert_eq!(conn.invocations().len(), 1);
}

#[test]
fn test_overlapping_futures() {
    let conn = FakeConnection::new();
    conn.set_up_for_execute_non_query(1, 2);

    let (first, second) = block_on(futures::future::join(
        rename_product(&conn, 1, "a"),
        rename_product(&conn, 2, "b"),
    ));
    assert_eq!(first.unwrap() + second.unwrap(), 2);
    assert_eq!(conn.pending_setups(), 0);
}
