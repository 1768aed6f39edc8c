use pretty_assertions::assert_eq;
use sqlfake::{Command, Connection, Error, ExecutionKind, FakeConnection, Value, UNLIMITED};

#[test]
fn test_n_times_then_exhausted() {
    for n in 1..=5 {
        let conn = FakeConnection::new();
        conn.set_up_for_execute_non_query(42, n);
        let mut cmd = conn.create_command();
        cmd.set_command_text("delete from Products");

        for _ in 0..n {
            assert_eq!(cmd.execute_non_query().unwrap(), 42);
        }
        assert!(matches!(
            cmd.execute_non_query(),
            Err(Error::NoSetupAvailable { found: None, .. })
        ));
    }
}

#[test]
fn test_n_times_then_next_setup() {
    for n in 1..=5 {
        let conn = FakeConnection::new();
        conn.set_up_for_execute_non_query(1, n)
            .set_up_for_execute_non_query(2, 1);
        let mut cmd = conn.create_command();

        let results = (0..=n)
            .map(|_| cmd.execute_non_query().unwrap())
            .collect::<Vec<_>>();
        let mut expected = vec![1; n];
        expected.push(2);
        assert_eq!(results, expected);
    }
}

#[test]
fn test_mixed_kinds_in_order() {
    let conn = FakeConnection::new();
    conn.set_up_for_execute_scalar(10i64, 1)
        .set_up_for_execute_non_query(3, 1)
        .set_up_for_execute_scalar("done", UNLIMITED);
    let mut cmd = conn.create_command();

    assert_eq!(cmd.execute_scalar().unwrap(), Value::Int64(10));
    assert_eq!(
        cmd.execute_scalar(),
        Err(Error::NoSetupAvailable {
            expected: ExecutionKind::Scalar,
            found: Some(ExecutionKind::NonQuery),
            sql: String::new(),
        })
    );
    assert_eq!(cmd.execute_non_query().unwrap(), 3);
    for _ in 0..3 {
        assert_eq!(cmd.execute_scalar().unwrap(), Value::from("done"));
    }
    assert_eq!(conn.pending_setups(), 1);
}

#[test]
fn test_clones_share_the_queue() {
    let conn = FakeConnection::new();
    let handle = conn.clone();
    handle.set_up_for_execute_non_query(9, 1);

    let mut cmd = conn.create_command();
    assert_eq!(cmd.execute_non_query().unwrap(), 9);
    assert_eq!(handle.pending_setups(), 0);
}

#[test]
fn test_concurrent_use() {
    let conn = FakeConnection::new();
    conn.set_up_for_execute_non_query(1, 100);

    let handles = (0..4)
        .map(|_| {
            let conn = conn.clone();
            std::thread::spawn(move || {
                let mut cmd = conn.create_command();
                (0..25)
                    .map(|_| cmd.execute_non_query().unwrap())
                    .sum::<u64>()
            })
        })
        .collect::<Vec<_>>();
    let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(total, 100);
    assert_eq!(conn.pending_setups(), 0);
    assert_eq!(sqlfake::Invocations::invocations(&conn).len(), 100);
}
