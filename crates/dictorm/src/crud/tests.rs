use super::*;
use crate::config::SessionConfig;
use crate::row;
use crate::schema::{ColumnDef, ColumnType};
use crate::testing::MockConnection;

async fn session(backend: Backend) -> (Session<MockConnection>, MockConnection) {
    let conn = MockConnection::new(backend);
    let session = Session::connect(conn.clone(), SessionConfig::default())
        .await
        .unwrap();
    (session, conn)
}

// ==================== statement builders ====================

#[test]
fn select_all_without_conditions() {
    let stmt = select_statement(Backend::Sqlite, "t", &Select::new()).unwrap();
    assert_eq!(stmt.to_sql(), "select * from `t`");
    assert!(stmt.params().is_empty());
}

#[test]
fn select_with_every_clause_in_order() {
    let select = Select::new()
        .columns(["name", "age"])
        .filter(row! { "name" => "Tom" })
        .group_by("age")
        .order_by("age desc")
        .limit(10)
        .offset(20);
    let stmt = select_statement(Backend::Postgres, "t", &select).unwrap();
    assert_eq!(
        stmt.to_sql(),
        "select name, age from t where name = $1 group by age order by age desc limit 10 offset 20"
    );
    assert_eq!(stmt.params(), &[Value::from("Tom")]);
}

#[test]
fn select_or_combinator() {
    let select = Select::new().filter(row! { "a" => 1, "b" => 2 }).any();
    let stmt = select_statement(Backend::Mysql, "t", &select).unwrap();
    assert_eq!(stmt.to_sql(), "select * from `t` where `a` = ? or `b` = ?");
    assert_eq!(
        stmt.to_inline_sql(),
        "select * from `t` where `a` = '1' or `b` = '2'"
    );
}

#[test]
fn select_raw_conditions_and_columns() {
    let select = Select::new()
        .columns("count(*) as count")
        .filter("age > 18");
    let stmt = select_statement(Backend::Sqlite, "t", &select).unwrap();
    assert_eq!(stmt.to_sql(), "select count(*) as count from `t` where age > 18");
}

#[test]
fn insert_keeps_row_order() {
    let stmt = insert_statement(Backend::Sqlite, "t", &row! { "name" => "Tom", "age" => 22 }).unwrap();
    assert_eq!(stmt.to_sql(), "insert into `t`(`name`, `age`) values(?, ?)");
    assert_eq!(stmt.params(), &[Value::from("Tom"), Value::from(22)]);

    let stmt =
        insert_statement(Backend::Postgres, "t", &row! { "name" => "Tom", "age" => 22 }).unwrap();
    assert_eq!(stmt.to_sql(), "insert into t(name, age) values($1, $2)");
}

#[test]
fn insert_empty_row_is_rejected() {
    let err = insert_statement(Backend::Sqlite, "t", &Row::new()).unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn update_binds_set_then_where() {
    let stmt = update_statement(
        Backend::Postgres,
        "t",
        &row! { "age" => 23 },
        &Conditions::eq("id", 1),
        Combinator::And,
    )
    .unwrap();
    assert_eq!(stmt.to_sql(), "update t set age = $1 where id = $2");
    assert_eq!(stmt.params(), &[Value::from(23), Value::from(1)]);
}

#[test]
fn update_with_nothing_to_set_is_rejected() {
    let err = update_statement(
        Backend::Sqlite,
        "t",
        &Row::new(),
        &Conditions::None,
        Combinator::And,
    )
    .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn delete_without_conditions_has_no_where() {
    let stmt = delete_statement(Backend::Sqlite, "t", &Conditions::None, Combinator::And).unwrap();
    assert_eq!(stmt.to_sql(), "delete from `t`");
}

#[test]
fn delete_null_condition_uses_is_null() {
    let stmt = delete_statement(
        Backend::Sqlite,
        "t",
        &row! { "name" => Value::Null }.into(),
        Combinator::And,
    )
    .unwrap();
    assert_eq!(stmt.to_sql(), "delete from `t` where `name` is null");
    assert!(stmt.params().is_empty());
}

#[test]
fn create_table_injects_key_first() {
    let schema = TableSchema::from_template(&row! { "name" => "", "age" => 1 });
    let sqlite = create_table_statement(Backend::Sqlite, "t", &schema, "id").unwrap();
    assert_eq!(
        sqlite.to_sql(),
        "create table if not exists `t`(`id` integer not null, `name` text, `age` int not null, primary key (`id`))"
    );

    let mysql = create_table_statement(Backend::Mysql, "t", &schema, "id").unwrap();
    assert!(mysql.to_sql().contains("`id` int not null auto_increment, `name` text"));

    let pg = create_table_statement(Backend::Postgres, "t", &schema, "id").unwrap();
    assert_eq!(
        pg.to_sql(),
        "create table if not exists t(id bigserial not null, name text, age int not null, primary key (id))"
    );
}

#[test]
fn create_table_keeps_declared_key() {
    let schema = TableSchema::new()
        .column(ColumnDef::new("code", ColumnType::Text).not_null())
        .column(ColumnDef::new("qty", ColumnType::BigInt));
    let stmt = create_table_statement(Backend::Sqlite, "items", &schema, "code").unwrap();
    assert_eq!(
        stmt.to_sql(),
        "create table if not exists `items`(`code` text not null, `qty` bigint, primary key (`code`))"
    );
}

#[test]
fn reset_and_drop() {
    assert_eq!(
        reset_table_statement(Backend::Sqlite, "t").unwrap().to_sql(),
        "delete from `t`"
    );
    assert_eq!(
        reset_table_statement(Backend::Mysql, "t").unwrap().to_sql(),
        "truncate table `t`"
    );
    assert_eq!(
        reset_table_statement(Backend::Postgres, "t").unwrap().to_sql(),
        "truncate table t"
    );
    assert_eq!(
        drop_table_statement(Backend::Sqlite, "t", false).unwrap().to_sql(),
        "drop table `t`"
    );
    assert_eq!(
        drop_table_statement(Backend::Postgres, "t", true).unwrap().to_sql(),
        "drop table if exists t"
    );
}

#[test]
fn invalid_table_name_is_rejected() {
    assert!(select_statement(Backend::Sqlite, "", &Select::new()).is_err());
    assert!(drop_table_statement(Backend::Sqlite, "bad\"name", false).is_err());
}

// ==================== split_key ====================

#[test]
fn split_key_leaves_caller_row_untouched() {
    let obj = row! { "id" => 7, "name" => "Tom" };
    let (fields, key) = split_key(&obj, None, "id").unwrap();
    assert_eq!(key, Value::from(7));
    assert_eq!(fields, row! { "name" => "Tom" });
    assert!(obj.contains_key("id"));
    assert_eq!(obj.len(), 2);
}

#[test]
fn split_key_explicit_value_wins() {
    let obj = row! { "id" => 7, "name" => "Tom" };
    let (fields, key) = split_key(&obj, Some(Value::from(9)), "id").unwrap();
    assert_eq!(key, Value::from(9));
    assert!(!fields.contains_key("id"));
}

#[test]
fn split_key_without_any_key_fails() {
    let err = split_key(&row! { "name" => "Tom" }, None, "id").unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

// ==================== session operations ====================

#[tokio::test]
async fn set_object_excludes_key_from_set() {
    let (mut session, conn) = session(Backend::Sqlite).await;
    let obj = row! { "id" => 1, "name" => "Tom", "age" => 23 };
    session.set_object("t", &obj, None, "id").await.unwrap();

    let state = conn.state();
    let (sql, params) = &state.executed[0];
    assert_eq!(sql, "update `t` set `name` = ?, `age` = ? where `id` = ?");
    assert_eq!(params, &vec![Value::from("Tom"), Value::from(23), Value::from(1)]);
    drop(state);
    assert!(obj.contains_key("id"));
}

#[tokio::test]
async fn del_object_uses_key() {
    let (mut session, conn) = session(Backend::Postgres).await;
    session
        .del_object("t", &row! { "id" => 4 }, None, "id")
        .await
        .unwrap();
    assert_eq!(conn.executed_sql(), vec!["delete from t where id = $1"]);
}

#[tokio::test]
async fn del_object_without_key_issues_nothing() {
    let (mut session, conn) = session(Backend::Sqlite).await;
    let err = session
        .del_object("t", &row! { "name" => "Tom" }, None, "id")
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
    assert!(conn.executed_sql().is_empty());
}

#[tokio::test]
async fn mutations_follow_autocommit() {
    let (mut session, conn) = session(Backend::Sqlite).await;
    session.add_object("t", &row! { "a" => 1 }).await.unwrap();
    assert_eq!(conn.state().commits, 1);

    session.set_autocommit(false);
    session.add_object("t", &row! { "a" => 2 }).await.unwrap();
    session.del_objects("t", Conditions::None, Combinator::And).await.unwrap();
    assert_eq!(conn.state().commits, 1);
}

#[tokio::test]
async fn reads_never_commit() {
    let (mut session, conn) = session(Backend::Sqlite).await;
    session.get_objects("t", &Select::new()).await.unwrap();
    session.get_object_by_id("t", 1).await.unwrap();
    assert_eq!(conn.state().commits, 0);
}

#[tokio::test]
async fn create_table_new_drops_first() {
    let (mut session, conn) = session(Backend::Sqlite).await;
    session
        .create_table_from_template("t", &row! { "name" => "" }, "id", true)
        .await
        .unwrap();
    assert_eq!(
        conn.executed_sql(),
        vec![
            "drop table if exists `t`",
            "create table if not exists `t`(`id` integer not null, `name` text, primary key (`id`))",
        ]
    );
}

#[tokio::test]
async fn get_object_returns_first_row() {
    let (mut session, conn) = session(Backend::Sqlite).await;
    conn.state().rows = vec![
        row! { "id" => 1, "name" => "Tom" },
        row! { "id" => 1, "name" => "Jerry" },
    ];
    let found = session.get_object("t", 1, "id").await.unwrap().unwrap();
    assert_eq!(found.get("name"), Some(&Value::from("Tom")));
    assert_eq!(conn.executed_sql(), vec!["select * from `t` where `id` = ?"]);

    conn.state().rows.clear();
    assert!(session.get_object_by_id("t", 2).await.unwrap().is_none());
}

#[tokio::test]
async fn count_objects_reads_count_column() {
    let (mut session, conn) = session(Backend::Mysql).await;
    conn.state().rows = vec![row! { "count" => 3 }];
    let n = session
        .count_objects("t", row! { "age" => 22 }, Combinator::And)
        .await
        .unwrap();
    assert_eq!(n, 3);
    assert_eq!(
        conn.executed_sql(),
        vec!["select count(*) as count from `t` where `age` = ?"]
    );
}

#[tokio::test]
async fn operations_require_binding() {
    let mut session: Session<MockConnection> = Session::new(SessionConfig::default());
    let err = session.get_objects("t", &Select::new()).await.unwrap_err();
    assert!(err.is_not_connected());
    let err = session.reset_table("t").await.unwrap_err();
    assert!(err.is_not_connected());
}
