use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

use vehicle_api::{
    config::ServerConfig,
    database::{ColumnValue, Database, SqlParam, SqlType},
    server::HttpServer,
    vehicles::{vehicle_routes, LIST_VEHICLES_SQL},
};

async fn create_vehicles(pool: &PgPool, count: i32) {
    sqlx::query(
        "CREATE TABLE vehicles (
            id SERIAL PRIMARY KEY,
            make TEXT NOT NULL,
            model VARCHAR(64),
            year INTEGER,
            price NUMERIC(10, 2),
            electric BOOLEAN NOT NULL,
            registered_at TIMESTAMPTZ,
            specs JSONB
        )",
    )
    .execute(pool)
    .await
    .expect("Failed to create vehicles table");

    for i in 1..=count {
        sqlx::query(
            "INSERT INTO vehicles (make, model, year, price, electric, registered_at, specs)
             VALUES ($1, $2, $3, $4::numeric, $5, to_timestamp($6), $7::jsonb)",
        )
        .bind(format!("Make {i}"))
        .bind(if i % 2 == 0 { None } else { Some(format!("Model {i}")) })
        .bind(2000 + i)
        .bind(format!("{i}9999.50"))
        .bind(i % 3 == 0)
        .bind(1_700_000_000f64 + f64::from(i))
        .bind(format!(r#"{{"seats": {i}}}"#))
        .execute(pool)
        .await
        .expect("Failed to insert vehicle");
    }
}

#[ignore = "requires DATABASE_URL pointing at a Postgres server"]
#[sqlx::test(migrations = false)]
async fn test_query_returns_rows_and_count(pool: PgPool) {
    create_vehicles(&pool, 3).await;
    let db = Database::new(pool);

    let result = db
        .query(
            "SELECT id, make, model FROM vehicles WHERE year > $1 ORDER BY id",
            &[SqlParam::Int(2001)],
        )
        .await
        .expect("Failed to query vehicles");

    assert_eq!(result.row_count, 2);
    assert_eq!(result.rows.len(), 2);
    let first = &result.rows[0];
    assert_eq!(first.get("id"), Some(&ColumnValue::Int(2)));
    assert_eq!(first.get("make"), Some(&ColumnValue::Text("Make 2".to_string())));
    assert_eq!(first.get("model"), Some(&ColumnValue::Null));
}

#[ignore = "requires DATABASE_URL pointing at a Postgres server"]
#[sqlx::test(migrations = false)]
async fn test_query_error(pool: PgPool) {
    let db = Database::new(pool);

    let result = db.query("SELECT * FROM no_such_table", &[]).await;
    assert!(result.is_err());
}

#[ignore = "requires DATABASE_URL pointing at a Postgres server"]
#[sqlx::test(migrations = false)]
async fn test_list_vehicles_limits_to_ten(pool: PgPool) {
    create_vehicles(&pool, 12).await;
    let app = vehicle_routes(Database::new(pool));

    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let vehicles: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(vehicles.len(), 10);
}

#[ignore = "requires DATABASE_URL pointing at a Postgres server"]
#[sqlx::test(migrations = false)]
async fn test_list_vehicles_row_shape(pool: PgPool) {
    create_vehicles(&pool, 1).await;
    let db = Database::new(pool);

    let result = db.query(LIST_VEHICLES_SQL, &[]).await.unwrap();
    let row = serde_json::to_value(&result.rows[0]).unwrap();

    assert_eq!(
        row,
        json!({
            "id": 1,
            "make": "Make 1",
            "model": "Model 1",
            "year": 2001,
            "price": "19999.50",
            "electric": false,
            "registered_at": "2023-11-14T22:13:21.000Z",
            "specs": {"seats": 1},
        })
    );
}

async fn get_json(db: Database, uri: &str) -> (StatusCode, Value) {
    let app = HttpServer::new(ServerConfig::default(), db).app();
    let response = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn select_one(db: &Database, sql: &str) -> String {
    let result = db.query(sql, &[]).await.expect("Failed to run select");
    serde_json::to_string(&result.rows[0]).unwrap()
}

#[ignore = "requires DATABASE_URL pointing at a Postgres server"]
#[sqlx::test(migrations = false)]
async fn test_list_vehicles_trailing_slash_and_query_string(pool: PgPool) {
    create_vehicles(&pool, 12).await;
    let db = Database::new(pool);

    for uri in ["/api/vehicles", "/api/vehicles/", "/api/vehicles?page=2&limit=50"] {
        let (status, body) = get_json(db.clone(), uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body.as_array().map(Vec::len), Some(10), "{uri}");
    }
}

#[ignore = "requires DATABASE_URL pointing at a Postgres server"]
#[sqlx::test(migrations = false)]
async fn test_array_columns(pool: PgPool) {
    let db = Database::new(pool);

    let json = select_one(
        &db,
        "SELECT ARRAY['a', NULL, 'b']::text[] AS tags,
                ARRAY[1, 2]::int4[] AS n,
                ARRAY[3000000000]::int8[] AS big,
                ARRAY[true, false] AS flags,
                ARRAY[1.5]::float8[] AS f8,
                ARRAY['67e55044-10b1-426f-9247-bb680e5fe0c8']::uuid[] AS ids,
                ARRAY[]::varchar[] AS empty",
    )
    .await;

    assert_eq!(
        json,
        r#"{"tags":["a",null,"b"],"n":[1,2],"big":[3000000000],"flags":[true,false],"f8":[1.5],"ids":["67e55044-10b1-426f-9247-bb680e5fe0c8"],"empty":[]}"#
    );
}

#[ignore = "requires DATABASE_URL pointing at a Postgres server"]
#[sqlx::test(migrations = false)]
async fn test_interval_column(pool: PgPool) {
    let db = Database::new(pool);

    let json = select_one(
        &db,
        "SELECT '1 day'::interval AS iv, '1 year 2 mons 03:04:05.5'::interval AS long",
    )
    .await;

    assert_eq!(
        json,
        r#"{"iv":{"days":1},"long":{"years":1,"months":2,"hours":3,"minutes":4,"seconds":5,"milliseconds":500.0}}"#
    );
}

#[ignore = "requires DATABASE_URL pointing at a Postgres server"]
#[sqlx::test(migrations = false)]
async fn test_inet_columns(pool: PgPool) {
    let db = Database::new(pool);

    let json = select_one(
        &db,
        "SELECT '10.0.0.1'::inet AS ip, '10.0.0.1/24'::inet AS masked,
                '10.0.0.0/8'::cidr AS net, '::1'::inet AS v6",
    )
    .await;

    assert_eq!(
        json,
        r#"{"ip":"10.0.0.1","masked":"10.0.0.1/24","net":"10.0.0.0/8","v6":"::1"}"#
    );
}

#[ignore = "requires DATABASE_URL pointing at a Postgres server"]
#[sqlx::test(migrations = false)]
async fn test_oid_and_char_columns(pool: PgPool) {
    let db = Database::new(pool);

    let json = select_one(&db, r#"SELECT 123::oid AS o, 'x'::"char" AS c, 'ab'::char(3) AS padded"#).await;

    assert_eq!(json, r#"{"o":123,"c":"x","padded":"ab "}"#);
}

#[ignore = "requires DATABASE_URL pointing at a Postgres server"]
#[sqlx::test(migrations = false)]
async fn test_float4_column(pool: PgPool) {
    let db = Database::new(pool);

    let json = select_one(&db, "SELECT 1.1::float4 AS f4, ARRAY[2.2]::float4[] AS f4s").await;

    assert_eq!(json, r#"{"f4":1.1,"f4s":[2.2]}"#);
}

#[ignore = "requires DATABASE_URL pointing at a Postgres server"]
#[sqlx::test(migrations = false)]
async fn test_null_params_match_column_types(pool: PgPool) {
    create_vehicles(&pool, 0).await;
    let db = Database::new(pool);

    let result = db
        .query(
            "INSERT INTO vehicles (make, model, year, price, electric)
             VALUES ('Saab', $1, $2, $3, false)
             RETURNING model, year, price",
            &[
                SqlParam::Null(SqlType::Text),
                SqlParam::Null(SqlType::Int),
                SqlParam::Null(SqlType::Float),
            ],
        )
        .await
        .expect("Failed to insert with null parameters");

    let row = &result.rows[0];
    assert_eq!(row.get("model"), Some(&ColumnValue::Null));
    assert_eq!(row.get("year"), Some(&ColumnValue::Null));
    assert_eq!(row.get("price"), Some(&ColumnValue::Null));

    let result = db
        .query(
            "SELECT make FROM vehicles WHERE year IS NOT DISTINCT FROM $1 AND electric = $2",
            &[SqlParam::Null(SqlType::Int), SqlParam::Bool(false)],
        )
        .await
        .expect("Failed to compare against null parameter");
    assert_eq!(result.row_count, 1);
}
