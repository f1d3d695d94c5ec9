use sqlx::PgPool;

/// Connect, migrate, and verify the schema and seed data.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    clubhouse_db::health_check(&pool).await.unwrap();

    let tables = [
        "roles",
        "users",
        "user_sessions",
        "events",
        "coaches",
        "coach_slots",
        "bookings",
        "payments",
        "payment_webhook_events",
        "contact_messages",
    ];
    for table in tables {
        sqlx::query(&format!("SELECT 1 FROM {table} LIMIT 1"))
            .execute(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
    }

    let roles: Vec<String> = sqlx::query_scalar("SELECT name FROM roles ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(roles, vec!["admin", "member"]);
}

/// The seeded member role matches the ID new accounts are created with.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_default_role_is_member(pool: PgPool) {
    let name = clubhouse_db::repositories::RoleRepo::resolve_name(
        &pool,
        clubhouse_core::roles::DEFAULT_ROLE_ID,
    )
    .await
    .unwrap();
    assert_eq!(name, clubhouse_core::roles::ROLE_MEMBER);
}

/// Every mutable table carries the `updated_at` trigger.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_updated_at_triggers(pool: PgPool) {
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT event_object_table::TEXT FROM information_schema.triggers
         WHERE trigger_name = 'set_updated_at'
         ORDER BY event_object_table",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for expected in [
        "bookings",
        "coach_slots",
        "coaches",
        "contact_messages",
        "events",
        "payments",
        "users",
    ] {
        assert!(
            tables.iter().any(|t| t == expected),
            "{expected} is missing the set_updated_at trigger"
        );
    }
}
