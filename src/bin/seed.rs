use axum_ticketing_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let pool = create_pool(&config.database_url).await?;
    seed_tiers(&pool).await?;
    seed_discount_codes(&pool).await?;

    println!("Seed completed.");
    Ok(())
}

async fn seed_tiers(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    // (name, slug, description, price in minor units, status, total, sold, sort)
    let tiers = vec![
        (
            "Alpha",
            "alpha",
            "The alpha release of the tickets: limited, cheapest, first to land.",
            200000i64,
            "SOLD_OUT",
            100,
            100,
            0,
        ),
        (
            "Beta",
            "beta",
            "The beta release: not first, not last, no regrets.",
            250000i64,
            "AVAILABLE",
            200,
            0,
            1,
        ),
        (
            "GA",
            "ga",
            "General availability: price and time reach maturity.",
            300000i64,
            "COMING_SOON",
            300,
            0,
            2,
        ),
    ];

    for (name, slug, description, price, status, total, sold, sort) in tiers {
        sqlx::query(
            r#"
            INSERT INTO ticket_tiers
                (id, name, slug, description, price, currency, status, total_quantity, sold_quantity, sort_order)
            VALUES ($1, $2, $3, $4, $5, 'USD', $6, $7, $8, $9)
            ON CONFLICT (slug) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(price)
        .bind(status)
        .bind(total)
        .bind(sold)
        .bind(sort)
        .execute(pool)
        .await?;
    }

    println!("Seeded ticket tiers");
    Ok(())
}

async fn seed_discount_codes(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let alpha_id: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM ticket_tiers WHERE slug = 'alpha'")
            .fetch_optional(pool)
            .await?;

    sqlx::query(
        r#"
        INSERT INTO discount_codes
            (id, code, description, discount_type, discount_value, max_uses, current_uses, ticket_tier_id, is_active)
        VALUES ($1, 'REPUBLIC26', 'Republic Day Special - 26% off Alpha tier', 'PERCENTAGE', 26, 100, 0, $2, TRUE)
        ON CONFLICT (code) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(alpha_id.map(|(id,)| id))
    .execute(pool)
    .await?;

    println!("Seeded discount codes");
    Ok(())
}
