//! Shared harness for the integration tests. Tests construct their own
//! tiers and codes with unique slugs, so suites can run concurrently
//! against the same database.
#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use axum_ticketing_api::{
    config::{AppConfig, PagueloFacilConfig},
    db::{create_orm_conn, create_pool, run_migrations},
    dto::orders::AttendeeInput,
    entity::{discount_codes, ticket_tiers},
    paguelofacil::PagueloFacilClient,
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set};
use tokio::sync::OnceCell;
use uuid::Uuid;

// Migrations run once per test binary; concurrent CREATE TABLE IF NOT
// EXISTS can trip over itself in Postgres.
static MIGRATIONS: OnceCell<()> = OnceCell::const_new();

/// Returns `None` (and skips the test) when no database is configured.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests."
            );
            return Ok(None);
        }
    };

    let orm = create_orm_conn(&database_url).await?;
    MIGRATIONS
        .get_or_try_init(|| async { run_migrations(&orm).await })
        .await?;
    let pool = create_pool(&database_url).await?;

    let paguelofacil = PagueloFacilConfig {
        cclw: None,
        return_url: None,
        base_url: "http://localhost:9".into(),
        timeout: Duration::from_secs(2),
        status_url: "/payments/status".into(),
    };
    let config = AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        reservation_window_minutes: 10,
        paguelofacil: paguelofacil.clone(),
    };
    let payments = PagueloFacilClient::new(paguelofacil)?;

    Ok(Some(AppState {
        pool,
        orm,
        config,
        payments,
    }))
}

pub fn unique_slug(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

pub fn unique_code(prefix: &str) -> String {
    format!("{prefix}{}", Uuid::new_v4().simple()).to_uppercase()
}

pub async fn seed_tier(
    state: &AppState,
    slug: &str,
    price: i64,
    status: &str,
    total_quantity: i32,
    sold_quantity: i32,
) -> anyhow::Result<ticket_tiers::Model> {
    let tier = ticket_tiers::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Tier {slug}")),
        slug: Set(slug.to_string()),
        description: Set(None),
        price: Set(price),
        currency: Set("USD".into()),
        status: Set(status.to_string()),
        total_quantity: Set(total_quantity),
        sold_quantity: Set(sold_quantity),
        sort_order: Set(0),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(tier)
}

pub async fn seed_code(
    state: &AppState,
    code: &str,
    discount_type: &str,
    discount_value: i64,
    max_uses: Option<i32>,
    ticket_tier_id: Option<Uuid>,
) -> anyhow::Result<discount_codes::Model> {
    let code = discount_codes::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code.to_string()),
        description: Set(None),
        discount_type: Set(discount_type.to_string()),
        discount_value: Set(discount_value),
        max_uses: Set(max_uses),
        current_uses: Set(0),
        valid_from: Set(None),
        valid_until: Set(None),
        ticket_tier_id: Set(ticket_tier_id),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(code)
}

pub fn attendee() -> AttendeeInput {
    AttendeeInput {
        name: "Ada Lovelace".into(),
        email: "ada@example.com".into(),
        country: "PA".into(),
        job_title: "Engineer".into(),
        company: "Analytical Engines".into(),
        industry: "Software".into(),
        org_type: "Company".into(),
        cncf_consent: true,
        whatsapp_updates: false,
    }
}

pub fn tickets(pairs: &[(&str, i32)]) -> HashMap<String, i32> {
    pairs
        .iter()
        .map(|(slug, qty)| (slug.to_string(), *qty))
        .collect()
}
