#![allow(dead_code)]

use chrono::Utc;
use rental_client::{
    client::Client,
    config::ClientConfig,
    entity::{categories, products, teams, users},
    schema::{CreateCategory, CreateProduct, CreateTeam, CreateUser},
};
use uuid::Uuid;

/// A migrated client over a private in-memory SQLite database.
pub async fn client() -> Client {
    client_with(ClientConfig::new("sqlite::memory:")).await
}

pub async fn client_with(config: ClientConfig) -> Client {
    // One connection: every pooled connection would otherwise get its own empty database.
    let client = Client::connect(config.with_max_connections(1))
        .await
        .expect("connect");
    client.migrate().await.expect("migrate");
    client
}

pub async fn team(client: &Client, slug: &str) -> teams::Model {
    client
        .team()
        .create(CreateTeam::new(format!("Team {slug}"), slug))
        .await
        .expect("create team")
}

pub async fn user(client: &Client, team_id: Uuid, email: &str) -> users::Model {
    client
        .user()
        .create(CreateUser::new(team_id, "Test User", email, "hashed"))
        .await
        .expect("create user")
}

pub async fn category(client: &Client, slug: &str) -> categories::Model {
    client
        .category()
        .create(CreateCategory::new(format!("Category {slug}"), slug))
        .await
        .expect("create category")
}

pub fn new_product(owner: Uuid, category: Uuid, slug: &str, price: i64, quantity: i32) -> CreateProduct {
    CreateProduct {
        id: None,
        user_id: owner,
        category_id: category,
        name: format!("Product {slug}"),
        slug: slug.to_string(),
        price,
        quantity,
        quantity_alert: 1,
        brand: "Acme".into(),
        description: "for tests".into(),
        specifications: String::new(),
        source: "test".into(),
        date_arrival: Utc::now().fixed_offset(),
        is_rentable: true,
        product_picture: None,
        created_at: None,
        updated_at: None,
    }
}

pub async fn product(
    client: &Client,
    owner: Uuid,
    category: Uuid,
    slug: &str,
    price: i64,
    quantity: i32,
) -> products::Model {
    client
        .product()
        .create(new_product(owner, category, slug, price, quantity))
        .await
        .expect("create product")
}

/// Team, user and category that most product tests hang off.
pub async fn catalog(client: &Client) -> (users::Model, categories::Model) {
    let team = team(client, "acme").await;
    let user = user(client, team.id, "owner@example.com").await;
    let category = category(client, "cameras").await;
    (user, category)
}
