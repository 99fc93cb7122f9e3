use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use rental_client::{
    client::Client,
    config::AppConfig,
    logging::init_tracing,
    middleware::auth::issue_token,
    schema::{
        CartWhereUnique, CategoryWhereUnique, CreateCart, CreateCategory, CreateProduct,
        CreateTeam, CreateUser, ProductWhereUnique, TeamWhereUnique, UpdateCart, UpdateCategory,
        UpdateProduct, UpdateTeam, UpdateUser, UserWhereUnique,
    },
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let config = AppConfig::from_env()?;

    let client = Client::connect(config.client.clone()).await?;
    // Ensure migrations are applied.
    client.migrate().await?;

    let team_id = ensure_team(&client, "Rental HQ", "rental-hq").await?;
    let user_id = ensure_user(&client, team_id, "Demo User", "user@example.com", "user123").await?;
    seed_catalog(&client, user_id).await?;

    let token = issue_token(user_id, &config.jwt_secret, Duration::hours(24))?;
    client.disconnect().await?;

    println!("Seed completed. Team ID: {team_id}, User ID: {user_id}");
    println!("Dev token: Bearer {token}");
    Ok(())
}

async fn ensure_team(client: &Client, name: &str, slug: &str) -> anyhow::Result<Uuid> {
    let team = client
        .team()
        .upsert(
            TeamWhereUnique::Slug(slug.to_string()),
            CreateTeam::new(name, slug),
            UpdateTeam::default(),
        )
        .await?;
    println!("Ensured team {slug}");
    Ok(team.id)
}

async fn ensure_user(
    client: &Client,
    team_id: Uuid,
    name: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let user = client
        .user()
        .upsert(
            UserWhereUnique::Email(email.to_string()),
            CreateUser::new(team_id, name, email, password_hash.clone()),
            UpdateUser {
                password: Some(password_hash),
                ..Default::default()
            },
        )
        .await?;

    client
        .cart()
        .upsert(
            CartWhereUnique::UserId(user.id),
            CreateCart::for_user(user.id),
            UpdateCart::default(),
        )
        .await?;

    println!("Ensured user {email} with an empty cart");
    Ok(user.id)
}

async fn seed_catalog(client: &Client, owner_id: Uuid) -> anyhow::Result<()> {
    let category = client
        .category()
        .upsert(
            CategoryWhereUnique::Slug("cameras".into()),
            CreateCategory::new("Cameras", "cameras"),
            UpdateCategory::default(),
        )
        .await?;

    let products = [
        ("Mirrorless Body", "mirrorless-body", 250_000, 5),
        ("Prime Lens 50mm", "prime-lens-50", 90_000, 8),
        ("Tripod", "tripod", 40_000, 12),
    ];

    for (name, slug, price, quantity) in products {
        client
            .product()
            .upsert(
                ProductWhereUnique::Slug(slug.to_string()),
                CreateProduct {
                    id: None,
                    user_id: owner_id,
                    category_id: category.id,
                    name: name.to_string(),
                    slug: slug.to_string(),
                    price,
                    quantity,
                    quantity_alert: 2,
                    brand: "Generic".to_string(),
                    description: format!("{name} available for rent"),
                    specifications: String::new(),
                    source: "seed".to_string(),
                    date_arrival: Utc::now().fixed_offset(),
                    is_rentable: true,
                    product_picture: None,
                    created_at: None,
                    updated_at: None,
                },
                UpdateProduct::default(),
            )
            .await?;
        println!("Ensured product {slug}");
    }
    Ok(())
}
