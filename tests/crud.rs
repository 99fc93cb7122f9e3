mod common;

use chrono::{Duration, Utc};
use rental_client::{
    error::ClientError,
    engine::{Action, ModelName, Operation},
    entity::{OrderStatus, Orders, PaymentStatus, Products, products, users},
    query::{FindManyArgs, Filter, NumberUpdate, OrderBy, Where},
    schema::{
        CartOnItemWhereUnique, CartWhereUnique, CreateCart, CreateCartOnItem, CreateOrder,
        CreateOrderOnProduct, CreateRent, CreateTeam, CreateUser, OrderOnProductWhereUnique,
        OrderWhereUnique, ProductWhereUnique, RentWhereUnique, TeamWhereUnique, UpdateProduct,
        UpdateTeam, UpdateUser, UserWhereUnique,
    },
};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn create_then_find_by_each_unique_key() {
    let client = common::client().await;
    let team = common::team(&client, "acme").await;
    let created = common::user(&client, team.id, "ada@example.com").await;

    let by_id = client
        .user()
        .find_unique(UserWhereUnique::Id(created.id))
        .await
        .unwrap();
    assert_eq!(by_id.as_ref(), Some(&created));

    let by_email = client
        .user()
        .find_unique(UserWhereUnique::Email("ada@example.com".into()))
        .await
        .unwrap();
    assert_eq!(by_email.map(|u| u.id), Some(created.id));
    assert_eq!(created.profile_picture, None);
}

#[tokio::test]
async fn find_unique_or_throw_reports_the_model() {
    let client = common::client().await;
    let err = client
        .team()
        .find_unique_or_throw(TeamWhereUnique::Id(Uuid::new_v4()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::NotFound {
            model: Some(ModelName::Team),
            ..
        }
    ));
    assert!(
        client
            .team()
            .find_unique(TeamWhereUnique::Slug("nope".into()))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn update_never_creates() {
    let client = common::client().await;
    let err = client
        .team()
        .update(
            TeamWhereUnique::Slug("ghost".into()),
            UpdateTeam {
                name: Some("Ghost".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(client.team().count(Where::all()).await.unwrap(), 0);
}

#[tokio::test]
async fn update_changes_fields_and_refreshes_updated_at() {
    let client = common::client().await;
    let team = common::team(&client, "acme").await;
    let user = common::user(&client, team.id, "ada@example.com").await;

    let updated = client
        .user()
        .update(
            UserWhereUnique::Email("ada@example.com".into()),
            UpdateUser {
                name: Some("Ada Lovelace".into()),
                profile_picture: Some(Some("ada.png".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.id, user.id);
    assert_eq!(updated.name, "Ada Lovelace");
    assert_eq!(updated.profile_picture.as_deref(), Some("ada.png"));
    assert!(updated.updated_at >= user.updated_at);

    let cleared = client
        .user()
        .update(
            UserWhereUnique::Id(user.id),
            UpdateUser {
                profile_picture: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.profile_picture, None);
    assert_eq!(cleared.name, "Ada Lovelace");
}

#[tokio::test]
async fn numeric_updates_apply_atomically() {
    let client = common::client().await;
    let (owner, category) = common::catalog(&client).await;
    common::product(&client, owner.id, category.id, "lens", 100, 10).await;

    let product = client
        .product()
        .update(
            ProductWhereUnique::Slug("lens".into()),
            UpdateProduct {
                quantity: Some(NumberUpdate::Decrement(3)),
                price: Some(NumberUpdate::Multiply(2)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(product.quantity, 7);
    assert_eq!(product.price, 200);
}

#[tokio::test]
async fn upsert_creates_once_then_updates() {
    let client = common::client().await;

    for name in ["First", "Second"] {
        client
            .team()
            .upsert(
                TeamWhereUnique::Slug("acme".into()),
                CreateTeam::new(name, "acme"),
                UpdateTeam {
                    name: Some(name.into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let teams = client.team().find_many(FindManyArgs::new()).await.unwrap();
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].name, "Second");
}

#[tokio::test]
async fn unique_constraints_are_reported_per_model() {
    let client = common::client().await;
    let team = common::team(&client, "acme").await;
    let user = common::user(&client, team.id, "ada@example.com").await;

    let dup_email = client
        .user()
        .create(CreateUser::new(team.id, "Other", "ada@example.com", "x"))
        .await
        .unwrap_err();
    assert!(matches!(
        dup_email,
        ClientError::UniqueConstraintViolation {
            model: Some(ModelName::User),
            ..
        }
    ));

    let dup_slug = client
        .team()
        .create(CreateTeam::new("Copy", "acme"))
        .await
        .unwrap_err();
    assert!(dup_slug.is_unique_violation());

    let category = common::category(&client, "cameras").await;
    let product = common::product(&client, user.id, category.id, "lens", 100, 1).await;
    let dup_product = client
        .product()
        .create(common::new_product(user.id, category.id, "lens", 50, 1))
        .await
        .unwrap_err();
    assert!(dup_product.is_unique_violation());

    let cart = client.cart().create(CreateCart::for_user(user.id)).await.unwrap();
    client
        .cart_on_item()
        .create(CreateCartOnItem::new(cart.id, product.id, 1))
        .await
        .unwrap();
    let dup_item = client
        .cart_on_item()
        .create(CreateCartOnItem::new(cart.id, product.id, 2))
        .await
        .unwrap_err();
    assert!(dup_item.is_unique_violation());

    let item = client
        .cart_on_item()
        .find_unique(CartOnItemWhereUnique::CartIdProductId {
            cart_id: cart.id,
            product_id: product.id,
        })
        .await
        .unwrap()
        .expect("item by composite key");
    assert_eq!(item.quantity, 1);
}

#[tokio::test]
async fn foreign_keys_are_enforced() {
    let client = common::client().await;
    let err = client
        .user()
        .create(CreateUser::new(Uuid::new_v4(), "Orphan", "orphan@example.com", "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::ForeignKeyViolation { .. }));
}

#[tokio::test]
async fn delete_returns_the_row_and_then_reports_not_found() {
    let client = common::client().await;
    let team = common::team(&client, "acme").await;
    let user = common::user(&client, team.id, "ada@example.com").await;
    client.cart().create(CreateCart::for_user(user.id)).await.unwrap();

    let deleted = client
        .cart()
        .delete(CartWhereUnique::UserId(user.id))
        .await
        .unwrap();
    assert_eq!(deleted.user_id, user.id);

    let again = client
        .cart()
        .delete(CartWhereUnique::UserId(user.id))
        .await
        .unwrap_err();
    assert!(again.is_not_found());
}

#[tokio::test]
async fn batch_updates_and_deletes_count_matched_rows() {
    let client = common::client().await;
    let (owner, category) = common::catalog(&client).await;
    for (i, slug) in ["a", "b", "c", "d"].into_iter().enumerate() {
        common::product(&client, owner.id, category.id, slug, (i as i64 + 1) * 100, 5).await;
    }

    let expensive = Where::field(products::Column::Price, Filter::Gte(300i64.into()));
    let updated = client
        .product()
        .update_many(
            expensive.clone(),
            UpdateProduct {
                is_rentable: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.count, 2);

    let rentable = client
        .product()
        .count(Where::eq(products::Column::IsRentable, true))
        .await
        .unwrap();
    assert_eq!(rentable, 2);

    let removed = client.product().delete_many(expensive).await.unwrap();
    assert_eq!(removed.count, 2);
    assert_eq!(client.product().count(Where::all()).await.unwrap(), 2);

    let none = client
        .product()
        .delete_many(Where::field(products::Column::Slug, Filter::In(Vec::new())))
        .await
        .unwrap();
    assert_eq!(none.count, 0);
}

#[tokio::test]
async fn find_many_orders_and_paginates() {
    let client = common::client().await;
    let (owner, category) = common::catalog(&client).await;
    for (i, slug) in ["p1", "p2", "p3", "p4", "p5"].into_iter().enumerate() {
        common::product(&client, owner.id, category.id, slug, (i as i64 + 1) * 10, 1).await;
    }
    let prices = |rows: Vec<products::Model>| rows.into_iter().map(|p| p.price).collect::<Vec<_>>();

    let page = client
        .product()
        .find_many(
            FindManyArgs::new()
                .order_by(OrderBy::desc(products::Column::Price))
                .skip(1)
                .take(2),
        )
        .await
        .unwrap();
    assert_eq!(prices(page), [40, 30]);

    let tail = client
        .product()
        .find_many(
            FindManyArgs::new()
                .order_by(OrderBy::asc(products::Column::Price))
                .take(-2),
        )
        .await
        .unwrap();
    assert_eq!(prices(tail), [40, 50]);

    let after_cursor = client
        .product()
        .find_many(
            FindManyArgs::new()
                .order_by(OrderBy::asc(products::Column::Price))
                .cursor(ProductWhereUnique::Slug("p2".into()))
                .skip(1)
                .take(2),
        )
        .await
        .unwrap();
    assert_eq!(prices(after_cursor), [30, 40]);

    let first = client
        .product()
        .find_first(
            FindManyArgs::new()
                .filter(Where::field(products::Column::Slug, Filter::StartsWith("p".into())))
                .order_by(OrderBy::desc(products::Column::Price)),
        )
        .await
        .unwrap();
    assert_eq!(first.map(|p| p.slug), Some("p5".to_string()));
}

#[tokio::test]
async fn distinct_keeps_the_first_row_per_value() {
    let client = common::client().await;
    let team = common::team(&client, "acme").await;
    for email in ["a@example.com", "b@example.com", "c@example.com"] {
        common::user(&client, team.id, email).await;
    }

    let names = client
        .user()
        .find_many(FindManyArgs::new().distinct([users::Column::Name]))
        .await
        .unwrap();
    assert_eq!(names.len(), 1);
}

#[tokio::test]
async fn create_many_can_skip_duplicates() {
    let client = common::client().await;

    let err = client
        .team()
        .create_many(
            vec![CreateTeam::new("A", "a"), CreateTeam::new("A again", "a")],
            false,
        )
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());
    assert_eq!(client.team().count(Where::all()).await.unwrap(), 0);

    let payload = client
        .team()
        .create_many(
            vec![
                CreateTeam::new("A", "a"),
                CreateTeam::new("A again", "a"),
                CreateTeam::new("B", "b"),
            ],
            true,
        )
        .await
        .unwrap();
    assert_eq!(payload.count, 2);
    assert_eq!(client.team().count(Where::all()).await.unwrap(), 2);
}

#[tokio::test]
async fn rents_orders_and_order_lines() {
    let client = common::client().await;
    let (owner, category) = common::catalog(&client).await;
    let camera = common::product(&client, owner.id, category.id, "camera", 500, 3).await;

    let rent = client
        .rent()
        .create(CreateRent {
            id: None,
            user_id: owner.id,
            identification: "ID-1".into(),
            phone: "555-0100".into(),
            notes: None,
            identification_picture: "id.png".into(),
            documentation_before: None,
            documentation_after: None,
        })
        .await
        .unwrap();
    let found = client.rent().find_unique(RentWhereUnique::Id(rent.id)).await.unwrap();
    assert_eq!(found.as_ref(), Some(&rent));

    let start = Utc::now().fixed_offset();
    let new_order = |rent_id| CreateOrder {
        id: None,
        rent_id,
        invoice: "INV-1".into(),
        order_date: None,
        start_date: start,
        end_date: start + Duration::days(2),
        total_cost: 1000,
        order_status: Default::default(),
        payment_status: Default::default(),
    };
    let order = client.order().create(new_order(rent.id)).await.unwrap();
    assert_eq!(order.order_status, OrderStatus::Waiting);
    assert_eq!(order.payment_status, PaymentStatus::Unpaid);
    let by_rent = client
        .order()
        .find_unique_or_throw(OrderWhereUnique::RentId(rent.id))
        .await
        .unwrap();
    assert_eq!(by_rent.id, order.id);

    let second = client.order().create(new_order(rent.id)).await.unwrap_err();
    assert!(matches!(
        second,
        ClientError::UniqueConstraintViolation {
            model: Some(ModelName::Order),
            ..
        }
    ));

    let line = client
        .order_on_product()
        .create(CreateOrderOnProduct {
            id: None,
            order_id: order.id,
            product_id: camera.id,
            quantity: 2,
            price: 500,
        })
        .await
        .unwrap();
    let stored = client
        .order_on_product()
        .find_unique(OrderOnProductWhereUnique::Id(line.id))
        .await
        .unwrap();
    assert_eq!(stored.map(|l| (l.order_id, l.quantity)), Some((order.id, 2)));

    let waiting = client
        .execute(Operation::new(
            ModelName::Order,
            Action::FindMany,
            json!({ "where": { "order_status": "WAITING" } }),
        ))
        .await
        .unwrap();
    assert_eq!(waiting.as_array().map(Vec::len), Some(1));
    let approved = client
        .execute(Operation::new(
            ModelName::Order,
            Action::Count,
            json!({ "where": { "order_status": { "in": ["APPROVED", "ONRENT"] } } }),
        ))
        .await
        .unwrap();
    assert_eq!(approved, json!(0));

    let ordered = client
        .delegate::<Orders>()
        .find_related::<Products>(&order, FindManyArgs::new())
        .await
        .unwrap();
    assert_eq!(ordered.iter().map(|p| p.id).collect::<Vec<_>>(), [camera.id]);
    let orders_of_camera = client
        .delegate::<Products>()
        .find_related::<Orders>(&camera, FindManyArgs::new())
        .await
        .unwrap();
    assert_eq!(orders_of_camera.iter().map(|o| o.id).collect::<Vec<_>>(), [order.id]);

    let with_lines = client
        .execute(Operation::new(
            ModelName::Order,
            Action::FindUnique,
            json!({ "where": { "id": order.id }, "include": { "product": true, "rent": true } }),
        ))
        .await
        .unwrap();
    assert_eq!(with_lines["rent"]["id"], json!(rent.id));
    assert_eq!(with_lines["product"][0]["product_id"], json!(camera.id));

    let camera_orders = client
        .execute(Operation::new(
            ModelName::Product,
            Action::FindUnique,
            json!({ "where": { "id": camera.id }, "include": { "order": true } }),
        ))
        .await
        .unwrap();
    assert_eq!(camera_orders["order"][0]["order_id"], json!(order.id));
}
