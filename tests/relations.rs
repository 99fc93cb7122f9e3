mod common;

use rental_client::{
    entity::{CartOnItems, Carts, Products, Teams, Users, cart_on_items, carts, products, users},
    query::{Filter, FindManyArgs, OrderBy, Where},
    schema::{CreateCart, CreateCartOnItem, TeamWhereUnique, UserWhereUnique},
};

#[tokio::test]
async fn team_to_user_to_cart() {
    let client = common::client().await;
    let team = common::team(&client, "acme").await;
    let ada = common::user(&client, team.id, "ada@example.com").await;
    common::user(&client, team.id, "bob@example.com").await;
    let cart = client.cart().create(CreateCart::for_user(ada.id)).await.unwrap();

    let team = client
        .team()
        .find_unique_or_throw(TeamWhereUnique::Slug("acme".into()))
        .await
        .unwrap();
    let members = client
        .delegate::<Teams>()
        .find_related::<Users>(
            &team,
            FindManyArgs::new().order_by(OrderBy::asc(users::Column::Email)),
        )
        .await
        .unwrap();
    let emails: Vec<_> = members.iter().map(|u| u.email.as_str()).collect();
    assert_eq!(emails, ["ada@example.com", "bob@example.com"]);

    let ada_cart = client
        .delegate::<Users>()
        .find_related_first::<Carts>(&members[0])
        .await
        .unwrap();
    assert_eq!(ada_cart.map(|c| c.id), Some(cart.id));

    let bob_cart = client
        .delegate::<Users>()
        .find_related_first::<Carts>(&members[1])
        .await
        .unwrap();
    assert!(bob_cart.is_none());

    let second = client
        .cart()
        .create(CreateCart::for_user(ada.id))
        .await
        .unwrap_err();
    assert!(second.is_unique_violation());
}

#[tokio::test]
async fn related_reads_accept_filters() {
    let client = common::client().await;
    let (owner, category) = common::catalog(&client).await;
    let cart = client.cart().create(CreateCart::for_user(owner.id)).await.unwrap();
    for (slug, qty) in [("a", 1), ("b", 3), ("c", 5)] {
        let product = common::product(&client, owner.id, category.id, slug, 10, 10).await;
        client
            .cart_on_item()
            .create(CreateCartOnItem::new(cart.id, product.id, qty))
            .await
            .unwrap();
    }

    let items = client
        .delegate::<Carts>()
        .find_related::<CartOnItems>(
            &cart,
            FindManyArgs::new()
                .filter(Where::field(
                    cart_on_items::Column::Quantity,
                    Filter::Gte(3.into()),
                ))
                .order_by(OrderBy::desc(cart_on_items::Column::Quantity)),
        )
        .await
        .unwrap();
    let quantities: Vec<i32> = items.iter().map(|i| i.quantity).collect();
    assert_eq!(quantities, [5, 3]);

    let in_cart = client
        .delegate::<Carts>()
        .find_related::<Products>(
            &cart,
            FindManyArgs::new().order_by(OrderBy::desc(products::Column::Slug)),
        )
        .await
        .unwrap();
    let slugs: Vec<_> = in_cart.iter().map(|p| p.slug.as_str()).collect();
    assert_eq!(slugs, ["c", "b", "a"]);

    let user = client
        .user()
        .find_unique_or_throw(UserWhereUnique::Id(owner.id))
        .await
        .unwrap();
    let carts = client
        .cart()
        .find_many(FindManyArgs::new().filter(Where::eq(carts::Column::UserId, user.id)))
        .await
        .unwrap();
    assert_eq!(carts.len(), 1);
}
