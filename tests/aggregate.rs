mod common;

use rental_client::{
    entity::products::Column,
    error::ClientError,
    query::{
        AggregateArgs, AggregateSelection, CountArgs, Filter, GroupByArgs, Metric, SortOrder,
        Where,
    },
};
use serde_json::json;

async fn seeded() -> (rental_client::Client, uuid::Uuid, uuid::Uuid) {
    let client = common::client().await;
    let (owner, cameras) = common::catalog(&client).await;
    let lights = common::category(&client, "lights").await;
    common::product(&client, owner.id, cameras.id, "body", 100, 2).await;
    common::product(&client, owner.id, cameras.id, "lens", 300, 4).await;
    common::product(&client, owner.id, lights.id, "panel", 50, 10).await;
    (client, cameras.id, lights.id)
}

#[tokio::test]
async fn aggregate_over_filtered_rows() {
    let (client, cameras, _) = seeded().await;

    let result = client
        .product()
        .aggregate(
            AggregateArgs::new(
                AggregateSelection::default()
                    .count_all()
                    .avg(Column::Price)
                    .sum(Column::Quantity)
                    .min(Column::Price)
                    .max(Column::Slug),
            )
            .filter(Where::eq(Column::CategoryId, cameras)),
        )
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({
            "_count": { "_all": 2 },
            "_avg": { "price": 200.0 },
            "_sum": { "quantity": 6 },
            "_min": { "price": 100 },
            "_max": { "slug": "lens" }
        })
    );
}

#[tokio::test]
async fn aggregate_of_nothing_is_null() {
    let client = common::client().await;
    let result = client
        .product()
        .aggregate(AggregateArgs::new(
            AggregateSelection::default().count_all().sum(Column::Price),
        ))
        .await
        .unwrap();

    assert_eq!(result.count.unwrap()["_all"], 0);
    assert_eq!(result.sum.unwrap()["price"], serde_json::Value::Null);
}

#[tokio::test]
async fn avg_of_text_field_is_rejected() {
    let (client, _, _) = seeded().await;
    let err = client
        .product()
        .aggregate(AggregateArgs::new(
            AggregateSelection::default().avg(Column::Name),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
}

#[tokio::test]
async fn count_with_field_selection() {
    let (client, _, _) = seeded().await;
    let counts = client
        .product()
        .count_fields(CountArgs::new([Column::ProductPicture, Column::Slug]))
        .await
        .unwrap();

    assert_eq!(counts["_all"], 3);
    assert_eq!(counts["slug"], 3);
    assert_eq!(counts["product_picture"], 0);
}

#[tokio::test]
async fn group_by_with_having_and_ordering() {
    let (client, cameras, lights) = seeded().await;

    let groups = client
        .product()
        .group_by(
            GroupByArgs::new([Column::CategoryId])
                .select(AggregateSelection::default().count_all().sum(Column::Price))
                .order_by(Metric::Sum(Column::Price), SortOrder::Desc),
        )
        .await
        .unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].fields["category_id"], json!(cameras));
    assert_eq!(groups[0].aggregates.sum.as_ref().unwrap()["price"], 400);
    assert_eq!(groups[1].fields["category_id"], json!(lights));

    let big = client
        .product()
        .group_by(
            GroupByArgs::new([Column::CategoryId])
                .select(AggregateSelection::default().count_all())
                .having(Metric::CountAll, Filter::Gt(1i64.into())),
        )
        .await
        .unwrap();
    assert_eq!(big.len(), 1);
    assert_eq!(
        serde_json::to_value(&big[0]).unwrap(),
        json!({ "category_id": cameras, "_count": { "_all": 2 } })
    );
}

#[tokio::test]
async fn group_by_rejects_fields_outside_by() {
    let (client, _, _) = seeded().await;
    let err = client
        .product()
        .group_by(
            GroupByArgs::new([Column::CategoryId])
                .order_by(Metric::Field(Column::Price), SortOrder::Asc),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    let empty = client
        .product()
        .group_by(GroupByArgs::new([]))
        .await
        .unwrap_err();
    assert!(matches!(empty, ClientError::Validation(_)));
}
