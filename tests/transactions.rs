mod common;

use std::time::Duration;

use rental_client::{
    config::TransactionOptions,
    engine::{Action, ModelName, Operation},
    error::ClientError,
    query::Where,
    schema::{CreateTeam, CreateUser, TeamWhereUnique},
};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn callback_commits_every_write() {
    let client = common::client().await;

    let team_id = client
        .transaction(None, |tx| {
            Box::pin(async move {
                let team = tx.team().create(CreateTeam::new("Acme", "acme")).await?;
                tx.user()
                    .create(CreateUser::new(team.id, "Ada", "ada@example.com", "x"))
                    .await?;
                Ok::<_, ClientError>(team.id)
            })
        })
        .await
        .unwrap();

    let team = client
        .team()
        .find_unique(TeamWhereUnique::Id(team_id))
        .await
        .unwrap();
    assert!(team.is_some());
    assert_eq!(client.user().count(Where::all()).await.unwrap(), 1);
}

#[tokio::test]
async fn failure_inside_callback_leaves_no_trace() {
    let client = common::client().await;

    let err = client
        .transaction(None, |tx| {
            Box::pin(async move {
                tx.team().create(CreateTeam::new("Acme", "acme")).await?;
                tx.team().create(CreateTeam::new("Acme copy", "acme")).await?;
                Ok::<_, ClientError>(())
            })
        })
        .await
        .unwrap_err();

    assert!(err.is_unique_violation());
    assert_eq!(client.team().count(Where::all()).await.unwrap(), 0);
}

#[tokio::test]
async fn slow_callback_times_out_and_rolls_back() {
    let client = common::client().await;
    let options = TransactionOptions::default().with_timeout(Duration::from_millis(50));

    let err = client
        .transaction(Some(options), |tx| {
            Box::pin(async move {
                tx.team().create(CreateTeam::new("Acme", "acme")).await?;
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok::<_, ClientError>(())
            })
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::TransactionTimeout { timeout_ms: 50 }));
    assert_eq!(err.code(), "TRANSACTION_TIMEOUT");
    assert_eq!(client.team().count(Where::all()).await.unwrap(), 0);
}

#[tokio::test]
async fn begin_gives_up_after_max_wait() {
    // The pool has one connection, so a second transaction cannot start while the
    // first holds it.
    let client = common::client().await;
    let inner = client.clone();
    let short = TransactionOptions::default().with_max_wait(Duration::from_millis(50));

    let err = client
        .transaction(None, move |_tx| {
            Box::pin(async move {
                inner
                    .transaction(Some(short), |_nested| Box::pin(async { Ok::<_, ClientError>(()) }))
                    .await
            })
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::TransactionStart { max_wait_ms: 50 }));
}

#[tokio::test]
async fn batch_runs_in_order_and_returns_each_result() {
    let client = common::client().await;
    let team_id = Uuid::new_v4();

    let results = client
        .batch(vec![
            Operation::new(
                ModelName::Team,
                Action::Create,
                json!({ "data": { "id": team_id, "name": "Acme", "slug": "acme" } }),
            ),
            Operation::new(
                ModelName::User,
                Action::Create,
                json!({ "data": {
                    "team_id": team_id,
                    "name": "Ada",
                    "email": "ada@example.com",
                    "password": "x"
                } }),
            ),
            Operation::new(ModelName::User, Action::Count, json!({})),
        ])
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["slug"], "acme");
    assert_eq!(results[1]["team_id"], json!(team_id));
    assert_eq!(results[2], json!(1));
}

#[tokio::test]
async fn failed_batch_rolls_back_earlier_operations() {
    let client = common::client().await;

    let err = client
        .batch(vec![
            Operation::new(
                ModelName::Team,
                Action::Create,
                json!({ "data": { "name": "Acme", "slug": "acme" } }),
            ),
            Operation::new(
                ModelName::Team,
                Action::Create,
                json!({ "data": { "name": "Again", "slug": "acme" } }),
            ),
        ])
        .await
        .unwrap_err();

    assert!(err.is_unique_violation());
    assert_eq!(client.team().count(Where::all()).await.unwrap(), 0);
}
