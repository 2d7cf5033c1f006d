mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ActiveValue};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{buyer_fields, seed_product, ProductSpec, TestHarness};
use pix_checkout_api::{
    entities::{order::OrderStatus, product},
    errors::ServiceError,
    gateway::pix::PixClient,
};

async fn harness_for(server: &MockServer) -> TestHarness {
    let gateway = Arc::new(PixClient::new(
        server.uri(),
        "test-key",
        Duration::from_secs(2),
    ));
    TestHarness::new(gateway).await
}

fn mount_charge_creation(server: &MockServer) -> Mock {
    Mock::given(method("POST"))
        .and(path("/charges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "ch_abc",
            "status": "PENDING",
            "qr_code": {"text": "00020126...", "image": "data:image/png;base64,AAA"},
            "txid": "tx_100"
        })))
}

#[tokio::test]
async fn checkout_with_bump_freezes_combined_total() {
    let server = MockServer::start().await;
    mount_charge_creation(&server).mount(&server).await;
    // The watch keeps asking; the charge never resolves here.
    Mock::given(method("GET"))
        .and(path("/charges/tx_100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "PENDING"})))
        .mount(&server)
        .await;

    let harness = harness_for(&server).await;
    let bump = seed_product(
        &harness.db,
        ProductSpec {
            name: "Bônus",
            slug: "bonus",
            price: dec!(20.00),
            ..Default::default()
        },
    )
    .await;
    seed_product(
        &harness.db,
        ProductSpec {
            order_bump_product_id: Some(bump.id),
            ..Default::default()
        },
    )
    .await;

    let submission = harness
        .checkout
        .submit_checkout("curso-completo", buyer_fields(), true)
        .await
        .expect("checkout should succeed");

    assert_eq!(submission.transaction_id, "tx_100");
    assert_eq!(submission.qr_text, "00020126...");

    let order = harness
        .orders
        .get_order(submission.order_id)
        .await
        .unwrap()
        .expect("order persisted");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.amount, dec!(120.00));
    assert!(order.includes_order_bump);
    assert!(!order.upsell_accepted);
    assert_eq!(order.transaction_id, "tx_100");

    let (all, total) = harness.orders.list_orders(1, 10).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(all.len(), 1);

    harness.checkout.cancel_payment_watch(submission.order_id);
}

#[tokio::test]
async fn declined_bump_charges_base_price_only() {
    let server = MockServer::start().await;
    mount_charge_creation(&server).mount(&server).await;
    Mock::given(method("GET"))
        .and(path("/charges/tx_100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "PENDING"})))
        .mount(&server)
        .await;

    let harness = harness_for(&server).await;
    let bump = seed_product(
        &harness.db,
        ProductSpec {
            name: "Bônus",
            slug: "bonus",
            price: dec!(20.00),
            ..Default::default()
        },
    )
    .await;
    seed_product(
        &harness.db,
        ProductSpec {
            order_bump_product_id: Some(bump.id),
            ..Default::default()
        },
    )
    .await;

    let submission = harness
        .checkout
        .submit_checkout("curso-completo", buyer_fields(), false)
        .await
        .unwrap();

    let order = harness
        .orders
        .get_order(submission.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.amount, dec!(100.00));
    assert!(!order.includes_order_bump);

    harness.checkout.cancel_payment_watch(submission.order_id);
}

#[tokio::test]
async fn gateway_failure_persists_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/charges"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let harness = harness_for(&server).await;
    seed_product(&harness.db, ProductSpec::default()).await;

    let err = harness
        .checkout
        .submit_checkout("curso-completo", buyer_fields(), false)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::GatewayUnavailable(_));
    assert!(err.is_retryable());

    let (orders, total) = harness.orders.list_orders(1, 10).await.unwrap();
    assert_eq!(total, 0);
    assert!(orders.is_empty());
}

#[tokio::test]
async fn missing_required_fields_reject_before_any_charge() {
    let server = MockServer::start().await;
    let harness = harness_for(&server).await;
    seed_product(
        &harness.db,
        ProductSpec {
            required_fields: vec!["nome", "email", "cpf"],
            ..Default::default()
        },
    )
    .await;

    let mut fields = buyer_fields();
    fields.remove("nome");
    fields.remove("cpf");

    let err = harness
        .checkout
        .submit_checkout("curso-completo", fields, false)
        .await
        .unwrap_err();

    match err {
        ServiceError::MissingRequiredFields(missing) => {
            assert!(missing.contains(&"nome".to_string()));
            assert!(missing.contains(&"cpf".to_string()));
        }
        other => panic!("expected field errors, got {other:?}"),
    }

    // Nothing reached the provider or storage.
    assert!(server.received_requests().await.unwrap().is_empty());
    let (_, total) = harness.orders.list_orders(1, 10).await.unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn inactive_product_is_not_purchasable() {
    let server = MockServer::start().await;
    let harness = harness_for(&server).await;
    seed_product(
        &harness.db,
        ProductSpec {
            is_active: false,
            ..Default::default()
        },
    )
    .await;

    let err = harness
        .checkout
        .submit_checkout("curso-completo", buyer_fields(), false)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn paid_charge_drives_order_to_paid() {
    let server = MockServer::start().await;
    mount_charge_creation(&server).mount(&server).await;
    Mock::given(method("GET"))
        .and(path("/charges/tx_100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "PAID"})))
        .mount(&server)
        .await;

    let harness = harness_for(&server).await;
    let upsell = seed_product(
        &harness.db,
        ProductSpec {
            name: "Mentoria",
            slug: "mentoria",
            price: dec!(297.00),
            ..Default::default()
        },
    )
    .await;
    seed_product(
        &harness.db,
        ProductSpec {
            upsell_product_id: Some(upsell.id),
            ..Default::default()
        },
    )
    .await;

    let submission = harness
        .checkout
        .submit_checkout("curso-completo", buyer_fields(), false)
        .await
        .unwrap();

    let status = wait_for_status(&harness, submission.order_id, OrderStatus::Paid).await;
    assert_eq!(status, OrderStatus::Paid);

    let view = harness
        .checkout
        .get_order_status(submission.order_id)
        .await
        .unwrap();
    assert_eq!(view.status, OrderStatus::Paid);
    let delivery = view.delivery.expect("paid order exposes delivery");
    assert_eq!(delivery.payload.as_deref(), Some("https://example.com/members"));
    let offer = view.upsell.expect("pending upsell offer");
    assert_eq!(offer.product_id, upsell.id);
    assert_eq!(offer.price, dec!(297.00));

    // Accepting the upsell removes the offer from the status view.
    harness.checkout.accept_upsell(submission.order_id).await.unwrap();
    let view = harness
        .checkout
        .get_order_status(submission.order_id)
        .await
        .unwrap();
    assert!(view.upsell.is_none());
}

#[tokio::test]
async fn later_price_change_leaves_order_amount_untouched() {
    let server = MockServer::start().await;
    mount_charge_creation(&server).mount(&server).await;
    Mock::given(method("GET"))
        .and(path("/charges/tx_100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "PENDING"})))
        .mount(&server)
        .await;

    let harness = harness_for(&server).await;
    let prod = seed_product(&harness.db, ProductSpec::default()).await;

    let submission = harness
        .checkout
        .submit_checkout("curso-completo", buyer_fields(), false)
        .await
        .unwrap();

    let mut active: product::ActiveModel = prod.into();
    active.price = ActiveValue::Set(dec!(250.00));
    active.update(&*harness.db).await.unwrap();

    let order = harness
        .orders
        .get_order(submission.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.amount, dec!(100.00));

    harness.checkout.cancel_payment_watch(submission.order_id);
}

async fn wait_for_status(
    harness: &TestHarness,
    order_id: uuid::Uuid,
    expected: OrderStatus,
) -> OrderStatus {
    for _ in 0..100 {
        let order = harness.orders.get_order(order_id).await.unwrap().unwrap();
        if order.status == expected {
            return order.status;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    harness
        .orders
        .get_order(order_id)
        .await
        .unwrap()
        .unwrap()
        .status
}
