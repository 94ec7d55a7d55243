use super::*;
use price_tracer::models::ProductKey;
use price_tracer::{AlertOutcome, CheckOutcome};

const URL: &str = "https://shop.example/item/1";

async fn check_once(engine: &TestEngine, owner: ChatId) -> CheckOutcome {
    let snapshot = engine
        .registry
        .get(&ProductKey::new(owner, URL))
        .await
        .expect("product is tracked");
    engine
        .product_manager
        .check_product(&snapshot, &CancellationToken::new())
        .await
}

#[tokio::test]
async fn test_add_and_list_round_trip() {
    let engine = create_test_engine();
    engine.product_manager.add_product(URL, Decimal::new(149999, 2), 1).await;
    engine
        .product_manager
        .add_product("https://shop.example/item/2", Decimal::from(10), 2)
        .await;

    let listed = engine.product_manager.list_products(1).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].url, URL);
    assert_eq!(listed[0].target_price, Decimal::new(149999, 2));
    assert_eq!(listed[0].last_observed_price, None);
}

#[tokio::test]
async fn test_readd_resets_observation_and_replaces_target() {
    let engine = create_test_engine();
    engine.product_manager.add_product(URL, Decimal::from(100), 1).await;
    engine.fetcher.set_price(URL, 120);
    check_once(&engine, 1).await;

    engine.product_manager.add_product(URL, Decimal::from(80), 1).await;

    let listed = engine.product_manager.list_products(1).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].target_price, Decimal::from(80));
    assert_eq!(listed[0].last_observed_price, None);
}

#[tokio::test]
async fn test_price_sequence_alerts_exactly_once() {
    let engine = create_test_engine();
    engine.product_manager.add_product(URL, Decimal::from(100), 7).await;

    // First observation only sets the baseline, even below target
    engine.fetcher.set_price(URL, 120);
    assert_eq!(
        check_once(&engine, 7).await,
        CheckOutcome::Updated {
            price: Decimal::from(120),
            alert: AlertOutcome::NotTriggered
        }
    );

    engine.fetcher.set_price(URL, 90);
    assert_eq!(
        check_once(&engine, 7).await,
        CheckOutcome::Updated {
            price: Decimal::from(90),
            alert: AlertOutcome::Sent
        }
    );

    // Staying at the same price below target does not re-alert
    assert_eq!(
        check_once(&engine, 7).await,
        CheckOutcome::Updated {
            price: Decimal::from(90),
            alert: AlertOutcome::NotTriggered
        }
    );

    // Rising above target does not alert either
    engine.fetcher.set_price(URL, 130);
    check_once(&engine, 7).await;

    let sent = engine.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, 7);
    assert!(sent[0].1.contains(URL));
    assert!(sent[0].1.contains("90.00"));
}

#[tokio::test]
async fn test_first_observation_below_target_does_not_alert() {
    let engine = create_test_engine();
    engine.product_manager.add_product(URL, Decimal::from(100), 1).await;
    engine.fetcher.set_price(URL, 50);

    check_once(&engine, 1).await;

    assert!(engine.notifier.sent().is_empty());
    let listed = engine.product_manager.list_products(1).await;
    assert_eq!(listed[0].last_observed_price, Some(Decimal::from(50)));
}

#[tokio::test]
async fn test_failed_fetch_leaves_price_unchanged() {
    let engine = create_test_engine();
    engine.product_manager.add_product(URL, Decimal::from(100), 1).await;
    engine.fetcher.set_price(URL, 120);
    check_once(&engine, 1).await;

    engine.fetcher.set_price(URL, 0);
    assert_eq!(check_once(&engine, 1).await, CheckOutcome::FetchFailed);
    engine.fetcher.clear_price(URL);
    assert_eq!(check_once(&engine, 1).await, CheckOutcome::FetchFailed);

    let entry = engine.registry.get(&ProductKey::new(1, URL)).await.unwrap();
    assert_eq!(entry.last_observed_price, Some(Decimal::from(120)));
    assert!(engine.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_removed_during_check_is_a_race_miss() {
    let engine = create_test_engine();
    engine.product_manager.add_product(URL, Decimal::from(100), 1).await;
    engine.fetcher.set_price(URL, 120);
    check_once(&engine, 1).await;

    let snapshot = engine.registry.get(&ProductKey::new(1, URL)).await.unwrap();
    engine.fetcher.set_price(URL, 50);
    engine.fetcher.set_delay(URL, Duration::from_millis(200));

    let check = {
        let product_manager = Arc::clone(&engine.product_manager);
        tokio::spawn(async move { product_manager.check_product(&snapshot, &CancellationToken::new()).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(engine.product_manager.remove_product(URL, 1).await);

    assert_eq!(check.await.unwrap(), CheckOutcome::RaceMiss);
    assert!(engine.registry.is_empty().await);
    assert!(engine.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_delivery_failure_still_records_price() {
    let engine = create_test_engine();
    engine.product_manager.add_product(URL, Decimal::from(100), 1).await;
    engine.fetcher.set_price(URL, 120);
    check_once(&engine, 1).await;

    engine.notifier.fail_deliveries(true);
    engine.fetcher.set_price(URL, 80);
    assert_eq!(
        check_once(&engine, 1).await,
        CheckOutcome::Updated {
            price: Decimal::from(80),
            alert: AlertOutcome::DeliveryFailed
        }
    );

    let entry = engine.registry.get(&ProductKey::new(1, URL)).await.unwrap();
    assert_eq!(entry.last_observed_price, Some(Decimal::from(80)));
}
