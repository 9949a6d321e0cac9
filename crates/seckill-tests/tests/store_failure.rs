use std::sync::Arc;
use std::time::Duration;

use eyre::Result;
use seckill_core::Outcome;
use seckill_tests::TestCtxBuilder;
use util::UnreachableStore;

mod util;

/// An unreachable store never produces a sale, and the local unit stays taken.
#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_unreachable_store_reports_sold_out() -> Result<()> {
    let store = Arc::new(UnreachableStore::default());
    let ctx = TestCtxBuilder::new()
        .with_local_capacity(5)
        .with_store(store.clone())
        .build()
        .await?;

    assert_eq!(ctx.api.buy_ticket(None).await?.result, Outcome::SoldOut);
    assert_eq!(store.calls(), 1);

    let stats = ctx.api.get_stats().await?.result;
    assert_eq!(stats.local_sold, 1, "The local unit is not given back.");
    assert_eq!(stats.remote_failed, 1);
    assert_eq!(stats.remote_denied, 0);
    assert_eq!(stats.success, 0);

    let audit = ctx.finish().await?;
    assert_eq!(audit.len(), 1);
    assert!(audit[0].starts_with("result:0,localSales:1,"));
    Ok(())
}

/// Repeated store failures eat the local slice instead of overselling.
#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_failures_exhaust_local_slice() -> Result<()> {
    let store = Arc::new(UnreachableStore::default());
    let ctx = TestCtxBuilder::new()
        .with_local_capacity(3)
        .with_store(store.clone())
        .build()
        .await?;

    for _ in 0..5 {
        assert_eq!(ctx.api.buy_ticket(None).await?.result, Outcome::SoldOut);
    }
    assert_eq!(store.calls(), 3);

    let stats = ctx.engine.stats();
    assert_eq!(stats.local_sold, 3);
    assert_eq!(stats.remote_failed, 3);
    assert_eq!(stats.local_rejected, 2);

    ctx.finish().await?;
    Ok(())
}

/// A buyer that cannot get admitted in time is told the stock is sold out.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ntest::timeout(20_000)]
async fn test_admission_timeout_reports_sold_out() -> Result<()> {
    let ctx = TestCtxBuilder::new()
        .with_local_capacity(5)
        .with_tickets(5)
        .with_admission_timeout(Duration::ZERO)
        .with_handler_threads(8)
        .build()
        .await?;

    let buyers = (0..200).map(|_| {
        let api = ctx.api.clone();
        tokio::spawn(async move { api.buy_ticket(None).await })
    });
    let mut successes = 0;
    for response in futures::future::join_all(buyers).await {
        if response??.result.is_success() {
            successes += 1;
        }
    }

    let stats = ctx.engine.stats();
    assert!(successes <= 5);
    assert_eq!(stats.success, successes);
    assert_eq!(
        stats.success + stats.local_rejected + stats.remote_denied + stats.admission_timeout,
        200,
        "Every request must end in exactly one way."
    );

    ctx.finish().await?;
    Ok(())
}
