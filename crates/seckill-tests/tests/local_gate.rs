use eyre::Result;
use futures::future::join_all;
use seckill_core::Outcome;
use seckill_tests::TestCtxBuilder;
use util::CountingStore;

mod util;

/// Once the local slice is used up, requests are answered without asking the store.
#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_third_buy_rejected_locally() -> Result<()> {
    let store = CountingStore::provisioned(10);
    let ctx = TestCtxBuilder::new()
        .with_local_capacity(2)
        .with_store(store.clone())
        .build()
        .await?;

    assert_eq!(ctx.api.buy_ticket(None).await?.result, Outcome::Success);
    assert_eq!(ctx.api.buy_ticket(None).await?.result, Outcome::Success);
    assert_eq!(store.calls(), 2);

    assert_eq!(ctx.api.buy_ticket(None).await?.result, Outcome::SoldOut);
    assert_eq!(store.calls(), 2, "A local rejection must not reach the store.");

    let stats = ctx.api.get_stats().await?.result;
    assert_eq!(stats.local_sold, 2);
    assert_eq!(stats.local_rejected, 1);

    let audit = ctx.finish().await?;
    assert_eq!(audit.len(), 3);
    assert!(audit[2].starts_with("result:0,localSales:2,"));
    Ok(())
}

/// A flood of concurrent buyers gets exactly the local slice, the rest is shed locally.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(60_000)]
async fn test_thousand_concurrent_buyers() -> Result<()> {
    let store = CountingStore::provisioned(1_000);
    let ctx = TestCtxBuilder::new()
        .with_local_capacity(150)
        .with_handler_threads(16)
        .with_store(store.clone())
        .build()
        .await?;

    let buyers = (0..1_000).map(|_| {
        let api = ctx.api.clone();
        tokio::spawn(async move { api.buy_ticket(None).await })
    });
    let mut successes = 0;
    for response in join_all(buyers).await {
        if response??.result == Outcome::Success {
            successes += 1;
        }
    }

    assert_eq!(successes, 150);
    assert_eq!(store.calls(), 150, "Only requests passing the local gate may reach the store.");
    assert_eq!(store.sold(), 150);

    let stats = ctx.engine.stats();
    assert_eq!(stats.local_sold, 150);
    assert_eq!(stats.local_rejected, 850);

    let audit = ctx.finish().await?;
    assert_eq!(audit.len(), 1_000);
    assert_eq!(
        audit.iter().filter(|l| l.starts_with("result:1,")).count(),
        150
    );
    Ok(())
}

/// The local sold count only ever grows.
#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_local_sold_is_monotonic() -> Result<()> {
    let ctx = TestCtxBuilder::new()
        .with_local_capacity(5)
        .with_tickets(3)
        .build()
        .await?;

    let mut last = 0;
    for _ in 0..10 {
        ctx.api.buy_ticket(None).await?;
        let sold = ctx.api.get_stats().await?.result.local_sold;
        assert!(sold >= last, "local sold count went from {last} to {sold}");
        assert!(sold <= ctx.local_capacity);
        last = sold;
    }
    assert_eq!(last, 5);
    assert_eq!(ctx.engine.stats().success, 3);

    ctx.finish().await?;
    Ok(())
}
