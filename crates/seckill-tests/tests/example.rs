use eyre::Result;
use seckill_core::Outcome;
use seckill_tests::TestCtxBuilder;

mod util;

#[tokio::test] // Every test function needs to be decorated with this attribute
#[ntest::timeout(20_000)] // Test timeout in ms
async fn test_example() -> Result<()> {
    // Create a test context with 1000 tickets in the store
    let ctx = TestCtxBuilder::new().with_tickets(1_000).build().await?;

    // Create a new user session
    let mut session = ctx.api.create_user_session();

    // Buy one ticket
    let response = session.buy_ticket().await?;
    assert_eq!(response.customer_id, session.customer_id);
    assert_eq!(
        response.result,
        Outcome::Success,
        "It must be possible to buy a ticket."
    );
    assert_eq!(session.purchased, 1);
    let customer = session.customer_id;

    let stats = ctx.api.get_stats().await?.result;
    assert_eq!(stats.local_sold, 1);
    assert_eq!(stats.success, 1);
    assert_eq!(stats.local_capacity, 150);

    assert_eq!(ctx.api.debug().await?.result, "Happy Debugging! 🚫🐛");

    // Finish the test
    let audit = ctx.finish().await?;
    assert_eq!(
        audit,
        vec![format!("result:1,localSales:1,customer:{customer}")]
    );
    Ok(())
}
