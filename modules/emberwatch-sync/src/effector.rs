//! The two-step subscribe operation.

use chrono::Utc;
use tracing::warn;

use emberwatch_common::{
    AlertZone, NewSubscription, NotificationPreference, StoreError, Subscription,
};
use emberwatch_store::StoreGateway;

/// Create a Subscription, then bump the zone's counter.
///
/// The counter step is the store's atomic increment — never a
/// client-computed `old + 1`, so N concurrent subscribers yield
/// exactly N increments. If the increment fails after the
/// subscription was recorded, the error names the orphaned
/// subscription; `derived_subscriber_count` stays correct throughout.
pub async fn subscribe_to_zone<G: StoreGateway>(
    store: &G,
    user_id: &str,
    zone_id: &str,
    preference: NotificationPreference,
) -> Result<(Subscription, AlertZone), StoreError> {
    let subscription = store
        .create_subscription(NewSubscription {
            user_id: user_id.to_string(),
            alert_zone_id: zone_id.to_string(),
            preference,
            created_at: Utc::now(),
        })
        .await?;

    match store.increment_zone_subscribers(zone_id).await {
        Ok(zone) => Ok((subscription, zone)),
        Err(e) => {
            warn!(
                subscription_id = %subscription.id,
                zone_id,
                error = %e,
                "subscription recorded but counter update failed"
            );
            Err(StoreError::SubscriptionCounterFailed {
                subscription_id: subscription.id,
                source: Box::new(e),
            })
        }
    }
}

/// The counter, derived from the Subscription rows themselves.
/// Authoritative even when a stored counter lags an interrupted
/// subscribe.
pub async fn derived_subscriber_count<G: StoreGateway>(
    store: &G,
    zone_id: &str,
) -> Result<i64, StoreError> {
    let subscriptions = store.list_subscriptions_for_zone(zone_id).await?;
    Ok(subscriptions.len() as i64)
}
