// src/services/notification_service.rs

use async_trait::async_trait;

use crate::models::orders::{Order, OrderItem};

/// Sends the purchase confirmation once an order settles. Callers log and
/// swallow errors; a failed notification never undoes a settlement.
#[async_trait]
pub trait PurchaseNotifier: Send + Sync {
    async fn purchase_confirmed(&self, order: &Order, items: &[OrderItem]) -> anyhow::Result<()>;
}

/// Writes the confirmation to the log.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

#[async_trait]
impl PurchaseNotifier for TracingNotifier {
    async fn purchase_confirmed(&self, order: &Order, items: &[OrderItem]) -> anyhow::Result<()> {
        let titles: Vec<&str> = items.iter().map(|i| i.beat_title.as_str()).collect();
        tracing::info!(
            order_number = %order.order_number,
            email = %order.email,
            total = %order.total,
            items = ?titles,
            "purchase confirmation sent"
        );
        Ok(())
    }
}
