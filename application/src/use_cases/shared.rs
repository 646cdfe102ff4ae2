//! Shared utilities for use cases.
//!
//! The council stages all follow the same fan-out shape: one call per model,
//! run concurrently, with results reassembled in the caller's model order so
//! anonymization labels stay stable.

use crate::ports::model_gateway::{GatewayError, ModelGateway, ModelReply, QueryOptions};
use council_domain::{ChatMessage, Model};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::warn;

/// Query every model concurrently and return one slot per model, in the
/// input order. A panicked or aborted task surfaces as a gateway error in
/// its slot rather than poisoning the whole stage.
pub(crate) async fn fan_out_queries<G, F>(
    gateway: &Arc<G>,
    models: &[Model],
    build_messages: F,
    options: &QueryOptions,
) -> Vec<(Model, Result<ModelReply, GatewayError>)>
where
    G: ModelGateway + 'static,
    F: Fn(&Model) -> Vec<ChatMessage>,
{
    let mut join_set = JoinSet::new();

    for (index, model) in models.iter().enumerate() {
        let gateway = Arc::clone(gateway);
        let model = model.clone();
        let messages = build_messages(&model);
        let options = options.clone();

        join_set.spawn(async move {
            let result = gateway.query(&model, &messages, &options).await;
            (index, model, result)
        });
    }

    let mut slots: Vec<Option<(Model, Result<ModelReply, GatewayError>)>> =
        (0..models.len()).map(|_| None).collect();

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, model, result)) => {
                slots[index] = Some((model, result));
            }
            Err(e) => {
                warn!("Task join error: {}", e);
            }
        }
    }

    slots
        .into_iter()
        .zip(models.iter())
        .map(|(slot, model)| {
            slot.unwrap_or_else(|| {
                (
                    model.clone(),
                    Err(GatewayError::RequestFailed("task aborted".to_string())),
                )
            })
        })
        .collect()
}
