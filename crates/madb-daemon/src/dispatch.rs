//! Running one action on many devices
//!
//! In concurrent mode every device gets its own tokio task and results come
//! back over an mpsc channel. In sequential mode devices run one after
//! another in listing order. Either way a failing device never stops the
//! others; failures are collected into one [`AggregateError`].

use std::sync::Arc;
use tokio::sync::mpsc;

use madb_core::prelude::*;
use madb_core::{AggregateError, Device};

/// Whether devices run at the same time or one by one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    #[default]
    Concurrent,
    Sequential,
}

/// Work performed for a single device
///
/// Implement [`DeviceAction`] (the `Send` variant) for anything that is
/// handed to [`dispatch`].
#[trait_variant::make(DeviceAction: Send)]
pub trait LocalDeviceAction {
    /// Run the action against `device`
    async fn run(&self, device: &Device) -> Result<()>;
}

/// Run `action` for every device and collect the failures
///
/// Returns `Ok(())` when every device succeeded, otherwise
/// [`Error::Dispatch`] naming each failed device by its display name.
pub async fn dispatch<A>(devices: Vec<Device>, action: Arc<A>, mode: DispatchMode) -> Result<()>
where
    A: DeviceAction + Send + Sync + 'static,
{
    info!("Dispatching to {} devices ({:?})", devices.len(), mode);

    let failures = match mode {
        DispatchMode::Sequential => run_sequential(devices, action.as_ref()).await,
        DispatchMode::Concurrent => run_concurrent(devices, action).await,
    };

    if !failures.is_empty() {
        warn!("{} of the devices failed", failures.len());
    }
    failures.into_result()
}

async fn run_sequential<A>(devices: Vec<Device>, action: &A) -> AggregateError
where
    A: DeviceAction + Sync,
{
    let mut failures = AggregateError::new();

    for device in devices {
        if let Err(e) = action.run(&device).await {
            debug!("{} failed: {}", device.display_name(), e);
            failures.push(device.display_name(), e);
        }
    }

    failures
}

async fn run_concurrent<A>(devices: Vec<Device>, action: Arc<A>) -> AggregateError
where
    A: DeviceAction + Send + Sync + 'static,
{
    let mut failures = AggregateError::new();
    if devices.is_empty() {
        return failures;
    }

    let (tx, mut rx) = mpsc::channel::<(String, Result<()>)>(devices.len());
    let mut handles = Vec::with_capacity(devices.len());

    for device in devices {
        let tx = tx.clone();
        let action = Arc::clone(&action);
        let name = device.display_name().to_string();

        let handle = tokio::spawn(async move {
            let result = action.run(&device).await;
            if tx
                .send((device.display_name().to_string(), result))
                .await
                .is_err()
            {
                debug!("Result channel closed before {} reported", device.serial);
            }
        });
        handles.push((name, handle));
    }
    drop(tx);

    while let Some((name, result)) = rx.recv().await {
        if let Err(e) = result {
            debug!("{} failed: {}", name, e);
            failures.push(name, e);
        }
    }

    // A panicking task never sends its result; report it from the join error
    for (name, handle) in handles {
        if let Err(join_err) = handle.await {
            error!("Task for {} did not complete: {}", name, join_err);
            failures.push(
                name,
                Error::process(format!("device task did not complete: {join_err}")),
            );
        }
    }

    failures
}
