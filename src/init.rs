use crate::layer::ShipLayer;
use crate::logger::Logger;
use std::sync::Arc;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Route all `tracing` events of the process through `logger`.
///
/// **Parameters**
/// - `logger`: shared [`Logger`] that renders locally and ships remotely.
///
/// **Effects**
///
/// Installs a [`Registry`] combined with [`ShipLayer`] as the global
/// default subscriber. No `fmt` layer is added: the logger's local backend
/// already renders every event.
///
/// **Returns**
/// - `Err(..)` if a global subscriber was already installed.
pub fn init_tracing(logger: Arc<Logger>) -> Result<(), SetGlobalDefaultError> {
    let subscriber = Registry::default().with(ShipLayer::new(logger));
    tracing::subscriber::set_global_default(subscriber)
}
