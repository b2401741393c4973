//! Futures over host-delivered responses.
//!
//! Some hosts answer a call by invoking a registered handle later instead of
//! returning a value. [`CallbackRegistry::register`] hands out an id to pass
//! to the host together with a [`PendingResponse`] future. Dropping the future,
//! whether it resolved or a timeout gave up on it, removes the registration,
//! so late deliveries find nothing and are discarded.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::{Error, Result};

/// Identifier of a registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(pub u64);

impl std::fmt::Display for CallbackId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "#{}", self.0)
	}
}

#[derive(Default)]
struct RegistryState {
	next_id: u64,
	pending: HashMap<CallbackId, oneshot::Sender<Value>>,
}

/// Table of callbacks awaiting a host response.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
	state: Arc<Mutex<RegistryState>>,
}

impl std::fmt::Debug for CallbackRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CallbackRegistry").field("pending", &self.pending_count()).finish()
	}
}

impl CallbackRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a new callback.
	pub fn register(&self) -> (CallbackId, PendingResponse) {
		let (tx, rx) = oneshot::channel();
		let mut state = self.state.lock();
		let id = CallbackId(state.next_id);
		state.next_id += 1;
		state.pending.insert(id, tx);
		drop(state);

		let pending = PendingResponse {
			id,
			rx,
			state: Arc::clone(&self.state),
		};
		(id, pending)
	}

	/// Delivers a response. Returns false if nobody is waiting for `id` anymore.
	pub fn deliver(&self, id: CallbackId, value: Value) -> bool {
		let Some(tx) = self.state.lock().pending.remove(&id) else {
			tracing::debug!(callback = %id, "dropping late callback response");
			return false;
		};
		tx.send(value).is_ok()
	}

	/// Number of callbacks still registered.
	pub fn pending_count(&self) -> usize {
		self.state.lock().pending.len()
	}
}

/// A response the host will deliver through [`CallbackRegistry::deliver`].
#[must_use = "dropping the response deregisters the callback"]
pub struct PendingResponse {
	id: CallbackId,
	rx: oneshot::Receiver<Value>,
	state: Arc<Mutex<RegistryState>>,
}

impl PendingResponse {
	/// The callback id to hand to the host.
	pub fn id(&self) -> CallbackId {
		self.id
	}

	/// Waits at most `timeout`; `Ok(None)` on timeout.
	pub async fn with_timeout(self, timeout: Duration) -> Result<Option<Value>> {
		match tokio::time::timeout(timeout, self).await {
			Ok(result) => result.map(Some),
			Err(_) => Ok(None),
		}
	}
}

impl Future for PendingResponse {
	type Output = Result<Value>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let this = self.get_mut();
		let id = this.id;
		Pin::new(&mut this.rx).poll(cx).map(|result| result.map_err(|_| Error::CallbackDropped(id)))
	}
}

impl Drop for PendingResponse {
	fn drop(&mut self) {
		self.state.lock().pending.remove(&self.id);
	}
}
