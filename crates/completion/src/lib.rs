//! LSP completion adaptation for editor completion engines.
//!
//! This crate sits between a language client and a generic completion engine.
//! It turns protocol completion responses into normalized items, remembers
//! complete responses per provider while an incremental session is running, and
//! decides what to do to the buffer when the user accepts an item.
//!
//! The pieces, leaf first:
//! - [`item`]: normalization of one [`lsp_types::CompletionItem`] into a
//!   [`NormalizedItem`] that carries everything needed to confirm it later.
//! - [`cache`]: per-provider cache of complete responses.
//! - [`gather`]: concurrent fan-out to every provider with a shared timeout.
//! - [`confirm`]: corrective edits after the engine inserted an item.
//! - [`preview`]: documentation rendering for the selected item.
//!
//! Everything the crate needs from the outside world goes through the
//! [`LanguageClient`] and [`Editor`] traits in [`host`]. A
//! [`CompletionSession`] owns the configuration and the cache, so two sessions
//! never see each other's state.
#![warn(missing_docs)]

/// Re-export of the [`lsp_types`] dependency of this crate.
pub use lsp_types;
pub use lspcomp_position as position;
pub use lspcomp_position::OffsetEncoding;

pub mod cache;
pub mod callback;
pub mod config;
pub mod confirm;
pub mod gather;
pub mod host;
pub mod item;
pub mod preview;
pub mod provider;
mod session;
pub mod snippet;

#[cfg(test)]
mod testing;

pub use cache::CompletionCache;
pub use callback::{CallbackId, CallbackRegistry, PendingResponse};
pub use config::{CompletionConfig, ConfirmBehavior, SnippetEngine};
pub use confirm::ConfirmOutcome;
pub use gather::{GatherContext, GatherResult};
pub use host::{BufferEdit, BufferPosition, Editor, LanguageClient, LineContext};
pub use item::{ItemPayload, NormalizedItem};
pub use preview::{PreviewDocument, PreviewKind};
pub use provider::{Provider, ProviderCapabilities, ProviderId};
pub use session::CompletionSession;

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// The language client failed to answer.
	#[error("language client error: {0}")]
	Client(String),
	/// The editor rejected a read or a write.
	#[error("editor error: {0}")]
	Editor(String),
	/// A response or a stored item payload could not be decoded.
	#[error("deserialization failed: {0}")]
	Deserialize(#[from] serde_json::Error),
	/// The edits needed to confirm an item touch the same region twice.
	#[error("overlapping edits in completion confirm")]
	OverlappingEdits,
	/// A registered callback was dropped by the host before it answered.
	#[error("callback {0} dropped before a response arrived")]
	CallbackDropped(CallbackId),
}
