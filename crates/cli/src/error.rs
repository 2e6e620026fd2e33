//! Error types for the `wak` binary.

use std::net::SocketAddr;

use thiserror::Error;
use wak::{LifecycleError, StoreError};

#[derive(Debug, Error)]
pub enum WakError {
	#[error("invalid configuration: {0}")]
	Config(String),

	#[error("failed to bind status server to {addr}: {source}")]
	Bind {
		addr: SocketAddr,
		#[source]
		source: std::io::Error,
	},

	#[error("status server failed: {0}")]
	Serve(#[source] std::io::Error),

	#[error("login finished but no session was written to {0}")]
	SessionNotSaved(String),

	#[error("cancelled")]
	Cancelled,

	#[error(transparent)]
	Lifecycle(#[from] LifecycleError),

	#[error(transparent)]
	Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, WakError>;
