#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! `caffeine-tensor` provides the blob container used by the caffeine layers: a dense
//! N-dimensional array owning two flat `f64` buffers of identical length, the values
//! (`data`) and the gradients (`diff`).
//!
//! # Architecture
//!
//! - **Tensor**: shape bookkeeping, offset arithmetic and element access
//! - **Channel**: selects which of the two buffers an operation touches
//! - **LegacyShape**: the historical num/channels/height/width accessors as a view
//!   over the general shape
//! - **BlobProto**: the protobuf wire format used to persist tensors
//!
//! # Quick Start
//!
//! ```rust
//! use caffeine_tensor::{Channel, LegacyShape, Tensor};
//!
//! let mut t = Tensor::from_shape_val(&[1, 2, 2, 3], -2.0, Channel::Data).unwrap();
//! assert_eq!(t.capacity(), 12);
//! assert_eq!(t.height().unwrap(), 2);
//!
//! t.scale(0.5, Channel::Data);
//! assert_eq!(t.l1_norm(Channel::Data), 12.0);
//!
//! let bytes = t.to_bytes(true);
//! let restored = Tensor::from_bytes(&bytes).unwrap();
//! assert_eq!(restored, t);
//! ```

/// Bincode module for binary serialization and deserialization.
///
/// Available when the `bincode` feature is enabled.
#[cfg(feature = "bincode")]
pub mod bincode;

/// Channel selection between the value and gradient buffers.
pub mod channel;

/// Legacy 4-axis accessors layered over the general shape.
pub mod legacy;

/// Element-wise, reduction and matrix operations over a selected channel.
pub mod ops;

/// Protobuf wire format of a tensor.
pub mod proto;

/// Serde module for JSON/other format serialization and deserialization.
///
/// Available when the `serde` feature is enabled.
#[cfg(feature = "serde")]
pub mod serde;

/// Tensor module containing the main tensor implementation and error types.
pub mod tensor;

pub use crate::channel::Channel;
pub use crate::legacy::LegacyShape;
pub use crate::proto::{BlobProto, BlobShape};
pub use crate::tensor::{Tensor, TensorError, MAX_AXES};
