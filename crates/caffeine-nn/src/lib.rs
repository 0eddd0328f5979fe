#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Convolution setup
//!
//! A convolution layer receives its kernel size, stride, padding and dilation in several
//! overlapping forms: a `*_h`/`*_w` pair, a single value broadcast to every spatial axis,
//! or one value per spatial axis. [`conv::resolve_conv_geometry`] validates the forms
//! and produces one canonical value per spatial axis.
//!
//! ```rust
//! use caffeine_nn::{config::ConvolutionParameter, conv::resolve_conv_geometry};
//!
//! let param = ConvolutionParameter {
//!     kernel_size: vec![3],
//!     pad: vec![1],
//!     ..Default::default()
//! };
//!
//! // input blob of shape [N, C, H, W]
//! let geometry = resolve_conv_geometry(&param, 4).unwrap();
//! assert_eq!(geometry.kernel_shape, vec![3, 3]);
//! assert_eq!(geometry.stride, vec![1, 1]);
//! assert_eq!(geometry.pad, vec![1, 1]);
//! assert_eq!(geometry.output_spatial_shape(&[32, 32]).unwrap(), vec![32, 32]);
//! ```

/// Layer configuration messages.
pub mod config;

/// Convolution parameter resolution.
pub mod conv;

/// Error types for layer setup.
pub mod error;

/// Convolution layer setup.
pub mod layer;

pub use error::ConvError;
