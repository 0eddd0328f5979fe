use caffeine_tensor::TensorError;
use thiserror::Error;

use crate::conv::SpatialField;

/// An error type for layer configuration and convolution setup.
#[derive(Error, Debug)]
pub enum ConvError {
    /// The `*_h`/`*_w` form of a field is used together with its list form, or for a
    /// convolution that is not 2D.
    #[error("Conflicting {field} specification: {reason}")]
    ConflictingSpecification {
        /// The offending field
        field: SpatialField,
        /// What made the forms conflict
        reason: String,
    },

    /// The list form of a field has neither one value nor one value per spatial axis.
    #[error("{field} must be specified once, or once per spatial dimension ({num_spatial_axes}), got {count} values")]
    InvalidSpecificationCount {
        /// The offending field
        field: SpatialField,
        /// The number of values given
        count: usize,
        /// The number of spatial axes of the input
        num_spatial_axes: usize,
    },

    /// A kernel, stride or dilation entry is zero.
    #[error("{field} dimensions must be nonzero, got 0 along spatial axis {axis}")]
    NonPositiveDimension {
        /// The offending field
        field: SpatialField,
        /// The spatial axis holding the zero
        axis: usize,
    },

    /// The input does not have one spatial extent per resolved axis.
    #[error("Expected {expected} spatial axes, got {actual}")]
    SpatialRankMismatch {
        /// The number of resolved spatial axes
        expected: usize,
        /// The number of spatial extents given
        actual: usize,
    },

    /// The dilated kernel does not fit into the padded input.
    #[error("Kernel extent {kernel} exceeds padded input {input} along spatial axis {axis}")]
    KernelExceedsInput {
        /// The spatial axis
        axis: usize,
        /// Input extent including padding
        input: usize,
        /// Kernel extent including dilation
        kernel: usize,
    },

    /// The layer was set up without any input blob.
    #[error("Convolution layer needs at least one input blob")]
    MissingInput,

    /// `num_output` is zero.
    #[error("num_output must be positive")]
    InvalidNumOutput,

    /// The input channels or the outputs are not divisible by the group count.
    #[error("Invalid group {group} for {channels} input channels and {num_output} outputs")]
    InvalidGroup {
        /// The group count
        group: usize,
        /// The number of input channels
        channels: usize,
        /// The number of outputs
        num_output: usize,
    },

    /// The layer carries an unexpected number of parameter blobs.
    #[error("Expected {expected} parameter blobs, got {actual}")]
    BlobCount {
        /// Blobs implied by the bias setting
        expected: usize,
        /// Blobs found in the configuration
        actual: usize,
    },

    /// The layer geometry was queried before `setup`.
    #[error("Convolution layer is not set up")]
    NotSetUp,

    /// Protobuf configuration error
    #[error("Failed to decode layer parameter: {0}")]
    Decode(#[from] prost::DecodeError),

    /// JSON configuration error
    #[error("Invalid layer configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Tensor error
    #[error("Error with the tensor: {0}")]
    Tensor(#[from] TensorError),
}
