use caffeine_tensor::BlobProto;
use prost::Message;

use crate::error::ConvError;

/// The phase a network runs in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Phase {
    /// Training, gradients are computed.
    Train = 0,
    /// Inference only.
    Test = 1,
}

/// Parameters of a convolution layer.
///
/// Kernel size, stride and padding may be given either as a `*_h`/`*_w` pair (2D only)
/// or as a list holding one value, broadcast to every spatial axis, or one value per
/// spatial axis. Unset optional fields read as their documented defaults through the
/// generated accessors, e.g. [`ConvolutionParameter::axis`] returns 1.
#[derive(Clone, PartialEq, Message, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ConvolutionParameter {
    /// The number of outputs for the layer.
    #[prost(uint32, optional, tag = "1")]
    pub num_output: Option<u32>,
    /// Whether to have bias terms.
    #[prost(bool, optional, tag = "2", default = "true")]
    pub bias_term: Option<bool>,
    /// Zero-padding added to both sides of each spatial axis.
    #[prost(uint32, repeated, packed = "false", tag = "3")]
    pub pad: Vec<u32>,
    /// The kernel extent along each spatial axis.
    #[prost(uint32, repeated, packed = "false", tag = "4")]
    pub kernel_size: Vec<u32>,
    /// The group size for group convolution.
    #[prost(uint32, optional, tag = "5", default = "1")]
    pub group: Option<u32>,
    /// The stride along each spatial axis.
    #[prost(uint32, repeated, packed = "false", tag = "6")]
    pub stride: Vec<u32>,
    /// The padding height, 2D only.
    #[prost(uint32, optional, tag = "9", default = "0")]
    pub pad_h: Option<u32>,
    /// The padding width, 2D only.
    #[prost(uint32, optional, tag = "10", default = "0")]
    pub pad_w: Option<u32>,
    /// The kernel height, 2D only.
    #[prost(uint32, optional, tag = "11")]
    pub kernel_h: Option<u32>,
    /// The kernel width, 2D only.
    #[prost(uint32, optional, tag = "12")]
    pub kernel_w: Option<u32>,
    /// The stride height, 2D only.
    #[prost(uint32, optional, tag = "13")]
    pub stride_h: Option<u32>,
    /// The stride width, 2D only.
    #[prost(uint32, optional, tag = "14")]
    pub stride_w: Option<u32>,
    /// The channel axis; the following axes are spatial. Negative values count from the
    /// last axis.
    #[prost(int32, optional, tag = "16", default = "1")]
    pub axis: Option<i32>,
    /// Whether to use the N-D im2col path even for 2D convolution.
    #[prost(bool, optional, tag = "17", default = "false")]
    pub force_nd_im2col: Option<bool>,
    /// The dilation along each spatial axis.
    #[prost(uint32, repeated, packed = "false", tag = "18")]
    pub dilation: Vec<u32>,
}

/// Parameters of a layer.
#[derive(Clone, PartialEq, Message, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LayerParameter {
    /// The layer name.
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    /// The layer type.
    #[prost(string, optional, tag = "2")]
    pub r#type: Option<String>,
    /// The learned parameter blobs, weights first.
    #[prost(message, repeated, tag = "7")]
    pub blobs: Vec<BlobProto>,
    /// The phase the layer runs in.
    #[prost(enumeration = "Phase", optional, tag = "10")]
    pub phase: Option<i32>,
    /// Convolution specific parameters.
    #[prost(message, optional, tag = "106")]
    pub convolution_param: Option<ConvolutionParameter>,
}

impl LayerParameter {
    /// Loads a layer configuration from JSON.
    ///
    /// # Example
    ///
    /// ```
    /// use caffeine_nn::config::LayerParameter;
    ///
    /// let layer = LayerParameter::from_json_str(
    ///     r#"{"name": "conv1", "type": "Convolution",
    ///         "convolution_param": {"num_output": 8, "kernel_size": [3]}}"#,
    /// )
    /// .unwrap();
    /// assert_eq!(layer.name(), "conv1");
    /// assert_eq!(layer.convolution_param.unwrap().num_output(), 8);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, ConvError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decodes a layer configuration from protobuf bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConvError> {
        Ok(Self::decode(bytes)?)
    }

    /// Encodes the layer configuration into protobuf bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }
}
