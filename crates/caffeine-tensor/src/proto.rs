use prost::Message;

use crate::{
    channel::Channel,
    tensor::{checked_capacity, Tensor, TensorError, MAX_AXES},
};

/// The general shape of a serialized blob.
#[derive(Clone, PartialEq, Message)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BlobShape {
    /// Axis lengths.
    #[prost(int64, repeated, tag = "1")]
    pub dim: Vec<i64>,
}

/// A serialized blob.
///
/// The legacy 4-tuple `num, channels, height, width` takes precedence over `shape` when
/// any of its fields is non-zero.
#[derive(Clone, PartialEq, Message)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BlobProto {
    /// Legacy axis 0.
    #[prost(int32, optional, tag = "1")]
    pub num: Option<i32>,
    /// Legacy axis 1.
    #[prost(int32, optional, tag = "2")]
    pub channels: Option<i32>,
    /// Legacy axis 2.
    #[prost(int32, optional, tag = "3")]
    pub height: Option<i32>,
    /// Legacy axis 3.
    #[prost(int32, optional, tag = "4")]
    pub width: Option<i32>,
    /// Single precision values.
    #[prost(float, repeated, tag = "5")]
    pub data: Vec<f32>,
    /// Single precision gradients.
    #[prost(float, repeated, tag = "6")]
    pub diff: Vec<f32>,
    /// General shape.
    #[prost(message, optional, tag = "7")]
    pub shape: Option<BlobShape>,
    /// Double precision values.
    #[prost(double, repeated, tag = "8")]
    pub double_data: Vec<f64>,
    /// Double precision gradients.
    #[prost(double, repeated, tag = "9")]
    pub double_diff: Vec<f64>,
}

impl BlobProto {
    fn dims(&self) -> Vec<i64> {
        let legacy = [self.num, self.channels, self.height, self.width].map(|d| d.unwrap_or(0));
        if legacy.iter().any(|&d| d != 0) {
            legacy.iter().map(|&d| i64::from(d)).collect()
        } else {
            self.shape
                .as_ref()
                .map(|shape| shape.dim.clone())
                .unwrap_or_default()
        }
    }
}

impl Tensor {
    /// Converts the tensor into its wire message.
    ///
    /// The message always carries the general shape and the double precision values.
    /// The gradients are included only when `include_diff` is set.
    pub fn to_proto(&self, include_diff: bool) -> BlobProto {
        BlobProto {
            shape: Some(BlobShape {
                dim: self.shape.iter().map(|&d| d as i64).collect(),
            }),
            double_data: self.data.clone(),
            double_diff: if include_diff {
                self.diff.clone()
            } else {
                Vec::new()
            },
            ..Default::default()
        }
    }

    /// Encodes the tensor into protobuf bytes.
    pub fn to_bytes(&self, include_diff: bool) -> Vec<u8> {
        self.to_proto(include_diff).encode_to_vec()
    }

    /// Rebuilds a tensor from its wire message.
    ///
    /// For each channel the single precision payload is used when present, otherwise the
    /// double precision one. An absent payload leaves the channel zero-filled.
    ///
    /// # Errors
    ///
    /// The shape errors of [`Tensor::new`], or [`TensorError::LengthMismatch`] if a used
    /// payload does not hold exactly `capacity` elements.
    pub fn from_proto(proto: &BlobProto) -> Result<Self, TensorError> {
        let dims = proto.dims();
        if dims.len() > MAX_AXES {
            return Err(TensorError::ExceedMaxAxes(dims.len()));
        }
        let shape = dims
            .iter()
            .map(|&d| usize::try_from(d).ok().filter(|&d| d > 0))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| TensorError::InvalidShape(dims.clone()))?;

        let capacity = checked_capacity(&shape)?;
        let data = Payload::select(Channel::Data, capacity, &proto.data, &proto.double_data)?;
        let diff = Payload::select(Channel::Diff, capacity, &proto.diff, &proto.double_diff)?;

        let tensor = Tensor::from_parts(shape, data.into_buffer(capacity), diff.into_buffer(capacity))?;
        log::debug!("decoded blob {tensor}");

        Ok(tensor)
    }

    /// Decodes a tensor from protobuf bytes.
    ///
    /// # Errors
    ///
    /// [`TensorError::Decode`] if the bytes are not a blob message, otherwise the errors
    /// of [`Tensor::from_proto`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TensorError> {
        let proto = BlobProto::decode(bytes)?;
        Self::from_proto(&proto)
    }
}

/// The payload used for one channel of a blob.
enum Payload<'a> {
    Single(&'a [f32]),
    Double(&'a [f64]),
    Absent,
}

impl<'a> Payload<'a> {
    /// Picks the payload of `channel` and checks its length against `capacity`.
    fn select(
        channel: Channel,
        capacity: usize,
        single: &'a [f32],
        double: &'a [f64],
    ) -> Result<Self, TensorError> {
        let payload = match (single.is_empty(), double.is_empty()) {
            (false, double_empty) => {
                if !double_empty {
                    log::warn!("blob carries both single and double precision {channel}, using single");
                }
                Self::Single(single)
            }
            (true, false) => Self::Double(double),
            (true, true) => Self::Absent,
        };

        let actual = match payload {
            Self::Single(values) => values.len(),
            Self::Double(values) => values.len(),
            Self::Absent => capacity,
        };
        if actual != capacity {
            return Err(TensorError::LengthMismatch {
                channel,
                expected: capacity,
                actual,
            });
        }

        Ok(payload)
    }

    fn into_buffer(self, capacity: usize) -> Vec<f64> {
        match self {
            Self::Single(values) => values.iter().map(|&v| f64::from(v)).collect(),
            Self::Double(values) => values.to_vec(),
            Self::Absent => vec![0.0; capacity],
        }
    }
}
