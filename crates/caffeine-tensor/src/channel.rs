use std::fmt;
use std::str::FromStr;

use crate::tensor::TensorError;

/// Selects which of the two tensor buffers an operation reads or writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// The value buffer.
    Data,
    /// The gradient buffer.
    Diff,
}

impl Channel {
    /// Parse an integer channel tag, `0` for data and `1` for diff.
    ///
    /// # Errors
    ///
    /// Any other tag is rejected with [`TensorError::UnsupportedChannel`].
    ///
    /// # Example
    ///
    /// ```
    /// use caffeine_tensor::Channel;
    ///
    /// assert_eq!(Channel::from_tag(1).unwrap(), Channel::Diff);
    /// assert!(Channel::from_tag(2).is_err());
    /// ```
    pub fn from_tag(tag: i32) -> Result<Self, TensorError> {
        match tag {
            0 => Ok(Self::Data),
            1 => Ok(Self::Diff),
            other => Err(TensorError::UnsupportedChannel(other.to_string())),
        }
    }

    /// The integer tag of the channel.
    pub fn tag(self) -> i32 {
        match self {
            Self::Data => 0,
            Self::Diff => 1,
        }
    }
}

impl TryFrom<i32> for Channel {
    type Error = TensorError;

    fn try_from(tag: i32) -> Result<Self, Self::Error> {
        Self::from_tag(tag)
    }
}

impl FromStr for Channel {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data" => Ok(Self::Data),
            "diff" => Ok(Self::Diff),
            other => Err(TensorError::UnsupportedChannel(other.to_string())),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data => write!(f, "data"),
            Self::Diff => write!(f, "diff"),
        }
    }
}
