use std::fmt;

use thiserror::Error;

use crate::{channel::Channel, legacy::LegacyShape};

/// The maximum number of axes a tensor can have.
pub const MAX_AXES: usize = 32;

/// Error type for tensor operations.
///
/// All variants except [`TensorError::ContractViolation`] report rejected input and are
/// recoverable. A contract violation means a caller broke an internal precondition, such
/// as addressing a tensor with more indices than it has axes.
#[derive(Error, Debug, PartialEq)]
pub enum TensorError {
    /// An axis length is not strictly positive.
    ///
    /// # Recommended Actions
    /// - Check that every dimension of the shape is at least 1
    #[error("Invalid shape {0:?}: every axis length must be strictly positive")]
    InvalidShape(Vec<i64>),

    /// The shape has more axes than [`MAX_AXES`].
    #[error("Shape has {0} axes, exceeding the maximum of {MAX_AXES}")]
    ExceedMaxAxes(usize),

    /// Two tensors are incompatible for a binary operation, or a reshape does not
    /// preserve the element count.
    #[error("Shape mismatch: {0:?} != {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// Range corners do not address a rank-4 tensor.
    #[error("Invalid indices: {0}")]
    InvalidIndices(String),

    /// A serialized payload does not hold exactly `capacity` elements.
    #[error("Length mismatch for {channel}: expected {expected} elements, got {actual}")]
    LengthMismatch {
        /// The channel the payload belongs to
        channel: Channel,
        /// Capacity implied by the shape
        expected: usize,
        /// Number of elements in the payload
        actual: usize,
    },

    /// The channel tag is neither data nor diff.
    #[error("Unsupported channel {0:?}, expected data or diff")]
    UnsupportedChannel(String),

    /// An axis index falls outside `[-num_axes, num_axes)`.
    #[error("Axis {axis} out of range for a tensor with {num_axes} axes")]
    AxisOutOfRange {
        /// The requested axis
        axis: i64,
        /// The number of axes of the tensor
        num_axes: usize,
    },

    /// The wire bytes are not a valid blob message.
    #[error("Failed to decode blob: {0}")]
    Decode(#[from] prost::DecodeError),

    /// An internal precondition was violated by the caller.
    ///
    /// This is a programming error rather than bad external input and should not be
    /// retried.
    #[error("Contract violation: {0}")]
    ContractViolation(String),
}

impl TensorError {
    /// Returns false if the error reports a broken internal contract.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ContractViolation(_))
    }
}

/// Validates a shape and returns its capacity.
///
/// A shape whose buffers could not be addressed in memory is rejected as invalid.
pub(crate) fn checked_capacity(shape: &[usize]) -> Result<usize, TensorError> {
    if shape.len() > MAX_AXES {
        return Err(TensorError::ExceedMaxAxes(shape.len()));
    }
    let invalid = || TensorError::InvalidShape(shape.iter().map(|&d| d as i64).collect());
    let capacity = shape.iter().try_fold(1usize, |capacity, &dim| {
        if dim == 0 {
            return Err(invalid());
        }
        capacity.checked_mul(dim).ok_or_else(invalid)
    })?;
    if capacity > isize::MAX as usize / std::mem::size_of::<f64>() {
        return Err(invalid());
    }
    Ok(capacity)
}

/// A dense N-dimensional blob with a value buffer and a gradient buffer.
///
/// Both buffers are stored flat in row-major order and always hold exactly
/// [`Tensor::capacity`] elements.
///
/// # Examples
///
/// ```rust
/// use caffeine_tensor::{Channel, Tensor};
///
/// let mut t = Tensor::new(&[2, 3]).unwrap();
/// t.set(&[1, 2], 4.0, Channel::Data).unwrap();
/// assert_eq!(t.get(&[1, 2], Channel::Data).unwrap(), 4.0);
/// assert_eq!(t.get(&[1, 2], Channel::Diff).unwrap(), 0.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    pub(crate) data: Vec<f64>,
    pub(crate) diff: Vec<f64>,
    pub(crate) shape: Vec<usize>,
}

impl Tensor {
    /// Creates a zero-filled tensor with the given shape.
    ///
    /// # Errors
    ///
    /// [`TensorError::ExceedMaxAxes`] if the shape has more than [`MAX_AXES`] axes and
    /// [`TensorError::InvalidShape`] if any axis length is zero.
    ///
    /// # Example
    ///
    /// ```
    /// use caffeine_tensor::{Tensor, TensorError};
    ///
    /// let t = Tensor::new(&[2, 3]).unwrap();
    /// assert_eq!(t.capacity(), 6);
    ///
    /// assert!(matches!(Tensor::new(&[2, 0, 3]), Err(TensorError::InvalidShape(_))));
    /// ```
    pub fn new(shape: &[usize]) -> Result<Self, TensorError> {
        let capacity = checked_capacity(shape)?;
        Ok(Self {
            data: vec![0.0; capacity],
            diff: vec![0.0; capacity],
            shape: shape.to_vec(),
        })
    }

    /// Creates a tensor whose selected channel is filled with `value`.
    ///
    /// The other channel is zero-filled.
    pub fn from_shape_val(shape: &[usize], value: f64, channel: Channel) -> Result<Self, TensorError> {
        let mut tensor = Self::new(shape)?;
        tensor.as_slice_mut(channel).fill(value);
        Ok(tensor)
    }

    /// Creates a tensor from a shape and its values. The gradients are zero-filled.
    ///
    /// # Errors
    ///
    /// Besides the shape errors of [`Tensor::new`], fails with
    /// [`TensorError::LengthMismatch`] if `data` does not hold exactly `capacity` elements.
    pub fn from_shape_vec(shape: &[usize], data: Vec<f64>) -> Result<Self, TensorError> {
        let capacity = checked_capacity(shape)?;
        Self::from_parts(shape.to_vec(), data, vec![0.0; capacity])
    }

    /// Assembles a tensor from raw parts, validating every invariant.
    pub(crate) fn from_parts(
        shape: Vec<usize>,
        data: Vec<f64>,
        diff: Vec<f64>,
    ) -> Result<Self, TensorError> {
        let capacity = checked_capacity(&shape)?;
        for (channel, buffer) in [(Channel::Data, &data), (Channel::Diff, &diff)] {
            if buffer.len() != capacity {
                return Err(TensorError::LengthMismatch {
                    channel,
                    expected: capacity,
                    actual: buffer.len(),
                });
            }
        }
        Ok(Self { data, diff, shape })
    }

    /// The shape of the tensor.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The length of the axis at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not smaller than [`Tensor::num_axes`].
    #[inline]
    pub fn shape_at(&self, index: usize) -> usize {
        self.shape[index]
    }

    /// The number of axes.
    #[inline]
    pub fn num_axes(&self) -> usize {
        self.shape.len()
    }

    /// The number of elements in each buffer.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The value buffer.
    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// The gradient buffer.
    #[inline]
    pub fn diff(&self) -> &[f64] {
        &self.diff
    }

    /// The buffer selected by `channel`.
    #[inline]
    pub fn as_slice(&self, channel: Channel) -> &[f64] {
        match channel {
            Channel::Data => &self.data,
            Channel::Diff => &self.diff,
        }
    }

    /// The buffer selected by `channel`, mutably.
    #[inline]
    pub fn as_slice_mut(&mut self, channel: Channel) -> &mut [f64] {
        match channel {
            Channel::Data => &mut self.data,
            Channel::Diff => &mut self.diff,
        }
    }

    /// Resolves a possibly negative axis index against the number of axes.
    ///
    /// # Errors
    ///
    /// [`TensorError::AxisOutOfRange`] unless `-num_axes <= axis < num_axes`.
    ///
    /// # Example
    ///
    /// ```
    /// use caffeine_tensor::Tensor;
    ///
    /// let t = Tensor::new(&[1, 3, 5, 5]).unwrap();
    /// assert_eq!(t.canonical_axis_index(1).unwrap(), 1);
    /// assert_eq!(t.canonical_axis_index(-1).unwrap(), 3);
    /// assert!(t.canonical_axis_index(4).is_err());
    /// ```
    pub fn canonical_axis_index(&self, axis: i32) -> Result<usize, TensorError> {
        canonical_axis_index(axis, self.num_axes())
    }

    /// Computes the flat position of `indices`.
    ///
    /// Axes are walked in order as `offset = offset * shape[i] + index[i]`. An index of
    /// zero, an index past the axis length and a missing trailing index all address
    /// position `0` of that axis.
    ///
    /// # Errors
    ///
    /// [`TensorError::ContractViolation`] if more indices than axes are given.
    ///
    /// # Example
    ///
    /// ```
    /// use caffeine_tensor::Tensor;
    ///
    /// let t = Tensor::new(&[3, 3]).unwrap();
    /// assert_eq!(t.offset(&[1, 2]).unwrap(), 5);
    /// assert_eq!(t.offset(&[5, 5]).unwrap(), t.offset(&[0, 0]).unwrap());
    /// ```
    pub fn offset(&self, indices: &[usize]) -> Result<usize, TensorError> {
        if indices.len() > self.num_axes() {
            return Err(TensorError::ContractViolation(format!(
                "{} indices given for a tensor with {} axes",
                indices.len(),
                self.num_axes()
            )));
        }
        let offset = self.shape.iter().enumerate().fold(0, |offset, (i, &dim)| {
            let index = indices
                .get(i)
                .copied()
                .filter(|&index| index > 0 && index < dim)
                .unwrap_or(0);
            offset * dim + index
        });
        Ok(offset)
    }

    /// Reads the element at `indices` from the selected channel.
    pub fn get(&self, indices: &[usize], channel: Channel) -> Result<f64, TensorError> {
        let offset = self.offset(indices)?;
        Ok(self.as_slice(channel)[offset])
    }

    /// Writes `value` at `indices` into the selected channel.
    pub fn set(&mut self, indices: &[usize], value: f64, channel: Channel) -> Result<(), TensorError> {
        let offset = self.offset(indices)?;
        self.as_slice_mut(channel)[offset] = value;
        Ok(())
    }

    /// Returns true if every axis of `self` has the same length in `other`.
    ///
    /// The comparison only walks the axes of `self`: trailing axes of `other` are not
    /// inspected, so `[2, 3]` equals `[2, 3, 4]` but not the other way around.
    pub fn shape_equals(&self, other: &Tensor) -> bool {
        self.shape
            .iter()
            .enumerate()
            .all(|(i, dim)| other.shape.get(i) == Some(dim))
    }

    /// Returns a copy of the tensor relabeled with `shape`.
    ///
    /// # Errors
    ///
    /// The shape errors of [`Tensor::new`], or [`TensorError::ShapeMismatch`] if the
    /// element count changes.
    ///
    /// # Example
    ///
    /// ```
    /// use caffeine_tensor::Tensor;
    ///
    /// let t = Tensor::from_shape_vec(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    /// let flat = t.reshape(&[6]).unwrap();
    /// assert_eq!(flat.data(), t.data());
    /// assert!(t.reshape(&[4]).is_err());
    /// ```
    pub fn reshape(&self, shape: &[usize]) -> Result<Tensor, TensorError> {
        if checked_capacity(shape)? != self.capacity() {
            return Err(TensorError::ShapeMismatch(self.shape.clone(), shape.to_vec()));
        }
        let mut result = self.clone();
        result.shape = shape.to_vec();
        Ok(result)
    }

    /// Copies the half-open box `[low, high)` of the selected channel into a new tensor.
    ///
    /// The result has shape `high[i] - low[i]` per axis, where an empty span counts as 1.
    /// Element `low + k` of `self` lands at position `k` of the result.
    ///
    /// # Errors
    ///
    /// [`TensorError::InvalidIndices`] unless `self` has exactly 4 axes and both corners
    /// have 4 entries with `low <= high`.
    pub fn range(&self, low: &[usize], high: &[usize], channel: Channel) -> Result<Tensor, TensorError> {
        if self.num_axes() != 4 || low.len() != 4 || high.len() != 4 {
            return Err(TensorError::InvalidIndices(format!(
                "range needs 4 axes, got corners {low:?} and {high:?} for shape {:?}",
                self.shape
            )));
        }

        let mut shape = [0; 4];
        for (i, dim) in shape.iter_mut().enumerate() {
            let span = high[i].checked_sub(low[i]).ok_or_else(|| {
                TensorError::InvalidIndices(format!("corner {low:?} lies past corner {high:?}"))
            })?;
            *dim = span.max(1);
        }

        let mut result = Tensor::new(&shape)?;
        for n in low[0]..high[0] {
            for c in low[1]..high[1] {
                for h in low[2]..high[2] {
                    for w in low[3]..high[3] {
                        let value = self.get(&[n, c, h, w], channel)?;
                        let target = [n - low[0], c - low[1], h - low[2], w - low[3]];
                        result.set(&target, value, channel)?;
                    }
                }
            }
        }

        Ok(result)
    }

    /// Copies a `[1, 1, H, W]` plane into the `(num, channel)` slot of the tensor.
    ///
    /// # Errors
    ///
    /// [`TensorError::ShapeMismatch`] if heights or widths differ and
    /// [`TensorError::InvalidIndices`] if `plane` holds more than one slot.
    pub fn set_num_channel(
        &mut self,
        num: usize,
        channel_index: usize,
        plane: &Tensor,
        channel: Channel,
    ) -> Result<(), TensorError> {
        if self.width()? != plane.width()? || self.height()? != plane.height()? {
            return Err(TensorError::ShapeMismatch(
                self.shape.clone(),
                plane.shape.clone(),
            ));
        }
        if plane.num()? != 1 || plane.channels()? != 1 {
            return Err(TensorError::InvalidIndices(format!(
                "plane {:?} must hold a single num/channel slot",
                plane.shape
            )));
        }

        for h in 0..self.height()? {
            for w in 0..self.width()? {
                let value = plane.get(&[0, 0, h, w], channel)?;
                self.set(&[num, channel_index, h, w], value, channel)?;
            }
        }

        Ok(())
    }
}

/// Resolves `axis` against `num_axes`, counting negative values from the end.
///
/// # Errors
///
/// [`TensorError::AxisOutOfRange`] unless `-num_axes <= axis < num_axes`.
pub fn canonical_axis_index(axis: i32, num_axes: usize) -> Result<usize, TensorError> {
    let rank = num_axes as i64;
    let axis = i64::from(axis);
    if axis < -rank || axis >= rank {
        return Err(TensorError::AxisOutOfRange { axis, num_axes });
    }
    let axis = if axis < 0 { axis + rank } else { axis };
    Ok(axis as usize)
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for dim in &self.shape {
            write!(f, "{dim} ")?;
        }
        write!(f, "({})", self.capacity())
    }
}
