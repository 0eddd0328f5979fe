//! Operations for tensors.
//!
//! Every operation works on the buffer selected by a [`Channel`]. In-place transforms
//! mutate that buffer only, binary operations fail with
//! [`TensorError::ShapeMismatch`] when [`Tensor::shape_equals`] rejects the operands.

use crate::{
    channel::Channel,
    legacy::LegacyShape,
    tensor::{Tensor, TensorError},
};

impl Tensor {
    /// Sum of absolute values of the selected channel.
    ///
    /// # Example
    ///
    /// ```
    /// use caffeine_tensor::{Channel, Tensor};
    ///
    /// let t = Tensor::from_shape_val(&[2, 3], -2.0, Channel::Data).unwrap();
    /// assert_eq!(t.l1_norm(Channel::Data), 12.0);
    /// ```
    pub fn l1_norm(&self, channel: Channel) -> f64 {
        self.as_slice(channel).iter().map(|v| v.abs()).sum()
    }

    /// Sum of squares of the selected channel.
    ///
    /// This is the squared L2 norm, no square root is taken.
    ///
    /// # Example
    ///
    /// ```
    /// use caffeine_tensor::{Channel, Tensor};
    ///
    /// let t = Tensor::from_shape_val(&[2, 3], -2.0, Channel::Data).unwrap();
    /// assert_eq!(t.l2_norm(Channel::Data), 24.0);
    /// ```
    pub fn l2_norm(&self, channel: Channel) -> f64 {
        self.as_slice(channel).iter().map(|v| v * v).sum()
    }

    /// Adds `delta` to every element.
    pub fn shift(&mut self, delta: f64, channel: Channel) {
        self.map_inplace(channel, |v| v + delta);
    }

    /// Multiplies every element by `factor`.
    pub fn scale(&mut self, factor: f64, channel: Channel) {
        self.map_inplace(channel, |v| v * factor);
    }

    /// Raises every element to the power `exponent`.
    pub fn powx(&mut self, exponent: f64, channel: Channel) {
        self.map_inplace(channel, |v| v.powf(exponent));
    }

    /// Replaces every element by its exponential.
    pub fn exp(&mut self, channel: Channel) {
        self.map_inplace(channel, f64::exp);
    }

    fn map_inplace(&mut self, channel: Channel, f: impl Fn(f64) -> f64) {
        self.as_slice_mut(channel).iter_mut().for_each(|v| *v = f(*v));
    }

    fn ensure_shape_equals(&self, other: &Tensor) -> Result<(), TensorError> {
        if !self.shape_equals(other) {
            return Err(TensorError::ShapeMismatch(
                self.shape.clone(),
                other.shape.clone(),
            ));
        }
        Ok(())
    }

    /// Adds `other` element-wise into `self`.
    ///
    /// # Errors
    ///
    /// [`TensorError::ShapeMismatch`] if the shapes are not equal.
    pub fn add(&mut self, other: &Tensor, channel: Channel) -> Result<(), TensorError> {
        self.ensure_shape_equals(other)?;
        self.as_slice_mut(channel)
            .iter_mut()
            .zip(other.as_slice(channel))
            .for_each(|(a, b)| *a += b);
        Ok(())
    }

    /// Element-wise product, stored in the selected channel of a new tensor.
    ///
    /// For [`Channel::Diff`] the values of `self` are multiplied with the gradients of
    /// `other`.
    ///
    /// # Errors
    ///
    /// [`TensorError::ShapeMismatch`] if the shapes are not equal.
    pub fn dot(&self, other: &Tensor, channel: Channel) -> Result<Tensor, TensorError> {
        self.ensure_shape_equals(other)?;
        let mut result = Tensor::new(&self.shape)?;
        result
            .as_slice_mut(channel)
            .iter_mut()
            .zip(self.data.iter().zip(other.as_slice(channel)))
            .for_each(|(out, (a, b))| *out = a * b);
        Ok(result)
    }

    /// Inner product of the selected channel of both tensors.
    ///
    /// # Errors
    ///
    /// [`TensorError::ShapeMismatch`] if the shapes are not equal.
    pub fn mul(&self, other: &Tensor, channel: Channel) -> Result<f64, TensorError> {
        self.ensure_shape_equals(other)?;
        Ok(self
            .as_slice(channel)
            .iter()
            .zip(other.as_slice(channel))
            .map(|(a, b)| a * b)
            .sum())
    }

    /// Batched matrix product over the legacy `(num, channels)` slots.
    ///
    /// Every `height x width` plane of `self` is multiplied with every plane of `other`.
    /// The result has shape `[num * other.num, channels * other.channels, height,
    /// other.width]` and slot `(n1 * other.num + n2, c1 * other.channels + c2)` holds the
    /// product of plane `(n1, c1)` of `self` with plane `(n2, c2)` of `other`.
    ///
    /// # Errors
    ///
    /// [`TensorError::ShapeMismatch`] unless both tensors have 4 axes and the width of
    /// `self` equals the height of `other`.
    ///
    /// # Example
    ///
    /// ```
    /// use caffeine_tensor::{Channel, Tensor};
    ///
    /// let a = Tensor::from_shape_vec(&[1, 1, 2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    /// let b = Tensor::from_shape_vec(&[1, 1, 2, 1], vec![1.0, 1.0]).unwrap();
    /// let c = a.matrix_multiply(&b, Channel::Data).unwrap();
    /// assert_eq!(c.shape(), &[1, 1, 2, 1]);
    /// assert_eq!(c.data(), &[3.0, 7.0]);
    /// ```
    pub fn matrix_multiply(&self, other: &Tensor, channel: Channel) -> Result<Tensor, TensorError> {
        if self.num_axes() != 4 || other.num_axes() != 4 || self.width()? != other.height()? {
            return Err(TensorError::ShapeMismatch(
                self.shape.clone(),
                other.shape.clone(),
            ));
        }

        let (num, other_num) = (self.num()?, other.num()?);
        let (channels, other_channels) = (self.channels()?, other.channels()?);
        let (height, width) = (self.height()?, other.width()?);
        let mut result = Tensor::new(&[num * other_num, channels * other_channels, height, width])?;

        for n1 in 0..num {
            for n2 in 0..other_num {
                for c1 in 0..channels {
                    for c2 in 0..other_channels {
                        for h in 0..height {
                            let row = self.row([n1, c1], h, channel)?;
                            for w in 0..width {
                                let col = other.col([n2, c2], w, channel)?;
                                let value = row.mul(&col, channel)?;
                                let index = [n1 * other_num + n2, c1 * other_channels + c2, h, w];
                                result.set(&index, value, channel)?;
                            }
                        }
                    }
                }
            }
        }

        Ok(result)
    }

    /// Extracts row `h` of plane `(index[0], index[1])` as a `[1, 1, 1, width]` tensor.
    pub fn row(&self, index: [usize; 2], h: usize, channel: Channel) -> Result<Tensor, TensorError> {
        let width = self.width()?;
        let mut result = Tensor::new(&[1, 1, 1, width])?;
        for i in 0..width {
            let value = self.get(&[index[0], index[1], h, i], channel)?;
            result.set(&[0, 0, 0, i], value, channel)?;
        }
        Ok(result)
    }

    /// Extracts column `w` of plane `(index[0], index[1])` as a `[1, 1, 1, height]` tensor.
    pub fn col(&self, index: [usize; 2], w: usize, channel: Channel) -> Result<Tensor, TensorError> {
        let height = self.height()?;
        let mut result = Tensor::new(&[1, 1, 1, height])?;
        for i in 0..height {
            let value = self.get(&[index[0], index[1], i, w], channel)?;
            result.set(&[0, 0, 0, i], value, channel)?;
        }
        Ok(result)
    }
}
