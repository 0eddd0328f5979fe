use crate::tensor::{Tensor, TensorError};

/// The historical num/channels/height/width view over a general shape.
///
/// The accessors are only defined for shapes with at most 4 axes. Axes missing from a
/// shorter shape read as length 1.
///
/// # Example
///
/// ```
/// use caffeine_tensor::{LegacyShape, Tensor};
///
/// let t = Tensor::new(&[2, 3]).unwrap();
/// assert_eq!(t.num().unwrap(), 2);
/// assert_eq!(t.channels().unwrap(), 3);
/// assert_eq!(t.height().unwrap(), 1);
/// assert_eq!(t.width().unwrap(), 1);
/// ```
pub trait LegacyShape {
    /// The general shape the legacy accessors read from.
    fn shape(&self) -> &[usize];

    /// The length of axis `index`, counting negative values from the end.
    ///
    /// Returns 1 when `index` is outside `[-num_axes, num_axes)`.
    ///
    /// # Errors
    ///
    /// [`TensorError::ContractViolation`] if the shape has more than 4 axes.
    fn legacy_axis(&self, index: isize) -> Result<usize, TensorError> {
        let shape = self.shape();
        let num_axes = shape.len() as isize;
        if num_axes > 4 {
            return Err(TensorError::ContractViolation(format!(
                "legacy accessors used on a shape with {num_axes} axes"
            )));
        }
        if index >= num_axes || index < -num_axes {
            return Ok(1);
        }
        let axis = if index < 0 { index + num_axes } else { index };
        Ok(shape[axis as usize])
    }

    /// Legacy axis 0.
    fn num(&self) -> Result<usize, TensorError> {
        self.legacy_axis(0)
    }

    /// Legacy axis 1.
    fn channels(&self) -> Result<usize, TensorError> {
        self.legacy_axis(1)
    }

    /// Legacy axis 2.
    fn height(&self) -> Result<usize, TensorError> {
        self.legacy_axis(2)
    }

    /// Legacy axis 3.
    fn width(&self) -> Result<usize, TensorError> {
        self.legacy_axis(3)
    }
}

impl LegacyShape for Tensor {
    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl LegacyShape for [usize] {
    fn shape(&self) -> &[usize] {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_rank_four() -> Result<(), TensorError> {
        let t = Tensor::new(&[2, 3, 4, 5])?;
        assert_eq!(t.num()?, 2);
        assert_eq!(t.channels()?, 3);
        assert_eq!(t.height()?, 4);
        assert_eq!(t.width()?, 5);
        assert_eq!(t.legacy_axis(-1)?, 5);
        assert_eq!(t.legacy_axis(-4)?, 2);
        Ok(())
    }

    #[test]
    fn legacy_missing_axes_broadcast() -> Result<(), TensorError> {
        let shape: &[usize] = &[7];
        assert_eq!(shape.num()?, 7);
        assert_eq!(shape.channels()?, 1);
        assert_eq!(shape.legacy_axis(-2)?, 1);
        assert_eq!(shape.legacy_axis(-1)?, 7);
        Ok(())
    }

    #[test]
    fn legacy_rejects_rank_five() -> Result<(), TensorError> {
        let t = Tensor::new(&[1, 1, 1, 1, 1])?;
        let err = t.num().unwrap_err();
        assert!(!err.is_recoverable());
        Ok(())
    }
}
