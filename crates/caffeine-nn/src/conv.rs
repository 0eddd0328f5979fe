use std::fmt;

use caffeine_tensor::tensor::canonical_axis_index;

use crate::{config::ConvolutionParameter, error::ConvError};

/// A per-spatial-axis convolution field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpatialField {
    /// The kernel extent, no default.
    Kernel,
    /// The stride, defaults to 1.
    Stride,
    /// The zero-padding, defaults to 0.
    Pad,
    /// The dilation, defaults to 1.
    Dilation,
}

impl SpatialField {
    /// The value used for every spatial axis when the list form is empty.
    pub fn default_value(self) -> Option<usize> {
        match self {
            Self::Kernel => None,
            Self::Stride | Self::Dilation => Some(1),
            Self::Pad => Some(0),
        }
    }

    /// Whether a resolved entry must be strictly positive.
    pub fn requires_positive(self) -> bool {
        !matches!(self, Self::Pad)
    }
}

impl fmt::Display for SpatialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Kernel => "kernel_size",
            Self::Stride => "stride",
            Self::Pad => "pad",
            Self::Dilation => "dilation",
        };
        write!(f, "{name}")
    }
}

/// The canonical convolution parameters, one entry per spatial axis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvGeometry {
    /// The canonical channel axis of the input.
    pub channel_axis: usize,
    /// The number of axes following the channel axis.
    pub num_spatial_axes: usize,
    /// The kernel extent along each spatial axis.
    pub kernel_shape: Vec<usize>,
    /// The stride along each spatial axis.
    pub stride: Vec<usize>,
    /// The zero-padding along each spatial axis.
    pub pad: Vec<usize>,
    /// The dilation along each spatial axis.
    pub dilation: Vec<usize>,
    /// Whether the convolution is a plain 1x1 with unit stride and no padding.
    pub is_1x1: bool,
    /// Whether the N-D im2col path is forced.
    pub force_nd_im2col: bool,
}

impl ConvGeometry {
    /// Computes the output extent along each spatial axis.
    ///
    /// Each axis yields `(input + 2 * pad - (dilation * (kernel - 1) + 1)) / stride + 1`.
    ///
    /// # Errors
    ///
    /// [`ConvError::SpatialRankMismatch`] if `input` does not have one extent per spatial
    /// axis and [`ConvError::KernelExceedsInput`] if a dilated kernel does not fit.
    pub fn output_spatial_shape(&self, input: &[usize]) -> Result<Vec<usize>, ConvError> {
        if input.len() != self.num_spatial_axes {
            return Err(ConvError::SpatialRankMismatch {
                expected: self.num_spatial_axes,
                actual: input.len(),
            });
        }

        input
            .iter()
            .enumerate()
            .map(|(axis, &extent)| {
                let padded = extent + 2 * self.pad[axis];
                let kernel = self.dilation[axis] * (self.kernel_shape[axis] - 1) + 1;
                if padded < kernel {
                    return Err(ConvError::KernelExceedsInput {
                        axis,
                        input: padded,
                        kernel,
                    });
                }
                Ok((padded - kernel) / self.stride[axis] + 1)
            })
            .collect()
    }
}

/// Resolves one spatial field into one value per spatial axis.
///
/// `height_width` is the `*_h`/`*_w` form, present when either entry is non-zero; it is
/// only valid for 2 spatial axes and an empty `list`. Otherwise `list` must hold zero
/// values (the field default), one value (broadcast) or one value per spatial axis.
///
/// # Errors
///
/// [`ConvError::ConflictingSpecification`], [`ConvError::InvalidSpecificationCount`] or
/// [`ConvError::NonPositiveDimension`].
///
/// # Example
///
/// ```
/// use caffeine_nn::conv::{resolve_spatial_field, SpatialField};
///
/// let kernel = resolve_spatial_field(SpatialField::Kernel, None, &[3], 2).unwrap();
/// assert_eq!(kernel, vec![3, 3]);
///
/// let stride = resolve_spatial_field(SpatialField::Stride, None, &[], 3).unwrap();
/// assert_eq!(stride, vec![1, 1, 1]);
///
/// let pad = resolve_spatial_field(SpatialField::Pad, Some((2, 3)), &[], 2).unwrap();
/// assert_eq!(pad, vec![2, 3]);
/// ```
pub fn resolve_spatial_field(
    field: SpatialField,
    height_width: Option<(u32, u32)>,
    list: &[u32],
    num_spatial_axes: usize,
) -> Result<Vec<usize>, ConvError> {
    let values = match height_width.filter(|&(h, w)| h > 0 || w > 0) {
        Some((h, w)) => {
            if num_spatial_axes != 2 {
                return Err(ConvError::ConflictingSpecification {
                    field,
                    reason: format!(
                        "{field}_h & {field}_w can only be used for 2D convolution, got {num_spatial_axes} spatial axes"
                    ),
                });
            }
            if !list.is_empty() {
                return Err(ConvError::ConflictingSpecification {
                    field,
                    reason: format!("either {field} or {field}_h/w should be specified, not both"),
                });
            }
            vec![h as usize, w as usize]
        }
        None => match (list, field.default_value()) {
            ([], Some(default)) => vec![default; num_spatial_axes],
            ([value], _) => vec![*value as usize; num_spatial_axes],
            (values, _) if !values.is_empty() && values.len() == num_spatial_axes => {
                values.iter().map(|&v| v as usize).collect()
            }
            (values, _) => {
                return Err(ConvError::InvalidSpecificationCount {
                    field,
                    count: values.len(),
                    num_spatial_axes,
                })
            }
        },
    };

    if field.requires_positive() {
        if let Some(axis) = values.iter().position(|&v| v == 0) {
            return Err(ConvError::NonPositiveDimension { field, axis });
        }
    }

    Ok(values)
}

/// Resolves the convolution parameters for an input with `num_axes` axes.
///
/// The channel axis is `param.axis` resolved against `num_axes`; every following axis is
/// spatial. Kernel, stride, pad and dilation are resolved independently, in that order,
/// and the first failure is returned.
///
/// # Errors
///
/// [`ConvError::Tensor`] if the channel axis is out of range, otherwise the errors of
/// [`resolve_spatial_field`].
pub fn resolve_conv_geometry(
    param: &ConvolutionParameter,
    num_axes: usize,
) -> Result<ConvGeometry, ConvError> {
    let channel_axis = canonical_axis_index(param.axis(), num_axes)?;
    let num_spatial_axes = num_axes - channel_axis - 1;

    let kernel_shape = resolve_spatial_field(
        SpatialField::Kernel,
        Some((param.kernel_h(), param.kernel_w())),
        &param.kernel_size,
        num_spatial_axes,
    )?;
    let stride = resolve_spatial_field(
        SpatialField::Stride,
        Some((param.stride_h(), param.stride_w())),
        &param.stride,
        num_spatial_axes,
    )?;
    let pad = resolve_spatial_field(
        SpatialField::Pad,
        Some((param.pad_h(), param.pad_w())),
        &param.pad,
        num_spatial_axes,
    )?;
    let dilation = resolve_spatial_field(
        SpatialField::Dilation,
        None,
        &param.dilation,
        num_spatial_axes,
    )?;

    let is_1x1 = kernel_shape.iter().all(|&k| k == 1)
        && stride.iter().all(|&s| s == 1)
        && pad.iter().all(|&p| p == 0);

    let geometry = ConvGeometry {
        channel_axis,
        num_spatial_axes,
        kernel_shape,
        stride,
        pad,
        dilation,
        is_1x1,
        force_nd_im2col: param.force_nd_im2col(),
    };
    log::debug!("resolved convolution geometry {geometry:?}");

    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use caffeine_tensor::TensorError;

    use super::*;

    fn kernel(list: &[u32]) -> ConvolutionParameter {
        ConvolutionParameter {
            kernel_size: list.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn kernel_broadcast_and_per_axis() -> Result<(), ConvError> {
        assert_eq!(resolve_conv_geometry(&kernel(&[3]), 4)?.kernel_shape, vec![3, 3]);
        assert_eq!(resolve_conv_geometry(&kernel(&[3, 5]), 4)?.kernel_shape, vec![3, 5]);
        assert_eq!(
            resolve_conv_geometry(&kernel(&[3, 5, 7]), 5)?.kernel_shape,
            vec![3, 5, 7]
        );
        Ok(())
    }

    #[test]
    fn kernel_invalid_count() {
        assert!(matches!(
            resolve_conv_geometry(&kernel(&[3, 5, 7]), 4),
            Err(ConvError::InvalidSpecificationCount {
                field: SpatialField::Kernel,
                count: 3,
                num_spatial_axes: 2
            })
        ));
        assert!(matches!(
            resolve_conv_geometry(&kernel(&[]), 4),
            Err(ConvError::InvalidSpecificationCount {
                field: SpatialField::Kernel,
                count: 0,
                ..
            })
        ));
    }

    #[test]
    fn kernel_height_width() -> Result<(), ConvError> {
        let param = ConvolutionParameter {
            kernel_h: Some(3),
            kernel_w: Some(5),
            ..Default::default()
        };
        assert_eq!(resolve_conv_geometry(&param, 4)?.kernel_shape, vec![3, 5]);

        let both = ConvolutionParameter {
            kernel_size: vec![3],
            ..param.clone()
        };
        assert!(matches!(
            resolve_conv_geometry(&both, 4),
            Err(ConvError::ConflictingSpecification { field: SpatialField::Kernel, .. })
        ));
        assert!(matches!(
            resolve_conv_geometry(&param, 5),
            Err(ConvError::ConflictingSpecification { field: SpatialField::Kernel, .. })
        ));
        Ok(())
    }

    #[test]
    fn kernel_missing_width_is_zero() {
        let param = ConvolutionParameter {
            kernel_h: Some(3),
            ..Default::default()
        };
        assert!(matches!(
            resolve_conv_geometry(&param, 4),
            Err(ConvError::NonPositiveDimension { field: SpatialField::Kernel, axis: 1 })
        ));
    }

    #[test]
    fn zero_kernel_and_stride_rejected() {
        assert!(matches!(
            resolve_conv_geometry(&kernel(&[3, 0]), 4),
            Err(ConvError::NonPositiveDimension { field: SpatialField::Kernel, axis: 1 })
        ));
        let param = ConvolutionParameter {
            stride: vec![0],
            ..kernel(&[3])
        };
        assert!(matches!(
            resolve_conv_geometry(&param, 4),
            Err(ConvError::NonPositiveDimension { field: SpatialField::Stride, axis: 0 })
        ));
    }

    #[test]
    fn stride_and_pad_defaults() -> Result<(), ConvError> {
        let geometry = resolve_conv_geometry(&kernel(&[3]), 4)?;
        assert_eq!(geometry.stride, vec![1, 1]);
        assert_eq!(geometry.pad, vec![0, 0]);
        assert_eq!(geometry.dilation, vec![1, 1]);
        assert_eq!(geometry.channel_axis, 1);
        assert_eq!(geometry.num_spatial_axes, 2);
        assert!(!geometry.is_1x1);
        Ok(())
    }

    #[test]
    fn stride_invalid_count() {
        let param = ConvolutionParameter {
            stride: vec![1, 2, 3],
            ..kernel(&[3])
        };
        assert!(matches!(
            resolve_conv_geometry(&param, 4),
            Err(ConvError::InvalidSpecificationCount { field: SpatialField::Stride, .. })
        ));
    }

    #[test]
    fn pad_height_width_requires_2d() {
        let param = ConvolutionParameter {
            pad_h: Some(2),
            pad_w: Some(3),
            ..kernel(&[3])
        };
        assert!(matches!(
            resolve_conv_geometry(&param, 5),
            Err(ConvError::ConflictingSpecification { field: SpatialField::Pad, .. })
        ));
        assert_eq!(
            resolve_spatial_field(SpatialField::Pad, Some((2, 3)), &[], 3).unwrap_err().to_string(),
            "Conflicting pad specification: pad_h & pad_w can only be used for 2D convolution, got 3 spatial axes"
        );
    }

    #[test]
    fn pad_zero_is_allowed() -> Result<(), ConvError> {
        assert_eq!(
            resolve_spatial_field(SpatialField::Pad, None, &[0, 2], 2)?,
            vec![0, 2]
        );
        Ok(())
    }

    #[test]
    fn dilation() -> Result<(), ConvError> {
        let param = ConvolutionParameter {
            dilation: vec![2],
            ..kernel(&[3])
        };
        assert_eq!(resolve_conv_geometry(&param, 4)?.dilation, vec![2, 2]);

        let param = ConvolutionParameter {
            dilation: vec![0, 1],
            ..kernel(&[3])
        };
        assert!(matches!(
            resolve_conv_geometry(&param, 4),
            Err(ConvError::NonPositiveDimension { field: SpatialField::Dilation, axis: 0 })
        ));
        Ok(())
    }

    #[test]
    fn channel_axis_from_end() -> Result<(), ConvError> {
        let param = ConvolutionParameter {
            axis: Some(-2),
            ..kernel(&[5])
        };
        let geometry = resolve_conv_geometry(&param, 3)?;
        assert_eq!(geometry.channel_axis, 1);
        assert_eq!(geometry.kernel_shape, vec![5]);

        let param = ConvolutionParameter {
            axis: Some(4),
            ..kernel(&[5])
        };
        assert!(matches!(
            resolve_conv_geometry(&param, 4),
            Err(ConvError::Tensor(TensorError::AxisOutOfRange { axis: 4, num_axes: 4 }))
        ));
        Ok(())
    }

    #[test]
    fn one_by_one() -> Result<(), ConvError> {
        let param = ConvolutionParameter {
            force_nd_im2col: Some(true),
            ..kernel(&[1])
        };
        let geometry = resolve_conv_geometry(&param, 4)?;
        assert!(geometry.is_1x1);
        assert!(geometry.force_nd_im2col);
        Ok(())
    }

    #[test]
    fn output_spatial_shape() -> Result<(), ConvError> {
        let param = ConvolutionParameter {
            stride: vec![2],
            pad: vec![1],
            dilation: vec![1, 2],
            ..kernel(&[3])
        };
        let geometry = resolve_conv_geometry(&param, 4)?;
        // (7 + 2 - 3) / 2 + 1 and (7 + 2 - 5) / 2 + 1
        assert_eq!(geometry.output_spatial_shape(&[7, 7])?, vec![4, 3]);
        assert!(matches!(
            geometry.output_spatial_shape(&[7]),
            Err(ConvError::SpatialRankMismatch { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            geometry.output_spatial_shape(&[1, 2]),
            Err(ConvError::KernelExceedsInput { axis: 1, input: 4, kernel: 5 })
        ));
        Ok(())
    }
}
