use caffeine_tensor::{Tensor, TensorError};

use crate::{
    config::{ConvolutionParameter, LayerParameter, Phase},
    conv::{resolve_conv_geometry, ConvGeometry},
    error::ConvError,
};

/// Shapes derived by [`ConvolutionLayer::setup`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvSetup {
    /// The resolved spatial parameters.
    pub geometry: ConvGeometry,
    /// The number of input channels.
    pub channels: usize,
    /// The number of output channels.
    pub num_output: usize,
    /// The group count.
    pub group: usize,
    /// `[num_output, channels / group, kernel...]`
    pub weight_shape: Vec<usize>,
    /// `[num_output]` when the layer has a bias term.
    pub bias_shape: Option<Vec<usize>>,
}

/// A convolution layer: its configuration, its learned blobs and the shapes resolved
/// against its input.
#[derive(Clone, Debug)]
pub struct ConvolutionLayer {
    param: ConvolutionParameter,
    phase: Phase,
    blobs: Vec<Tensor>,
    setup: Option<ConvSetup>,
}

impl ConvolutionLayer {
    /// Creates the layer from its configuration, decoding any stored parameter blobs.
    ///
    /// # Errors
    ///
    /// [`ConvError::Tensor`] if a stored blob is malformed.
    pub fn new(layer: &LayerParameter) -> Result<Self, ConvError> {
        let blobs = layer
            .blobs
            .iter()
            .map(Tensor::from_proto)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            param: layer.convolution_param.clone().unwrap_or_default(),
            phase: layer.phase(),
            blobs,
            setup: None,
        })
    }

    /// The layer type name.
    pub fn layer_type(&self) -> &'static str {
        "Convolution"
    }

    /// The phase the layer runs in.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The convolution parameters.
    pub fn param(&self) -> &ConvolutionParameter {
        &self.param
    }

    /// The learned parameter blobs, weights first.
    pub fn blobs(&self) -> &[Tensor] {
        &self.blobs
    }

    /// The shapes resolved by the last successful [`ConvolutionLayer::setup`].
    pub fn setup_info(&self) -> Option<&ConvSetup> {
        self.setup.as_ref()
    }

    /// Resolves the layer geometry against its input blobs.
    ///
    /// All inputs must share the shape of the first one. Stored parameter blobs, if any,
    /// must match the weight and bias shapes implied by the configuration.
    ///
    /// # Errors
    ///
    /// [`ConvError::MissingInput`] without inputs, the resolution errors of
    /// [`resolve_conv_geometry`], [`ConvError::InvalidNumOutput`],
    /// [`ConvError::InvalidGroup`], [`ConvError::BlobCount`] or a
    /// [`TensorError::ShapeMismatch`] wrapped in [`ConvError::Tensor`].
    pub fn setup(&mut self, bottom: &[Tensor]) -> Result<&ConvSetup, ConvError> {
        let first = bottom.first().ok_or(ConvError::MissingInput)?;
        if let Some(other) = bottom.iter().find(|b| b.shape() != first.shape()) {
            return Err(TensorError::ShapeMismatch(first.shape().to_vec(), other.shape().to_vec()).into());
        }

        let geometry = resolve_conv_geometry(&self.param, first.num_axes())?;
        let channels = first.shape_at(geometry.channel_axis);

        let num_output = self.param.num_output() as usize;
        if num_output == 0 {
            return Err(ConvError::InvalidNumOutput);
        }
        let group = self.param.group() as usize;
        if group == 0 || channels % group != 0 || num_output % group != 0 {
            return Err(ConvError::InvalidGroup {
                group,
                channels,
                num_output,
            });
        }

        let mut weight_shape = vec![num_output, channels / group];
        weight_shape.extend_from_slice(&geometry.kernel_shape);
        let bias_shape = self.param.bias_term().then(|| vec![num_output]);

        if !self.blobs.is_empty() {
            let expected = 1 + usize::from(bias_shape.is_some());
            if self.blobs.len() != expected {
                return Err(ConvError::BlobCount {
                    expected,
                    actual: self.blobs.len(),
                });
            }
            let expected_shapes = std::iter::once(&weight_shape).chain(bias_shape.as_ref());
            for (blob, shape) in self.blobs.iter().zip(expected_shapes) {
                if blob.shape() != shape.as_slice() {
                    return Err(TensorError::ShapeMismatch(shape.clone(), blob.shape().to_vec()).into());
                }
            }
        } else {
            log::debug!("convolution layer has no stored blobs, weights {weight_shape:?} left to the caller");
        }

        let setup = self.setup.insert(ConvSetup {
            geometry,
            channels,
            num_output,
            group,
            weight_shape,
            bias_shape,
        });
        Ok(setup)
    }

    /// The shape of the output blob for `bottom`.
    ///
    /// Axes before the channel axis are kept, the channel axis becomes `num_output` and
    /// the spatial axes follow [`ConvGeometry::output_spatial_shape`].
    ///
    /// # Errors
    ///
    /// [`ConvError::NotSetUp`] before [`ConvolutionLayer::setup`], otherwise the errors of
    /// [`ConvGeometry::output_spatial_shape`].
    pub fn output_shape(&self, bottom: &Tensor) -> Result<Vec<usize>, ConvError> {
        let setup = self.setup.as_ref().ok_or(ConvError::NotSetUp)?;
        let channel_axis = setup.geometry.channel_axis;
        let shape = bottom.shape();
        if shape.len() <= channel_axis {
            return Err(ConvError::SpatialRankMismatch {
                expected: setup.geometry.num_spatial_axes,
                actual: 0,
            });
        }

        let mut output = shape[..channel_axis].to_vec();
        output.push(setup.num_output);
        output.extend(setup.geometry.output_spatial_shape(&shape[channel_axis + 1..])?);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use caffeine_tensor::Channel;

    use super::*;

    fn layer_param(param: ConvolutionParameter, blobs: &[Tensor]) -> LayerParameter {
        LayerParameter {
            name: Some("conv".to_string()),
            r#type: Some("Convolution".to_string()),
            blobs: blobs.iter().map(|b| b.to_proto(false)).collect(),
            convolution_param: Some(param),
            ..Default::default()
        }
    }

    fn conv_param(num_output: u32, kernel: u32) -> ConvolutionParameter {
        ConvolutionParameter {
            num_output: Some(num_output),
            kernel_size: vec![kernel],
            ..Default::default()
        }
    }

    #[test]
    fn setup_without_blobs() -> Result<(), ConvError> {
        let mut layer = ConvolutionLayer::new(&layer_param(conv_param(8, 3), &[]))?;
        assert_eq!(layer.layer_type(), "Convolution");
        assert_eq!(layer.phase(), Phase::Train);

        let bottom = Tensor::new(&[2, 3, 10, 10])?;
        let setup = layer.setup(std::slice::from_ref(&bottom))?;
        assert_eq!(setup.channels, 3);
        assert_eq!(setup.weight_shape, vec![8, 3, 3, 3]);
        assert_eq!(setup.bias_shape, Some(vec![8]));
        assert_eq!(layer.output_shape(&bottom)?, vec![2, 8, 8, 8]);
        Ok(())
    }

    #[test]
    fn setup_with_matching_blobs() -> Result<(), ConvError> {
        let weights = Tensor::from_shape_val(&[4, 1, 3, 3], 0.5, Channel::Data)?;
        let bias = Tensor::from_shape_val(&[4], 0.1, Channel::Data)?;
        let param = ConvolutionParameter {
            group: Some(2),
            ..conv_param(4, 3)
        };
        let mut layer = ConvolutionLayer::new(&layer_param(param, &[weights.clone(), bias]))?;
        assert_eq!(layer.blobs()[0], weights);

        let setup = layer.setup(&[Tensor::new(&[1, 2, 5, 5])?])?;
        assert_eq!(setup.group, 2);
        assert_eq!(setup.weight_shape, vec![4, 1, 3, 3]);
        Ok(())
    }

    #[test]
    fn setup_rejects_mismatched_blobs() -> Result<(), ConvError> {
        let weights = Tensor::new(&[4, 2, 5, 5])?;
        let param = ConvolutionParameter {
            bias_term: Some(false),
            ..conv_param(4, 3)
        };
        let mut layer = ConvolutionLayer::new(&layer_param(param.clone(), &[weights.clone()]))?;
        assert!(matches!(
            layer.setup(&[Tensor::new(&[1, 2, 5, 5])?]),
            Err(ConvError::Tensor(TensorError::ShapeMismatch(..)))
        ));

        let mut layer = ConvolutionLayer::new(&layer_param(param, &[weights.clone(), weights]))?;
        assert!(matches!(
            layer.setup(&[Tensor::new(&[1, 2, 5, 5])?]),
            Err(ConvError::BlobCount { expected: 1, actual: 2 })
        ));
        Ok(())
    }

    #[test]
    fn setup_rejects_bad_inputs() -> Result<(), ConvError> {
        let mut layer = ConvolutionLayer::new(&layer_param(conv_param(4, 3), &[]))?;
        assert!(matches!(layer.setup(&[]), Err(ConvError::MissingInput)));
        assert!(matches!(
            layer.setup(&[Tensor::new(&[1, 2, 5, 5])?, Tensor::new(&[1, 2, 5, 4])?]),
            Err(ConvError::Tensor(TensorError::ShapeMismatch(..)))
        ));
        assert!(matches!(
            layer.output_shape(&Tensor::new(&[1, 2, 5, 5])?),
            Err(ConvError::NotSetUp)
        ));

        let mut layer = ConvolutionLayer::new(&layer_param(conv_param(0, 3), &[]))?;
        assert!(matches!(
            layer.setup(&[Tensor::new(&[1, 2, 5, 5])?]),
            Err(ConvError::InvalidNumOutput)
        ));

        let param = ConvolutionParameter {
            group: Some(3),
            ..conv_param(6, 3)
        };
        let mut layer = ConvolutionLayer::new(&layer_param(param, &[]))?;
        assert!(matches!(
            layer.setup(&[Tensor::new(&[1, 2, 5, 5])?]),
            Err(ConvError::InvalidGroup { group: 3, channels: 2, num_output: 6 })
        ));
        Ok(())
    }

    #[test]
    fn new_rejects_malformed_blob() {
        let mut param = layer_param(conv_param(1, 1), &[]);
        param.blobs.push(caffeine_tensor::BlobProto {
            shape: Some(caffeine_tensor::BlobShape { dim: vec![2] }),
            double_data: vec![1.0],
            ..Default::default()
        });
        assert!(matches!(
            ConvolutionLayer::new(&param),
            Err(ConvError::Tensor(TensorError::LengthMismatch { .. }))
        ));
    }
}
