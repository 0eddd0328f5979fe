use crate::Tensor;

impl bincode::enc::Encode for Tensor {
    fn encode<E: bincode::enc::Encoder>(
        &self,
        encoder: &mut E,
    ) -> Result<(), bincode::error::EncodeError> {
        bincode::Encode::encode(&self.shape, encoder)?;
        bincode::Encode::encode(&self.data, encoder)?;
        bincode::Encode::encode(&self.diff, encoder)?;
        Ok(())
    }
}

impl<C> bincode::de::Decode<C> for Tensor {
    fn decode<D: bincode::de::Decoder<Context = C>>(
        decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        let shape = bincode::Decode::decode(decoder)?;
        let data = bincode::Decode::decode(decoder)?;
        let diff = bincode::Decode::decode(decoder)?;
        Tensor::from_parts(shape, data, diff)
            .map_err(|e| bincode::error::DecodeError::OtherString(format!("Tensor error: {e}")))
    }
}
