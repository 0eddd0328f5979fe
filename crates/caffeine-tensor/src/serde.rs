use crate::Tensor;

use serde::ser::SerializeStruct;
use serde::Deserialize;

impl serde::Serialize for Tensor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("Tensor", 3)?;
        state.serialize_field("shape", &self.shape)?;
        state.serialize_field("data", &self.data)?;
        state.serialize_field("diff", &self.diff)?;
        state.end()
    }
}

impl<'de> serde::Deserialize<'de> for Tensor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct TensorData {
            shape: Vec<usize>,
            data: Vec<f64>,
            diff: Vec<f64>,
        }

        let TensorData { shape, data, diff } = TensorData::deserialize(deserializer)?;

        Tensor::from_parts(shape, data, diff).map_err(serde::de::Error::custom)
    }
}
