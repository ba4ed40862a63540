use indexmap::IndexMap;
use serde::{ser::SerializeStruct, Deserialize, Deserializer, Serialize, Serializer};

use super::SimilarityMatrix;

impl Serialize for SimilarityMatrix {
    /// Only the rows are written; the similarity-ordered sets are derived
    /// data and get rebuilt on load.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("SimilarityMatrix", 1)?;
        state.serialize_field("rows", &self.rows)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for SimilarityMatrix {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct MatrixHelper {
            rows: IndexMap<Box<str>, IndexMap<Box<str>, f64>>,
        }

        let helper = MatrixHelper::deserialize(deserializer)?;
        Ok(SimilarityMatrix::from_rows(helper.rows))
    }
}
