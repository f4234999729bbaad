//! Mapper trait

/// Trait for mapping functions
pub trait Mapper {
    /// Get the name of this mapper
    fn name(&self) -> &str;

    /// Map an input value to an output value
    fn map(&self, input: f64) -> f64;

    /// Map every value in `inputs`
    fn map_all(&self, inputs: &[f64]) -> Vec<f64> {
        inputs.iter().map(|&v| self.map(v)).collect()
    }
}
