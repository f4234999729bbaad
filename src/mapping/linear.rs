//! Linear range mapping

use super::Mapper;

/// Map `input` from `in_min..in_max` onto `out_min..out_max` without clamping
pub fn map_range(input: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    let in_range = in_max - in_min;
    if in_range.abs() < f64::EPSILON {
        return out_min;
    }
    out_min + (input - in_min) / in_range * (out_max - out_min)
}

/// Linear interpolation mapper
#[derive(Debug, Clone, PartialEq)]
pub struct LinearMapper {
    name: String,
    in_min: f64,
    in_max: f64,
    out_min: f64,
    out_max: f64,
    clamp: bool,
}

impl LinearMapper {
    /// Create a new linear mapper
    pub fn new(
        name: impl Into<String>,
        in_min: f64,
        in_max: f64,
        out_min: f64,
        out_max: f64,
    ) -> Self {
        Self {
            name: name.into(),
            in_min,
            in_max,
            out_min,
            out_max,
            clamp: true,
        }
    }

    /// Set whether to clamp output to range
    pub fn with_clamp(mut self, clamp: bool) -> Self {
        self.clamp = clamp;
        self
    }

    pub fn input_range(&self) -> (f64, f64) {
        (self.in_min, self.in_max)
    }

    pub fn output_range(&self) -> (f64, f64) {
        (self.out_min, self.out_max)
    }

    /// The mapper going the other way
    pub fn inverse(&self) -> Self {
        Self {
            name: format!("{}_inv", self.name),
            in_min: self.out_min,
            in_max: self.out_max,
            out_min: self.in_min,
            out_max: self.in_max,
            clamp: self.clamp,
        }
    }
}

impl Mapper for LinearMapper {
    fn name(&self) -> &str {
        &self.name
    }

    fn map(&self, input: f64) -> f64 {
        let output = map_range(input, self.in_min, self.in_max, self.out_min, self.out_max);
        if self.clamp {
            output.clamp(self.out_min.min(self.out_max), self.out_min.max(self.out_max))
        } else {
            output
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_mapper_basic() {
        let mapper = LinearMapper::new("test", 0.0, 100.0, 0.0, 1.0);

        assert_eq!(mapper.map(0.0), 0.0);
        assert_eq!(mapper.map(50.0), 0.5);
        assert_eq!(mapper.map(100.0), 1.0);
    }

    #[test]
    fn test_linear_mapper_inverted() {
        let mapper = LinearMapper::new("test", 0.0, 100.0, 1.0, 0.0);

        assert_eq!(mapper.map(0.0), 1.0);
        assert_eq!(mapper.map(50.0), 0.5);
        assert_eq!(mapper.map(100.0), 0.0);
    }

    #[test]
    fn test_linear_mapper_clamped() {
        let mapper = LinearMapper::new("test", 0.0, 100.0, 0.0, 1.0);

        assert_eq!(mapper.map(-50.0), 0.0);
        assert_eq!(mapper.map(150.0), 1.0);
    }

    #[test]
    fn test_linear_mapper_unclamped() {
        let mapper = LinearMapper::new("test", 0.0, 100.0, 0.0, 1.0).with_clamp(false);

        assert_eq!(mapper.map(-50.0), -0.5);
        assert_eq!(mapper.map(150.0), 1.5);
    }

    #[test]
    fn test_knob_to_note() {
        // 0..255 knob -> note 12..75.75, a quarter semitone per step
        let mapper = LinearMapper::new("center", 0.0, 255.0, 12.0, 75.75);

        assert_eq!(mapper.map(0.0), 12.0);
        assert_eq!(mapper.map(127.5), 43.875);
        assert_eq!(mapper.map(255.0), 75.75);
        assert_eq!(mapper.inverse().map(43.875), 127.5);
    }

    #[test]
    fn test_map_range_degenerate_input() {
        assert_eq!(map_range(5.0, 3.0, 3.0, 10.0, 20.0), 10.0);
        assert_eq!(map_range(0.5, 0.0, 1.0, 20.0, 20000.0), 10010.0);
    }
}
