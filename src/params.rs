use crate::common::*;

/// Names of the 16 convolutional layers of VGG-19, in network order. The
/// feature map collection returned by the extractor follows this order.
pub const LAYER_NAMES: [&str; 16] = [
    "conv1_1", "conv1_2",
    "conv2_1", "conv2_2",
    "conv3_1", "conv3_2", "conv3_3", "conv3_4",
    "conv4_1", "conv4_2", "conv4_3", "conv4_4",
    "conv5_1", "conv5_2", "conv5_3", "conv5_4",
];

// default layer selections, per Gatys et al.
pub const CONTENT_LAYERS: &[&str] = &["conv4_2"];
pub const STYLE_LAYERS: &[&str] = &["conv1_1", "conv2_1", "conv3_1", "conv4_1", "conv5_1"];
pub const STYLE_LAYER_WEIGHTS: &[f64] = &[0.2, 0.2, 0.2, 0.2, 0.2];

// hyper-parameters: loss weighting; Gatys suggests a style:content ratio
// between 1000:1 and 10000:1
pub const CONTENT_WEIGHT: f64 = 1.0;
pub const STYLE_WEIGHT: f64 = 10000.0;

// hyper-parameters: optimization
pub const NUM_STEPS: usize = 300;  // fixed iteration budget, no convergence check
pub const LBFGS_HISTORY_SIZE: usize = 10;  // curvature pairs kept for the two-loop recursion
pub const LBFGS_MAX_EVALS: usize = 20;  // loss evaluations per line search
pub const LBFGS_SUFFICIENT_DECREASE: f64 = 1e-4;  // Armijo constant
pub const LBFGS_CURVATURE_EPS: f64 = 1e-10;  // reject near-zero curvature pairs

lazy_static::lazy_static! {
    static ref LAYER_INDEXES: HashMap<&'static str, usize> = LAYER_NAMES
        .iter()
        .enumerate()
        .map(|(index, name)| (*name, index))
        .collect();
}

/// Resolves a human-readable layer name to its position in the feature map
/// collection.
pub fn layer_index(name: &str) -> Result<usize> {
    LAYER_INDEXES
        .get(name)
        .copied()
        .ok_or_else(|| format_err!(r#"unknown layer name "{}""#, name))
}

pub fn layer_indexes(names: &[String]) -> Result<Vec<usize>> {
    names.iter().map(|name| layer_index(name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_indexes_follow_network_order() {
        assert_eq!(layer_index("conv1_1").unwrap(), 0);
        assert_eq!(layer_index("conv4_2").unwrap(), 9);
        assert_eq!(layer_index("conv5_4").unwrap(), 15);
        assert!(layer_index("conv6_1").is_err());
    }
}
