use crate::{common::*, params};

/// Run configuration. Every knob of the algorithm lives here; the defaults
/// reproduce the reference behavior (fixed relative input paths, 300 L-BFGS
/// steps, 1:10000 content:style weighting, noise initialization).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_content_file")]
    pub content_file: PathBuf,
    #[serde(default = "default_style_file")]
    pub style_file: PathBuf,
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
    /// Pre-trained VGG-19 weights in tch format, variables named after
    /// torchvision's `features.<idx>` layout.
    #[serde(default = "default_weights_file")]
    pub weights_file: PathBuf,
    #[serde(default = "default_steps")]
    pub steps: usize,
    #[serde(default = "default_content_weight")]
    pub content_weight: f64,
    #[serde(default = "default_style_weight")]
    pub style_weight: f64,
    #[serde(default = "default_content_layers")]
    pub content_layers: Vec<String>,
    #[serde(default = "default_style_layers")]
    pub style_layers: Vec<String>,
    /// One positive weight per style layer; the reference uses a uniform 0.2.
    #[serde(default = "default_style_layer_weights")]
    pub style_layer_weights: Vec<f64>,
    #[serde(default)]
    pub init: InitKind,
    #[serde(
        serialize_with = "serialize_device",
        deserialize_with = "deserialize_device",
        default = "default_device"
    )]
    pub device: Device,
}

/// Initialization of the generated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitKind {
    /// Standard-normal noise.
    #[serde(rename = "noise")]
    Noise,
    /// Clone of the preprocessed content image.
    #[serde(rename = "content")]
    Content,
}

impl Default for InitKind {
    fn default() -> Self {
        Self::Noise
    }
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = fs::read_to_string(path)?;
        let config: Self = json5::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.steps >= 1, "steps must be at least 1");
        ensure!(
            self.content_weight > 0.0 && self.style_weight > 0.0,
            "loss weights must be positive"
        );
        ensure!(
            !self.content_layers.is_empty() && !self.style_layers.is_empty(),
            "content and style layer selections must not be empty"
        );
        ensure!(
            self.style_layer_weights.len() == self.style_layers.len(),
            "expected {} style layer weights, found {}",
            self.style_layers.len(),
            self.style_layer_weights.len()
        );
        ensure!(
            self.style_layer_weights.iter().all(|&weight| weight > 0.0),
            "style layer weights must be positive"
        );
        params::layer_indexes(&self.content_layers)?;
        params::layer_indexes(&self.style_layers)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content_file: default_content_file(),
            style_file: default_style_file(),
            output_file: default_output_file(),
            weights_file: default_weights_file(),
            steps: default_steps(),
            content_weight: default_content_weight(),
            style_weight: default_style_weight(),
            content_layers: default_content_layers(),
            style_layers: default_style_layers(),
            style_layer_weights: default_style_layer_weights(),
            init: InitKind::default(),
            device: default_device(),
        }
    }
}

fn default_content_file() -> PathBuf {
    PathBuf::from("neckarfront.jpg")
}

fn default_style_file() -> PathBuf {
    PathBuf::from("starry_night.jpg")
}

fn default_output_file() -> PathBuf {
    PathBuf::from("result.jpg")
}

fn default_weights_file() -> PathBuf {
    PathBuf::from("vgg19.ot")
}

fn default_steps() -> usize {
    params::NUM_STEPS
}

fn default_content_weight() -> f64 {
    params::CONTENT_WEIGHT
}

fn default_style_weight() -> f64 {
    params::STYLE_WEIGHT
}

fn default_content_layers() -> Vec<String> {
    params::CONTENT_LAYERS.iter().map(|&s| s.into()).collect()
}

fn default_style_layers() -> Vec<String> {
    params::STYLE_LAYERS.iter().map(|&s| s.into()).collect()
}

fn default_style_layer_weights() -> Vec<f64> {
    params::STYLE_LAYER_WEIGHTS.to_vec()
}

fn default_device() -> Device {
    Device::cuda_if_available()
}

fn serialize_device<S>(device: &Device, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let text = match device {
        Device::Cpu => "cpu".into(),
        Device::Cuda(n) => format!("cuda({})", n),
    };
    text.serialize(serializer)
}

fn deserialize_device<'de, D>(deserializer: D) -> Result<Device, D::Error>
where
    D: Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    let device = match name.as_str() {
        "cpu" => Device::Cpu,
        _ => {
            let prefix = "cuda(";
            let suffix = ")";
            if name.starts_with(prefix) && name.ends_with(suffix) {
                let number: usize = name[(prefix.len())..(name.len() - suffix.len())]
                    .parse()
                    .map_err(|_err| D::Error::custom(format!("invalid device name {}", name)))?;
                Device::Cuda(number)
            } else {
                return Err(D::Error::custom(format!("invalid device name {}", name)));
            }
        }
    };
    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: Config = json5::from_str(
            r#"{
                content_file: "photo.jpg",
                steps: 50,
                device: "cpu",
            }"#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.content_file, PathBuf::from("photo.jpg"));
        assert_eq!(config.steps, 50);
        assert_eq!(config.style_weight, params::STYLE_WEIGHT);
        assert_eq!(config.device, Device::Cpu);
        assert_eq!(config.init, InitKind::Noise);
    }

    #[test]
    fn mismatched_style_weights_are_rejected() {
        let config = Config {
            style_layer_weights: vec![0.5, 0.5],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_layer_names_are_rejected() {
        let config = Config {
            content_layers: vec!["conv9_9".into()],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
