use crate::common::*;

// (torchvision `features` index, input channels, output channels) for the 16
// convolutional layers of VGG-19. Using torchvision's indices as variable
// names lets an exported torchvision weight file load without remapping.
const CONV_LAYERS: [(i64, i64, i64); 16] = [
    (0, 3, 64),
    (2, 64, 64),
    (5, 64, 128),
    (7, 128, 128),
    (10, 128, 256),
    (12, 256, 256),
    (14, 256, 256),
    (16, 256, 256),
    (19, 256, 512),
    (21, 512, 512),
    (23, 512, 512),
    (25, 512, 512),
    (28, 512, 512),
    (30, 512, 512),
    (32, 512, 512),
    (34, 512, 512),
];

// positions (in CONV_LAYERS order) of the last conv of each of the first four
// stages; a 2x2 pooling runs after its activation
const POOL_AFTER: [usize; 4] = [1, 3, 7, 11];

/// Builds the fixed VGG-19 measurement function. The returned closure maps an
/// image tensor of shape (1, 3, H, W) to the outputs of all 16 convolutional
/// layers in network order, taken before the activation as in the original
/// formulation.
///
/// VGG's max-pooling layers are replaced with average-pooling of the same
/// kernel and stride (Gatys et al. suggest this for style synthesis). The
/// substitution applies to every pass through the network, so content, style,
/// and generated features are all measured with the same function.
///
/// The caller is expected to load pre-trained weights into the var store and
/// freeze it; nothing here updates a parameter.
pub fn feature_extractor<'p, P>(path: P) -> Box<dyn Fn(&Tensor) -> Vec<Tensor> + Send>
where
    P: Borrow<nn::Path<'p>>,
{
    let path = path.borrow();
    let features = path / "features";

    let conv_config = ConvConfig {
        padding: 1,
        ..Default::default()
    };
    let convs: Vec<Conv2D> = CONV_LAYERS
        .iter()
        .map(|&(index, in_channels, out_channels)| {
            nn::conv2d(
                &features / index,
                in_channels,
                out_channels,
                3,
                conv_config,
            )
        })
        .collect();

    Box::new(move |image: &Tensor| {
        let mut outputs = Vec::with_capacity(convs.len());
        let mut net = image.shallow_clone();

        for (position, conv) in convs.iter().enumerate() {
            net = net.apply(conv);
            outputs.push(net.shallow_clone());
            net = net.relu();

            if POOL_AFTER.contains(&position) {
                net = avg_pool(&net);
            }
        }

        outputs
    })
}

/// 2x2 stride-2 average pooling, no padding; the stand-in for VGG's
/// max-pooling layers of the same geometry.
pub fn avg_pool(xs: &Tensor) -> Tensor {
    xs.avg_pool2d(&[2, 2], &[2, 2], &[0, 0], false, true, None::<i64>)
}
