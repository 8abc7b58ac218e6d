use crate::{
    common::*,
    config::{Config, InitKind},
    error::StyleTransferError,
    objective,
    optim::{Evaluation, Lbfgs},
    params,
};

#[derive(Debug)]
pub struct SynthesisOutput {
    /// The optimized image, shape (1, 3, H, W), still on the run device.
    pub image: Tensor,
    /// Total loss accepted at each outer step.
    pub losses: Vec<f64>,
}

/// Runs the style transfer optimization: measures the fixed content and style
/// targets once, then drives the generated image through the configured
/// number of L-BFGS steps.
///
/// `extract` must be the frozen feature extractor; it is the only consumer of
/// the generated image's gradient graph. The loss evaluation is packaged as a
/// function object so the line search inside each step can re-invoke it
/// freely: every call clears the image gradient, reruns the forward pass, and
/// backpropagates the weighted total.
pub fn synthesize<F>(
    config: &Config,
    extract: &F,
    content: &Tensor,
    style: &Tensor,
) -> Result<SynthesisOutput>
where
    F: Fn(&Tensor) -> Vec<Tensor>,
{
    ensure!(
        content.size().len() == 4 && content.size()[0] == 1 && content.size()[1] == 3,
        "expected a (1, 3, H, W) content tensor, found {:?}",
        content.size()
    );
    if content.size() != style.size() {
        return Err(StyleTransferError::ShapeMismatch {
            expected: content.size(),
            found: style.size(),
        }
        .into());
    }

    let content_layers = params::layer_indexes(&config.content_layers)?;
    let style_layers = params::layer_indexes(&config.style_layers)?;

    // fixed targets, measured exactly once before the loop
    let content_maps = tch::no_grad(|| extract(content));
    let style_maps = tch::no_grad(|| extract(style));

    let mut generated = match config.init {
        InitKind::Noise => Tensor::randn(&content.size(), (Kind::Float, content.device())),
        InitKind::Content => content.copy(),
    }
    .set_requires_grad(true);

    let evaluate = |image: &Tensor| -> Result<Evaluation> {
        let mut image = image.shallow_clone();
        image.zero_grad();

        let generated_maps = extract(&image);
        let closs = objective::content_loss(&content_layers, &generated_maps, &content_maps);
        let sloss = objective::style_loss(
            &style_layers,
            &config.style_layer_weights,
            &generated_maps,
            &style_maps,
        )?;
        let loss = objective::total_loss(config.content_weight, &closs, config.style_weight, &sloss);

        loss.backward();
        let grad = image.grad().detach().view([-1]).copy();

        Ok(Evaluation {
            loss: loss.double_value(&[]),
            grad,
        })
    };

    let mut optimizer = Lbfgs::default();
    let mut losses = Vec::with_capacity(config.steps);

    for step in 1..=config.steps {
        let loss = optimizer.step(&mut generated, &evaluate)?;
        println!("Step {}: {}", step, loss);

        if !loss.is_finite() {
            return Err(StyleTransferError::DivergedOptimization { step, loss }.into());
        }
        losses.push(loss);
    }

    Ok(SynthesisOutput {
        image: generated,
        losses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor;

    #[test]
    fn smoke_test_five_steps_on_small_images() {
        let device = Device::Cpu;
        let vs = nn::VarStore::new(device);
        let extract = extractor::feature_extractor(vs.root());

        let content = Tensor::rand(&[1, 3, 32, 32], (Kind::Float, device));
        let style = Tensor::rand(&[1, 3, 32, 32], (Kind::Float, device));

        let config = Config {
            steps: 5,
            device,
            ..Config::default()
        };

        let SynthesisOutput { image, losses } =
            synthesize(&config, &extract, &content, &style).unwrap();

        assert_eq!(losses.len(), 5);
        assert!(losses.iter().all(|loss| loss.is_finite()));
        assert!(losses[4] <= losses[0], "{} > {}", losses[4], losses[0]);

        assert_eq!(image.size(), vec![1, 3, 32, 32]);
        let finite = image.isfinite().all().int64_value(&[]);
        assert_eq!(finite, 1);
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let device = Device::Cpu;
        let vs = nn::VarStore::new(device);
        let extract = extractor::feature_extractor(vs.root());

        let content = Tensor::rand(&[1, 3, 32, 32], (Kind::Float, device));
        let style = Tensor::rand(&[1, 3, 16, 16], (Kind::Float, device));

        let config = Config {
            steps: 1,
            device,
            ..Config::default()
        };

        let err = synthesize(&config, &extract, &content, &style).unwrap_err();
        let err = err.downcast::<StyleTransferError>().unwrap();
        assert!(matches!(err, StyleTransferError::ShapeMismatch { .. }));
    }
}
