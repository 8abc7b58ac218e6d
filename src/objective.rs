use crate::common::*;

/// Sum over the selected layers of the mean squared error between generated
/// and content feature maps. Zero iff the maps are identical at every
/// selected layer.
pub fn content_loss(
    layer_indexes: &[usize],
    generated_maps: &[Tensor],
    content_maps: &[Tensor],
) -> Tensor {
    let mut loss_sum = None;
    for &index in layer_indexes {
        let layer_loss = generated_maps[index].mse_loss(&content_maps[index], Reduction::Mean);
        loss_sum = match loss_sum {
            Some(sum) => Some(sum + layer_loss),
            None => Some(layer_loss),
        };
    }
    loss_sum.unwrap_or_else(|| Tensor::zeros(&[], (Kind::Float, generated_maps[0].device())))
}

/// Gram matrix of a feature map of shape (1, N, H, W): the N x N matrix of
/// inner products between the flattened filter activations. Captures texture
/// statistics independent of spatial arrangement.
pub fn gram_matrix(feature_map: &Tensor) -> Result<Tensor> {
    let (batch, filters, height, width) = feature_map.size4()?;
    ensure!(batch == 1, "expected batch size 1, found {}", batch);
    let flat = feature_map.view([filters, height * width]);
    Ok(flat.mm(&flat.transpose(0, 1)))
}

/// Weighted sum over the selected layers of the mean squared error between
/// generated and style Gram matrices. Each layer's squared differences are
/// divided by 2*M*N (M spatial positions, N filters) before averaging so the
/// contribution stays comparable across layers of different size, then scaled
/// by the per-layer weight.
pub fn style_loss(
    layer_indexes: &[usize],
    layer_weights: &[f64],
    generated_maps: &[Tensor],
    style_maps: &[Tensor],
) -> Result<Tensor> {
    let mut loss_sum = None;
    for (&index, &weight) in layer_indexes.iter().zip_eq(layer_weights.iter()) {
        let style_map = &style_maps[index];
        let (_batch, filters, height, width) = style_map.size4()?;
        let positions = height * width;

        let generated_gram = gram_matrix(&generated_maps[index])?;
        let style_gram = gram_matrix(style_map)?;

        let diff = generated_gram - style_gram;
        let layer_loss =
            (&diff * &diff / (2 * filters * positions) as f64).mean(Kind::Float) * weight;

        loss_sum = match loss_sum {
            Some(sum) => Some(sum + layer_loss),
            None => Some(layer_loss),
        };
    }
    loss_sum.ok_or_else(|| format_err!("style layer selection is empty"))
}

/// Weighted combination of the two objectives:
/// `content_weight * content_loss + style_weight * style_loss`.
pub fn total_loss(
    content_weight: f64,
    content_loss: &Tensor,
    style_weight: f64,
    style_loss: &Tensor,
) -> Tensor {
    content_weight * content_loss + style_weight * style_loss
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_maps() -> Vec<Tensor> {
        vec![
            Tensor::randn(&[1, 4, 8, 8], (Kind::Float, Device::Cpu)),
            Tensor::randn(&[1, 8, 4, 4], (Kind::Float, Device::Cpu)),
        ]
    }

    fn clone_maps(maps: &[Tensor]) -> Vec<Tensor> {
        maps.iter().map(|map| map.copy()).collect()
    }

    #[test]
    fn content_loss_is_zero_for_identical_maps() {
        let maps = random_maps();
        let loss = content_loss(&[0, 1], &maps, &clone_maps(&maps));
        assert!(loss.double_value(&[]).abs() < 1e-6);
    }

    #[test]
    fn content_loss_is_positive_for_distinct_maps() {
        let loss = content_loss(&[0, 1], &random_maps(), &random_maps());
        assert!(loss.double_value(&[]) > 0.0);
    }

    #[test]
    fn style_loss_is_zero_for_identical_maps() {
        let maps = random_maps();
        let loss = style_loss(&[0, 1], &[0.2, 0.2], &maps, &clone_maps(&maps)).unwrap();
        assert!(loss.double_value(&[]).abs() < 1e-4);
    }

    #[test]
    fn style_loss_is_non_negative_for_distinct_maps() {
        let loss = style_loss(&[0, 1], &[0.2, 0.2], &random_maps(), &random_maps()).unwrap();
        assert!(loss.double_value(&[]) >= 0.0);
    }

    #[test]
    fn gram_matrix_is_symmetric() {
        let map = Tensor::randn(&[1, 6, 5, 7], (Kind::Float, Device::Cpu));
        let gram = gram_matrix(&map).unwrap();
        assert_eq!(gram.size(), vec![6, 6]);
        let asymmetry = (&gram - &gram.transpose(0, 1))
            .abs()
            .max()
            .double_value(&[]);
        assert!(asymmetry < 1e-3);
    }

    #[test]
    fn total_loss_is_the_weighted_sum() {
        let closs = Tensor::of_slice(&[2.0_f32]).squeeze();
        let sloss = Tensor::of_slice(&[3.0_f32]).squeeze();
        let total = total_loss(1.0, &closs, 10.0, &sloss);
        assert!((total.double_value(&[]) - 32.0).abs() < 1e-6);
    }
}
