use crate::common::*;

/// Decodes an image file. Missing or corrupt files fail here, before any
/// optimization work starts.
pub fn load_image<P>(path: P) -> Result<DynamicImage>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let reader = ImageReader::open(path)
        .map_err(|err| format_err!("failed to open image {:?}: {}", path, err))?;
    let image = reader
        .decode()
        .map_err(|err| format_err!("failed to decode image {:?}: {}", path, err))?;
    Ok(image)
}

/// Resizes to the target shape and converts to the extractor's input layout:
/// (1, 3, height, width), float32, values in [0, 1], on the given device.
pub fn preprocess(image: &DynamicImage, height: u32, width: u32, device: Device) -> Result<Tensor> {
    ensure!(height > 0 && width > 0, "target shape must be non-empty");

    let resized = image
        .resize_exact(width, height, FilterType::Triangle)
        .to_rgb8();
    let pixels: Vec<f32> = resized
        .as_raw()
        .iter()
        .map(|&value| value as f32 / 255.0)
        .collect();

    let tensor = Tensor::of_slice(&pixels)
        .view([height as i64, width as i64, 3])
        .permute(&[2, 0, 1])
        .unsqueeze(0)
        .to_kind(Kind::Float)
        .to_device(device);
    Ok(tensor)
}

/// Writes the final image tensor to disk: detaches it from gradient
/// tracking, drops the batch dimension, clamps to [0, 1], and encodes via
/// the format implied by the file extension.
pub fn save_image<P>(image: &Tensor, path: P) -> Result<()>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let image = image.detach().to_device(Device::Cpu).get(0);
    let (channels, height, width) = image.size3()?;
    ensure!(channels == 3, "expected 3 channels, found {}", channels);

    let image = (image.clamp(0.0, 1.0) * 255.0)
        .to_kind(Kind::Uint8)
        .permute(&[1, 2, 0])
        .contiguous();

    let numel = image.numel() as usize;
    let mut buf = vec![0_u8; numel];
    image.copy_data(&mut buf, numel);

    ImageBuffer::<Rgb<u8>, Vec<u8>>::from_vec(width as u32, height as u32, buf)
        .ok_or_else(|| format_err!("pixel buffer does not match {}x{}", width, height))?
        .save(path)
        .map_err(|err| format_err!("failed to write image {:?}: {}", path, err))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_produces_channel_first_unit_range() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 6, Rgb([255, 0, 128])));
        let tensor = preprocess(&source, 12, 16, Device::Cpu).unwrap();
        assert_eq!(tensor.size(), vec![1, 3, 12, 16]);

        let max = tensor.max().double_value(&[]);
        let min = tensor.min().double_value(&[]);
        assert!(min >= 0.0 && max <= 1.0);

        // red channel saturated, green empty
        let red = tensor.get(0).get(0).mean(Kind::Float).double_value(&[]);
        let green = tensor.get(0).get(1).mean(Kind::Float).double_value(&[]);
        assert!((red - 1.0).abs() < 1e-3);
        assert!(green.abs() < 1e-3);
    }

    #[test]
    fn saved_image_decodes_back_to_tensor_dimensions() {
        let tensor = Tensor::rand(&[1, 3, 20, 30], (Kind::Float, Device::Cpu));
        let path = std::env::temp_dir().join("nstrs-io-test.png");

        save_image(&tensor, &path).unwrap();
        let decoded = load_image(&path).unwrap();
        assert_eq!(decoded.dimensions(), (30, 20));

        let _ = fs::remove_file(&path);
    }
}
