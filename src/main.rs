use nstrs::{common::*, config::Config, extractor, io, synthesis};

/// The Rust implementation of neural style transfer.
#[derive(FromArgs)]
struct Args {
    /// the config file; defaults reproduce the reference run when omitted.
    #[argh(option)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let args: Args = argh::from_env();
    let config = match &args.config {
        Some(path) => Config::open(path)?,
        None => Config::default(),
    };
    let device = config.device;
    debug!("config: {:?}", config);

    info!("Loading images");
    let content_image = io::load_image(&config.content_file)?;
    let style_image = io::load_image(&config.style_file)?;

    // target shape comes from the content image; the style image is resized
    // to match
    let (width, height) = content_image.dimensions();
    let content = io::preprocess(&content_image, height, width, device)?;
    let style = io::preprocess(&style_image, height, width, device)?;

    info!(
        "Loading feature extractor weights from {:?}",
        config.weights_file
    );
    let mut vs = nn::VarStore::new(device);
    let extract = extractor::feature_extractor(vs.root());
    vs.load(&config.weights_file)
        .map_err(|err| format_err!("failed to load weights {:?}: {}", config.weights_file, err))?;
    vs.freeze();

    info!("Optimizing for {} steps on {:?}", config.steps, device);
    let output = synthesis::synthesize(&config, &extract, &content, &style)?;

    io::save_image(&output.image, &config.output_file)?;
    info!("Wrote {:?}", config.output_file);

    Ok(())
}
