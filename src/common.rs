pub use anyhow::{bail, ensure, format_err, Error, Result};
pub use argh::FromArgs;
pub use image::{
    imageops::FilterType, io::Reader as ImageReader, DynamicImage, GenericImageView, ImageBuffer,
    Rgb, RgbImage,
};
pub use itertools::Itertools;
pub use log::{debug, info, warn};
pub use serde::{
    de::Error as DeserializeError, ser::Error as SerializeError, Deserialize, Deserializer,
    Serialize, Serializer,
};
pub use std::{
    borrow::Borrow,
    collections::{HashMap, VecDeque},
    fs,
    path::{Path, PathBuf},
};
pub use tch::{
    nn::{self, Conv2D, ConvConfig},
    Device, Kind, Reduction, Tensor,
};
