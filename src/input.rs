// 该文件是 OwlDet （夜枭检测） 项目的一部分。
// src/input.rs - 图像输入
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::RgbImage;
use thiserror::Error;

use crate::FromUrl;

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("Image decoding error: {0}")]
  DecodeError(#[from] image::ImageError),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

/// 从内存中的编码数据（PNG、JPEG 等）解码出 RGB 图像
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, InputError> {
  let image = image::load_from_memory(bytes)?;
  Ok(image.to_rgb8())
}

pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileInput::SCHEME {
        let input = ImageFileInput::from_url(url)?;
        return Ok(InputWrapper::ReadImageFile(input));
      }
    }
    let _ = url;
    Err(InputError::SchemeMismatch)
  }
}

impl Iterator for InputWrapper {
  type Item = RgbImage;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => input.next(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decodes_png_bytes() {
    let image = RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]));
    let mut bytes = Vec::new();
    image
      .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
      .unwrap();
    let decoded = decode_image(&bytes).unwrap();
    assert_eq!(decoded, image);
  }

  #[test]
  fn rejects_garbage_bytes() {
    assert!(matches!(
      decode_image(b"not an image"),
      Err(InputError::DecodeError(_))
    ));
  }

  #[test]
  fn unknown_scheme_is_rejected() {
    let url = url::Url::parse("v4l2:///dev/video0").unwrap();
    assert!(matches!(
      InputWrapper::from_url(&url),
      Err(InputError::SchemeMismatch)
    ));
  }
}
