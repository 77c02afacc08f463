// 该文件是 OwlDet （夜枭检测） 项目的一部分。
// src/output.rs - 输出定义
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
use url::Url;

use crate::FromUrl;
#[cfg(any(feature = "save_image_file", feature = "json_record"))]
use crate::FromUrlWithScheme;

pub trait Render<Output>: Sized {
  type Error;
  fn render_result(&self, image: &RgbImage, result: &Output) -> Result<(), Self::Error>;
}

mod response;
pub use self::response::{DetectResponse, ResponseParameters};

#[cfg(feature = "save_image_file")]
pub mod draw;

#[cfg(feature = "save_image_file")]
mod save_image_file;
#[cfg(feature = "save_image_file")]
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

#[cfg(feature = "json_record")]
mod json_record;
#[cfg(feature = "json_record")]
pub use self::json_record::{JsonRecordOutput, JsonRecordOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "save_image_file")]
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[cfg(feature = "json_record")]
  #[error("JSON 记录输出错误: {0}")]
  JsonRecordOutputError(#[from] JsonRecordOutputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum OutputWrapper {
  #[cfg(feature = "save_image_file")]
  SaveImageFileOutput(SaveImageFileOutput),
  #[cfg(feature = "json_record")]
  JsonRecordOutput(JsonRecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      #[cfg(feature = "save_image_file")]
      SaveImageFileOutput::SCHEME => {
        let output = SaveImageFileOutput::from_url(url)?;
        Ok(OutputWrapper::SaveImageFileOutput(output))
      }
      #[cfg(feature = "json_record")]
      JsonRecordOutput::SCHEME => {
        let output = JsonRecordOutput::from_url(url)?;
        Ok(OutputWrapper::JsonRecordOutput(output))
      }
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

#[cfg(feature = "save_image_file")]
impl OutputWrapper {
  /// 替换输出标注图像时使用的绘制器
  pub fn with_draw(self, draw: draw::Draw) -> Self {
    match self {
      OutputWrapper::SaveImageFileOutput(output) => {
        OutputWrapper::SaveImageFileOutput(output.with_draw(draw))
      }
      #[cfg(feature = "json_record")]
      OutputWrapper::JsonRecordOutput(output) => OutputWrapper::JsonRecordOutput(output.with_draw(draw)),
    }
  }
}

impl Render<DetectResponse> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, image: &RgbImage, result: &DetectResponse) -> Result<(), Self::Error> {
    match self {
      #[cfg(feature = "save_image_file")]
      OutputWrapper::SaveImageFileOutput(output) => output
        .render_result(image, result)
        .map_err(OutputError::from),
      #[cfg(feature = "json_record")]
      OutputWrapper::JsonRecordOutput(output) => output
        .render_result(image, result)
        .map_err(OutputError::from),
    }
  }
}

#[cfg(all(test, feature = "save_image_file", feature = "json_record"))]
mod tests {
  use super::*;

  #[test]
  fn selects_output_by_scheme() {
    let url = Url::parse("image:///tmp/out.png").unwrap();
    assert!(matches!(
      OutputWrapper::from_url(&url),
      Ok(OutputWrapper::SaveImageFileOutput(_))
    ));
    let url = Url::parse("json:///tmp/out.json").unwrap();
    assert!(matches!(
      OutputWrapper::from_url(&url),
      Ok(OutputWrapper::JsonRecordOutput(_))
    ));
    let url = Url::parse("rtsp://localhost/stream").unwrap();
    assert!(matches!(
      OutputWrapper::from_url(&url),
      Err(OutputError::SchemeMismatch)
    ));
  }
}
