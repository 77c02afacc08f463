// 该文件是 OwlDet （夜枭检测） 项目的一部分。
// src/output/json_record.rs - JSON 记录输出
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

use std::{io::Cursor, path::PathBuf};

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{DetectResponse, Render, draw::Draw},
};

const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

#[derive(Error, Debug)]
pub enum JsonRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像编码错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
}

/// 把图像编码为 PNG 的 data URI
fn encode_png_data_uri(image: &RgbImage) -> Result<String, image::ImageError> {
  let mut buffer = Cursor::new(Vec::new());
  image.write_to(&mut buffer, ImageFormat::Png)?;
  Ok(format!("{}{}", PNG_DATA_URI_PREFIX, STANDARD.encode(buffer.into_inner())))
}

/// 将检测响应写为 JSON 文件，附带标注后的图像
pub struct JsonRecordOutput {
  path: PathBuf,
  draw: Draw,
}

impl FromUrlWithScheme for JsonRecordOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonRecordOutput {
  type Error = JsonRecordOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(JsonRecordOutputError::SchemeMismatch);
    }

    Ok(JsonRecordOutput {
      path: PathBuf::from(uri.path()),
      draw: Draw::default(),
    })
  }
}

impl JsonRecordOutput {
  pub fn with_draw(mut self, draw: Draw) -> Self {
    self.draw = draw;
    self
  }
}

impl Render<DetectResponse> for JsonRecordOutput {
  type Error = JsonRecordOutputError;

  fn render_result(&self, image: &RgbImage, result: &DetectResponse) -> Result<(), Self::Error> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let annotated = self.draw.annotate(image, &result.detections);
    let record = result.clone().with_image_data(encode_png_data_uri(&annotated)?);

    std::fs::write(&self.path, record.to_json()?)?;
    info!(
      "保存检测记录到文件: {} ({} 个目标)",
      self.path.display(),
      result.detection_count
    );
    Ok(())
  }
}
