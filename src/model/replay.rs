// 该文件是 OwlDet （夜枭检测） 项目的一部分。
// src/model/replay.rs - 回放预先计算的检测器输出
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
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{Candidate, Detector},
};

/// 从 JSON 文件读取 OwlViT 的原始输出
///
/// 文件内容为候选数组：`[{"box": [x_min, y_min, x_max, y_max], "score": 0.9, "label": 0}]`。
#[derive(Debug, Clone)]
pub struct ReplayDetector {
  candidates: Vec<Candidate>,
}

#[derive(Error, Debug)]
pub enum ReplayDetectorError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("候选文件解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("查询列表为空")]
  EmptyQuery,
}

impl FromUrlWithScheme for ReplayDetector {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayDetector {
  type Error = ReplayDetectorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ReplayDetectorError::SchemeMismatch(url.scheme().to_string()));
    }

    info!("加载候选文件: {}", url.path());
    let data = std::fs::read(url.path())?;
    Self::from_json(&data)
  }
}

impl ReplayDetector {
  pub fn new(candidates: Vec<Candidate>) -> Self {
    Self { candidates }
  }

  pub fn from_json(data: &[u8]) -> Result<Self, ReplayDetectorError> {
    let candidates: Vec<Candidate> = serde_json::from_slice(data)?;
    debug!("候选数量: {}", candidates.len());
    Ok(Self { candidates })
  }
}

impl Detector for ReplayDetector {
  type Error = ReplayDetectorError;

  fn detect(
    &self,
    _image: &RgbImage,
    queries: &[String],
    score_floor: f32,
  ) -> Result<Vec<Candidate>, Self::Error> {
    if queries.is_empty() {
      return Err(ReplayDetectorError::EmptyQuery);
    }

    Ok(
      self
        .candidates
        .iter()
        .filter(|c| c.score >= score_floor)
        .copied()
        .collect(),
    )
  }
}
