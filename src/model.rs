// 该文件是 OwlDet （夜枭检测） 项目的一部分。
// src/model.rs - 检测器接口与检测结果
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
use serde::{Deserialize, Serialize};

use crate::{geometry::BoundingBox, suppress::Scored};

/// 开放词表检测器（如 OwlViT）
///
/// 对一张图像和一组文本查询做一次推理，返回得分不低于 `score_floor` 的全部候选。
pub trait Detector {
  type Error: std::error::Error + Send + Sync + 'static;

  fn detect(
    &self,
    image: &RgbImage,
    queries: &[String],
    score_floor: f32,
  ) -> Result<Vec<Candidate>, Self::Error>;
}

impl<D: Detector + ?Sized> Detector for &D {
  type Error = D::Error;

  fn detect(
    &self,
    image: &RgbImage,
    queries: &[String],
    score_floor: f32,
  ) -> Result<Vec<Candidate>, Self::Error> {
    (**self).detect(image, queries, score_floor)
  }
}

/// 检测器的一条原始输出，`label` 为查询列表中的下标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
  #[serde(rename = "box")]
  pub bbox: BoundingBox,
  pub score: f32,
  pub label: usize,
}

impl Candidate {
  pub fn new(bbox: impl Into<BoundingBox>, score: f32, label: usize) -> Self {
    Self {
      bbox: bbox.into(),
      score,
      label,
    }
  }

  pub fn is_finite(&self) -> bool {
    self.bbox.is_finite() && self.score.is_finite()
  }
}

impl Scored for Candidate {
  fn score(&self) -> f32 {
    self.score
  }

  fn bbox(&self) -> &BoundingBox {
    &self.bbox
  }
}

/// 经过筛选后保留的检测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  #[serde(rename = "box")]
  pub bbox: BoundingBox,
  pub score: f32,
  pub label: usize,
  pub query: String,
}

impl Detection {
  /// 标注文本，形如 `cat: 0.87`
  pub fn label_text(&self) -> String {
    format!("{}: {:.2}", self.query, self.score)
  }
}

mod replay;
pub use self::replay::{ReplayDetector, ReplayDetectorError};
