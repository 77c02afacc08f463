// 该文件是 OwlDet （夜枭检测） 项目的一部分。
// src/suppress.rs - 检测模式选择与非极大值抑制
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

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::BoundingBox;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.1;
pub const DEFAULT_NMS_IOU_THRESHOLD: f32 = 0.5;

/// 可参与抑制的候选项
pub trait Scored {
  fn score(&self) -> f32;
  fn bbox(&self) -> &BoundingBox;
}

/// 检测模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
  /// 只返回得分最高的一个候选，不应用置信度阈值
  #[default]
  Single,
  /// 置信度过滤后做 NMS
  Multiple,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("未知的检测模式: {0}")]
pub struct UnknownDetectionMode(pub String);

impl FromStr for DetectionMode {
  type Err = UnknownDetectionMode;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "single" => Ok(DetectionMode::Single),
      "multiple" => Ok(DetectionMode::Multiple),
      _ => Err(UnknownDetectionMode(s.to_string())),
    }
  }
}

impl fmt::Display for DetectionMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DetectionMode::Single => f.write_str("single"),
      DetectionMode::Multiple => f.write_str("multiple"),
    }
  }
}

/// 抑制阈值，不校验取值范围
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
  pub confidence: f32,
  pub nms_iou: f32,
}

impl Default for Thresholds {
  fn default() -> Self {
    Self {
      confidence: DEFAULT_CONFIDENCE_THRESHOLD,
      nms_iou: DEFAULT_NMS_IOU_THRESHOLD,
    }
  }
}

/// 得分最高的候选下标，并列时取最先出现的
///
/// NaN 得分只有在没有任何实数得分时才会被选中。
pub fn best_index<T: Scored>(candidates: &[T]) -> Option<usize> {
  let mut best: Option<(usize, f32)> = None;
  for (idx, candidate) in candidates.iter().enumerate() {
    let score = candidate.score();
    match best {
      None => best = Some((idx, score)),
      Some((_, best_score)) if score > best_score || (best_score.is_nan() && !score.is_nan()) => {
        best = Some((idx, score))
      }
      _ => {}
    }
  }
  best.map(|(idx, _)| idx)
}

/// 对 `indices` 指向的候选做贪心 NMS
///
/// 按得分稳定降序排序，依次取出最高者，并移除与其 IoU >= `iou_threshold` 的其余候选。
/// 返回的下标按选中顺序排列。
pub fn non_max_suppression<T: Scored>(
  candidates: &[T],
  indices: &[usize],
  iou_threshold: f32,
) -> Vec<usize> {
  let mut pending = indices.to_vec();
  // sort_by 是稳定排序，同分候选保持原有顺序；加 0.0 把 -0.0 归一为 0.0
  let score = |idx: usize| candidates[idx].score() + 0.0;
  pending.sort_by(|&a, &b| score(b).total_cmp(&score(a)));

  let mut keep = Vec::with_capacity(pending.len());
  while !pending.is_empty() {
    let current = pending.remove(0);
    let current_box = candidates[current].bbox();
    pending.retain(|&other| current_box.iou(candidates[other].bbox()) < iou_threshold);
    keep.push(current);
  }

  keep
}

/// 按检测模式选出保留的候选下标
pub fn suppress<T: Scored>(candidates: &[T], mode: DetectionMode, thresholds: Thresholds) -> Vec<usize> {
  let Some(best) = best_index(candidates) else {
    return Vec::new();
  };

  match mode {
    DetectionMode::Single => vec![best],
    DetectionMode::Multiple => {
      let mut valid: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.score() >= thresholds.confidence)
        .map(|(idx, _)| idx)
        .collect();

      // 没有候选达到阈值时仍然保留最好的一个
      if valid.is_empty() {
        valid.push(best);
      }

      non_max_suppression(candidates, &valid, thresholds.nms_iou)
    }
  }
}
