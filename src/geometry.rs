// 该文件是 OwlDet （夜枭检测） 项目的一部分。
// src/geometry.rs - 轴对齐矩形的几何计算
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

use serde::{Deserialize, Serialize};

/// IoU 分母中的平滑项，两个退化框之间的 IoU 为 0 而不是 NaN
pub const IOU_EPSILON: f32 = 1e-6;

/// 图像像素坐标下的轴对齐边界框
///
/// 序列化为 `[x_min, y_min, x_max, y_max]`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
  pub x_min: f32,
  pub y_min: f32,
  pub x_max: f32,
  pub y_max: f32,
}

impl BoundingBox {
  pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
    Self {
      x_min,
      y_min,
      x_max,
      y_max,
    }
  }

  pub fn width(&self) -> f32 {
    (self.x_max - self.x_min).max(0.0)
  }

  pub fn height(&self) -> f32 {
    (self.y_max - self.y_min).max(0.0)
  }

  /// 面积，退化或坐标颠倒的框返回 0
  pub fn area(&self) -> f32 {
    self.width() * self.height()
  }

  /// 与另一个框的重叠面积，不相交时为 0
  pub fn intersection_area(&self, other: &BoundingBox) -> f32 {
    let left = self.x_min.max(other.x_min);
    let right = self.x_max.min(other.x_max);
    let top = self.y_min.max(other.y_min);
    let bottom = self.y_max.min(other.y_max);
    (right - left).max(0.0) * (bottom - top).max(0.0)
  }

  pub fn union_area(&self, other: &BoundingBox) -> f32 {
    self.area() + other.area() - self.intersection_area(other)
  }

  /// 交并比
  pub fn iou(&self, other: &BoundingBox) -> f32 {
    self.intersection_area(other) / (self.union_area(other) + IOU_EPSILON)
  }

  pub fn is_finite(&self) -> bool {
    self.x_min.is_finite() && self.y_min.is_finite() && self.x_max.is_finite() && self.y_max.is_finite()
  }

  pub fn as_array(&self) -> [f32; 4] {
    [self.x_min, self.y_min, self.x_max, self.y_max]
  }
}

impl From<[f32; 4]> for BoundingBox {
  fn from([x_min, y_min, x_max, y_max]: [f32; 4]) -> Self {
    Self::new(x_min, y_min, x_max, y_max)
  }
}

impl From<BoundingBox> for [f32; 4] {
  fn from(bbox: BoundingBox) -> Self {
    bbox.as_array()
  }
}

pub fn area(bbox: &BoundingBox) -> f32 {
  bbox.area()
}

pub fn intersection_area(a: &BoundingBox, b: &BoundingBox) -> f32 {
  a.intersection_area(b)
}

pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
  a.iou(b)
}
