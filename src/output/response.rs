// 该文件是 OwlDet （夜枭检测） 项目的一部分。
// src/output/response.rs - 检测结果的结构化记录
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

use chrono::Utc;
use serde::Serialize;

use crate::{
  model::Detection,
  pipeline::{DetectParams, PipelineOutcome},
};

pub type ResponseParameters = DetectParams;

/// 一次检测请求的响应
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectResponse {
  pub success: bool,
  pub query: String,
  pub detections: Vec<Detection>,
  pub detection_count: usize,
  pub parameters: ResponseParameters,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  /// 标注后的图像，`data:image/png;base64,...` 形式
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image_data: Option<String>,
  pub timestamp: String,
}

impl DetectResponse {
  pub fn new(query: &str, params: DetectParams, outcome: PipelineOutcome) -> Self {
    let PipelineOutcome { detections, error } = outcome;
    Self {
      success: error.is_none(),
      query: query.to_string(),
      detection_count: detections.len(),
      detections,
      parameters: params,
      error: error.map(|e| e.to_string()),
      image_data: None,
      timestamp: Utc::now().to_rfc3339(),
    }
  }

  pub fn with_image_data(mut self, image_data: String) -> Self {
    self.image_data = Some(image_data);
    self
  }

  pub fn to_json(&self) -> serde_json::Result<String> {
    serde_json::to_string_pretty(self)
  }
}
