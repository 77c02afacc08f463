// 该文件是 OwlDet （夜枭检测） 项目的一部分。
// src/pipeline.rs - 单次推理检测流程
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
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  model::{Candidate, Detection, Detector},
  suppress::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_NMS_IOU_THRESHOLD, DetectionMode, Thresholds, suppress,
  },
};

/// 传给检测器的内部得分下限，与用户阈值无关，保证单目标模式能找回低分的最佳匹配
pub const DEFAULT_SCORE_FLOOR: f32 = 0.01;

/// 标签下标超出查询列表时使用的名称
pub const UNKNOWN_LABEL: &str = "unknown";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
  #[error("未提供图像")]
  MissingImage,
  #[error("查询不能为空")]
  EmptyQuery,
  #[error("参数 {name} 不是合法的数值: {value}")]
  MalformedNumber { name: &'static str, value: String },
  #[error("未知的检测模式: {0}")]
  UnknownMode(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
  #[error("推理失败: {0}")]
  Inference(String),
  #[error("检测器输出无效: 第 {index} 个候选含有非有限数值")]
  MalformedOutput { index: usize },
}

/// 用户可调的检测参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectParams {
  pub confidence_threshold: f32,
  pub detection_mode: DetectionMode,
  #[serde(rename = "nms_threshold")]
  pub nms_iou_threshold: f32,
}

impl Default for DetectParams {
  fn default() -> Self {
    Self {
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      detection_mode: DetectionMode::default(),
      nms_iou_threshold: DEFAULT_NMS_IOU_THRESHOLD,
    }
  }
}

impl DetectParams {
  /// 从表单字段解析参数，缺省字段使用默认值
  pub fn from_fields(
    confidence_threshold: Option<&str>,
    detection_mode: Option<&str>,
    nms_threshold: Option<&str>,
  ) -> Result<Self, RequestError> {
    let defaults = Self::default();
    let confidence_threshold = parse_number(
      "confidence_threshold",
      confidence_threshold,
      defaults.confidence_threshold,
    )?;
    let nms_iou_threshold = parse_number("nms_threshold", nms_threshold, defaults.nms_iou_threshold)?;
    let detection_mode = match detection_mode {
      Some(mode) => mode
        .parse()
        .map_err(|_| RequestError::UnknownMode(mode.to_string()))?,
      None => defaults.detection_mode,
    };

    Ok(Self {
      confidence_threshold,
      detection_mode,
      nms_iou_threshold,
    })
  }

  pub fn with_mode(mut self, mode: DetectionMode) -> Self {
    self.detection_mode = mode;
    self
  }

  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn with_nms_iou_threshold(mut self, threshold: f32) -> Self {
    self.nms_iou_threshold = threshold;
    self
  }

  pub fn thresholds(&self) -> Thresholds {
    Thresholds {
      confidence: self.confidence_threshold,
      nms_iou: self.nms_iou_threshold,
    }
  }
}

fn parse_number(name: &'static str, value: Option<&str>, default: f32) -> Result<f32, RequestError> {
  match value {
    None => Ok(default),
    Some(raw) => raw.trim().parse().map_err(|_| RequestError::MalformedNumber {
      name,
      value: raw.to_string(),
    }),
  }
}

/// 一次检测请求：一张图像和一条查询
#[derive(Debug, Clone)]
pub struct DetectRequest {
  pub image: RgbImage,
  pub query: String,
  pub params: DetectParams,
}

impl DetectRequest {
  /// 校验输入，查询会去掉首尾空白
  pub fn new(image: RgbImage, query: &str, params: DetectParams) -> Result<Self, RequestError> {
    if image.width() == 0 || image.height() == 0 {
      return Err(RequestError::MissingImage);
    }

    let query = query.trim();
    if query.is_empty() {
      return Err(RequestError::EmptyQuery);
    }

    Ok(Self {
      image,
      query: query.to_string(),
      params,
    })
  }
}

/// 检测流程的结果，推理失败时 `detections` 为空且 `error` 有值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOutcome {
  pub detections: Vec<Detection>,
  pub error: Option<PipelineError>,
}

impl PipelineOutcome {
  pub fn count(&self) -> usize {
    self.detections.len()
  }

  pub fn is_success(&self) -> bool {
    self.error.is_none()
  }

  fn failed(error: PipelineError) -> Self {
    Self {
      detections: Vec::new(),
      error: Some(error),
    }
  }
}

/// 检测流程，持有注入的检测器
pub struct DetectionPipeline<D> {
  detector: D,
  score_floor: f32,
}

impl<D: Detector> DetectionPipeline<D> {
  pub fn new(detector: D) -> Self {
    Self {
      detector,
      score_floor: DEFAULT_SCORE_FLOOR,
    }
  }

  pub fn with_score_floor(mut self, score_floor: f32) -> Self {
    self.score_floor = score_floor;
    self
  }

  pub fn run_request(&self, request: &DetectRequest) -> PipelineOutcome {
    self.run(&request.image, &request.query, &request.params)
  }

  /// 调用一次检测器并按检测模式筛选结果，不会向调用方抛出错误
  pub fn run(&self, image: &RgbImage, query: &str, params: &DetectParams) -> PipelineOutcome {
    let queries = [query.to_string()];

    debug!("执行模型推理: 查询 '{}'", query);
    let now = std::time::Instant::now();
    let candidates = match self.detector.detect(image, &queries, self.score_floor) {
      Ok(candidates) => candidates,
      Err(e) => {
        error!("推理失败: {}", e);
        return PipelineOutcome::failed(PipelineError::Inference(e.to_string()));
      }
    };
    info!(
      "推理完成，耗时: {:.2?}，候选数量: {}",
      now.elapsed(),
      candidates.len()
    );

    if let Some(index) = candidates.iter().position(|c| !c.is_finite()) {
      error!("检测器输出无效: 第 {} 个候选 {:?}", index, candidates[index]);
      return PipelineOutcome::failed(PipelineError::MalformedOutput { index });
    }

    let keep = suppress(&candidates, params.detection_mode, params.thresholds());
    let detections: Vec<Detection> = keep
      .into_iter()
      .map(|idx| to_detection(&candidates[idx], &queries))
      .collect();

    debug!(
      "检测模式 {}: 保留 {} 个目标",
      params.detection_mode,
      detections.len()
    );

    PipelineOutcome {
      detections,
      error: None,
    }
  }
}

fn to_detection(candidate: &Candidate, queries: &[String]) -> Detection {
  let query = match queries.get(candidate.label) {
    Some(query) => query.clone(),
    None => {
      warn!("标签下标 {} 超出查询列表范围", candidate.label);
      UNKNOWN_LABEL.to_string()
    }
  };

  Detection {
    bbox: candidate.bbox,
    score: candidate.score,
    label: candidate.label,
    query,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn params_default_to_single_mode() {
    let params = DetectParams::from_fields(None, None, None).unwrap();
    assert_eq!(params, DetectParams::default());
    assert_eq!(params.detection_mode, DetectionMode::Single);
    assert_eq!(params.confidence_threshold, 0.1);
    assert_eq!(params.nms_iou_threshold, 0.5);
  }

  #[test]
  fn params_parse_form_fields() {
    let params = DetectParams::from_fields(Some(" 0.3"), Some("multiple"), Some("0.7")).unwrap();
    assert_eq!(params.confidence_threshold, 0.3);
    assert_eq!(params.detection_mode, DetectionMode::Multiple);
    assert_eq!(params.nms_iou_threshold, 0.7);
  }

  #[test]
  fn params_reject_malformed_fields() {
    assert_eq!(
      DetectParams::from_fields(Some("abc"), None, None),
      Err(RequestError::MalformedNumber {
        name: "confidence_threshold",
        value: "abc".to_string()
      })
    );
    assert!(matches!(
      DetectParams::from_fields(None, None, Some("")),
      Err(RequestError::MalformedNumber { name: "nms_threshold", .. })
    ));
    assert_eq!(
      DetectParams::from_fields(None, Some("all"), None),
      Err(RequestError::UnknownMode("all".to_string()))
    );
  }

  #[test]
  fn out_of_range_thresholds_are_accepted() {
    let params = DetectParams::from_fields(Some("1.5"), None, Some("-2")).unwrap();
    assert_eq!(params.confidence_threshold, 1.5);
    assert_eq!(params.nms_iou_threshold, -2.0);
  }

  #[test]
  fn request_trims_query() {
    let request = DetectRequest::new(RgbImage::new(2, 2), "  a cat ", DetectParams::default()).unwrap();
    assert_eq!(request.query, "a cat");
  }

  #[test]
  fn request_rejects_empty_inputs() {
    assert_eq!(
      DetectRequest::new(RgbImage::new(2, 2), "   ", DetectParams::default()).unwrap_err(),
      RequestError::EmptyQuery
    );
    assert_eq!(
      DetectRequest::new(RgbImage::new(0, 0), "cat", DetectParams::default()).unwrap_err(),
      RequestError::MissingImage
    );
  }

  #[test]
  fn out_of_range_label_maps_to_unknown() {
    let queries = ["cat".to_string()];
    let detection = to_detection(&Candidate::new([0.0, 0.0, 1.0, 1.0], 0.5, 3), &queries);
    assert_eq!(detection.query, UNKNOWN_LABEL);
    assert_eq!(detection.label, 3);
    let detection = to_detection(&Candidate::new([0.0, 0.0, 1.0, 1.0], 0.5, 0), &queries);
    assert_eq!(detection.query, "cat");
  }
}
