// 该文件是 OwlDet （夜枭检测） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use owldet::{
  pipeline::{DEFAULT_SCORE_FLOOR, DetectParams},
  suppress::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_NMS_IOU_THRESHOLD, DetectionMode},
};

/// OwlDet 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测器来源，例如 replay:///path/candidates.json
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入图像，例如 image:///path/picture.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径，可重复指定
  /// 支持格式:
  /// - 标注图像: image:///path/out.png
  /// - 检测记录: json:///path/out.json
  #[arg(long, value_name = "OUTPUT")]
  pub output: Vec<Url>,

  /// 文本查询，例如 "a cat"
  #[arg(long, value_name = "QUERY")]
  pub query: String,

  /// 检测模式 (single | multiple)
  #[arg(long, default_value_t = DetectionMode::Single, value_name = "MODE")]
  pub mode: DetectionMode,

  /// 置信度阈值，仅在 multiple 模式下生效
  #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值
  #[arg(long, default_value_t = DEFAULT_NMS_IOU_THRESHOLD, value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 传给检测器的得分下限
  #[arg(long, default_value_t = DEFAULT_SCORE_FLOOR, value_name = "SCORE")]
  pub score_floor: f32,

  /// 标签字体文件，缺省时查找系统字体
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,
}

impl Args {
  pub fn params(&self) -> DetectParams {
    DetectParams::default()
      .with_mode(self.mode)
      .with_confidence_threshold(self.confidence)
      .with_nms_iou_threshold(self.nms_threshold)
  }
}
