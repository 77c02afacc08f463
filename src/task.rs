// 该文件是 OwlDet （夜枭检测） 项目的一部分。
// src/task.rs - 检测任务
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
use tracing::{info, warn};

use crate::{
  model::Detector,
  output::{DetectResponse, Render},
  pipeline::{DetectParams, DetectRequest, DetectionPipeline},
};

pub trait Task<I, D, O>: Sized {
  type Error;
  fn run_task(
    self,
    input: I,
    pipeline: &DetectionPipeline<D>,
    outputs: &[O],
  ) -> Result<DetectResponse, Self::Error>;
}

/// 取一帧图像，做一次检测，并把结果交给所有输出
#[derive(Debug, Clone)]
pub struct OneShotTask {
  query: String,
  params: DetectParams,
}

impl OneShotTask {
  pub fn new(query: impl Into<String>) -> Self {
    Self {
      query: query.into(),
      params: DetectParams::default(),
    }
  }

  pub fn with_params(mut self, params: DetectParams) -> Self {
    self.params = params;
    self
  }
}

impl<
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = RgbImage>,
  D: Detector,
  O: Render<DetectResponse, Error = RE>,
> Task<I, D, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    pipeline: &DetectionPipeline<D>,
    outputs: &[O],
  ) -> Result<DetectResponse, Self::Error> {
    info!("开始任务...");
    let image = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    info!("输入图像获取成功: {}x{}", image.width(), image.height());

    let request = DetectRequest::new(image, &self.query, self.params)?;
    let outcome = pipeline.run_request(&request);
    if let Some(e) = &outcome.error {
      warn!("检测失败: {}", e);
    }

    let response = DetectResponse::new(&request.query, request.params, outcome);
    for det in &response.detections {
      info!(
        "  - {}: {:.2}% at ({:.0}, {:.0}, {:.0}, {:.0})",
        det.query,
        det.score * 100.0,
        det.bbox.x_min,
        det.bbox.y_min,
        det.bbox.x_max,
        det.bbox.y_max
      );
    }
    info!("检测到 {} 个目标", response.detection_count);

    for output in outputs {
      output.render_result(&request.image, &response)?;
    }

    info!("任务完成");
    Ok(response)
  }
}
