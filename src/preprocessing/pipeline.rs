use crate::error::OcrError;
use crate::pixel::buffer::check_dimensions;
use crate::pixel::PixelBuffer;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use super::kernel::KernelCache;
use super::steps;

/// A single filter in the pipeline, with its parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    /// Luminance binarization at `level` (fraction of full brightness)
    Threshold { level: f32 },
    /// Separable blur with the requested radius
    Blur { radius: f32 },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Threshold { .. } => "threshold",
            Self::Blur { .. } => "blur",
        }
    }

    fn validate(self) -> Result<Self, OcrError> {
        match self {
            Self::Threshold { level } if !(0.0..=1.0).contains(&level) => Err(
                OcrError::InvalidStage(format!("threshold level {} outside [0, 1]", level)),
            ),
            Self::Blur { radius } if !radius.is_finite() || radius < 0.0 => Err(
                OcrError::InvalidStage(format!("blur radius {} must be finite and >= 0", radius)),
            ),
            stage => Ok(stage),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Threshold { level } => write!(f, "threshold:{}", level),
            Self::Blur { radius } => write!(f, "blur:{}", radius),
        }
    }
}

impl FromStr for Stage {
    type Err = OcrError;

    /// Parses `name` or `name:param`, e.g. `threshold:0.6` or `blur`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, param) = match s.split_once(':') {
            Some((name, param)) => (name.trim(), Some(param.trim())),
            None => (s, None),
        };

        let param = param
            .map(|p| {
                p.parse::<f32>().map_err(|_| {
                    OcrError::InvalidStage(format!("invalid parameter '{}' for {}", p, name))
                })
            })
            .transpose()?;

        let stage = match name.to_lowercase().as_str() {
            "threshold" | "binarize" => Self::Threshold {
                level: param.unwrap_or(steps::threshold::DEFAULT_LEVEL),
            },
            "blur" => Self::Blur {
                radius: param.unwrap_or(steps::blur::DEFAULT_RADIUS),
            },
            other => {
                return Err(OcrError::InvalidStage(format!("unknown stage '{}'", other)));
            }
        };
        stage.validate()
    }
}

/// Ordered list of stages, parsed from a comma-separated string
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StageList(pub Vec<Stage>);

impl FromStr for StageList {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(Stage::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(StageList)
    }
}

/// Preprocessing preset names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    /// Skip all preprocessing
    None,
    /// Binarize at the default level
    #[default]
    Default,
    /// Blur away speckle, then binarize
    Smooth,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::None, Preset::Default, Preset::Smooth];

    /// Get the preset name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Default => "default",
            Self::Smooth => "smooth",
        }
    }

    /// Stages this preset runs, in order
    pub fn stages(&self) -> Vec<Stage> {
        match self {
            Self::None => vec![],
            Self::Default => vec![Stage::Threshold {
                level: steps::threshold::DEFAULT_LEVEL,
            }],
            Self::Smooth => vec![
                Stage::Blur {
                    radius: steps::blur::DEFAULT_RADIUS,
                },
                Stage::Threshold {
                    level: steps::threshold::DEFAULT_LEVEL,
                },
            ],
        }
    }
}

impl FromStr for Preset {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "default" => Ok(Self::Default),
            "smooth" => Ok(Self::Smooth),
            other => Err(OcrError::InvalidRequest(format!("unknown preset '{}'", other))),
        }
    }
}

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Timing stats for one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingResult {
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Preset name, or "custom" for an explicit stage list
    pub pipeline: String,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Runs an ordered list of stages over a pixel buffer.
///
/// Holds the blur kernel cache, so one pipeline can serve many images (and
/// many threads) without rebuilding kernels for a repeated radius.
#[derive(Debug)]
pub struct Pipeline {
    label: String,
    stages: Vec<Stage>,
    kernels: Arc<KernelCache>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self {
            label: "custom".to_string(),
            stages,
            kernels: Arc::new(KernelCache::new()),
        }
    }

    pub fn from_preset(preset: Preset) -> Self {
        Self {
            label: preset.as_str().to_string(),
            stages: preset.stages(),
            kernels: Arc::new(KernelCache::new()),
        }
    }

    /// Pipeline with different stages sharing this one's kernel cache
    pub fn with_stages(&self, label: impl Into<String>, stages: Vec<Stage>) -> Self {
        Self {
            label: label.into(),
            stages,
            kernels: Arc::clone(&self.kernels),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn kernels(&self) -> &KernelCache {
        &self.kernels
    }

    /// Run every stage in order, mutating `buffer` in place.
    ///
    /// The buffer is validated before the first stage; a failing stage stops
    /// the run and later stages never touch the buffer.
    pub fn process(&self, buffer: &mut PixelBuffer) -> Result<PreprocessingResult, OcrError> {
        let start = Instant::now();
        check_dimensions(
            buffer.as_bytes().len(),
            buffer.width() as usize,
            buffer.height() as usize,
        )?;

        let mut steps_timing = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            self.run_step(*stage, buffer, &mut steps_timing)?;
        }

        let total_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            pipeline = %self.label,
            steps = steps_timing.len(),
            total_time_ms,
            "preprocessing finished"
        );

        Ok(PreprocessingResult {
            total_time_ms,
            pipeline: self.label.clone(),
            steps: steps_timing,
        })
    }

    fn run_step(
        &self,
        stage: Stage,
        buffer: &mut PixelBuffer,
        timings: &mut Vec<StepTiming>,
    ) -> Result<(), OcrError> {
        let step_start = Instant::now();
        match stage {
            Stage::Threshold { level } => steps::threshold::apply(buffer, level)?,
            Stage::Blur { radius } => steps::blur::apply(buffer, radius, &self.kernels)?,
        }
        let time_ms = step_start.elapsed().as_millis() as u64;
        tracing::debug!(stage = %stage, time_ms, "step complete");
        timings.push(StepTiming {
            name: stage.name().to_string(),
            time_ms,
        });
        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::from_preset(Preset::Default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stage_list() {
        let list: StageList = "threshold:0.6, blur".parse().unwrap();
        assert_eq!(
            list.0,
            vec![
                Stage::Threshold { level: 0.6 },
                Stage::Blur { radius: 1.0 },
            ]
        );
        assert_eq!("".parse::<StageList>().unwrap().0, vec![]);
    }

    #[test]
    fn test_parse_rejects_unknown_and_out_of_range() {
        for bad in ["deskew", "threshold:1.5", "threshold:-0.1", "blur:-2", "blur:abc"] {
            let err = bad.parse::<Stage>().unwrap_err();
            assert!(matches!(err, OcrError::InvalidStage(_)), "{}", bad);
        }
    }

    #[test]
    fn test_stage_display_round_trips() {
        let stage = Stage::Blur { radius: 2.5 };
        assert_eq!(stage.to_string().parse::<Stage>().unwrap(), stage);
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("SMOOTH".parse::<Preset>().unwrap(), Preset::Smooth);
        assert_eq!("none".parse::<Preset>().unwrap(), Preset::None);
        assert!("aggressive".parse::<Preset>().is_err());
        for preset in Preset::ALL {
            assert_eq!(preset.as_str().parse::<Preset>().unwrap(), preset);
        }
    }

    #[test]
    fn test_none_preset_leaves_buffer_untouched() {
        let mut buf = PixelBuffer::filled(3, 3, [12, 34, 56, 78]);
        let original = buf.clone();
        let result = Pipeline::from_preset(Preset::None)
            .process(&mut buf)
            .unwrap();
        assert!(result.steps.is_empty());
        assert_eq!(result.pipeline, "none");
        assert_eq!(buf, original);
    }

    #[test]
    fn test_default_preset_binarizes() {
        let mut buf = PixelBuffer::filled(2, 2, [255, 255, 255, 255]);
        let result = Pipeline::default().process(&mut buf).unwrap();
        assert_eq!(buf, PixelBuffer::filled(2, 2, [255, 255, 255, 255]));
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].name, "threshold");
    }

    #[test]
    fn test_stages_run_in_declared_order() {
        let mut blur_first = PixelBuffer::filled(6, 6, [0, 0, 0, 255]);
        blur_first.set_pixel(2, 2, [255, 255, 255, 255]);
        let mut threshold_first = blur_first.clone();

        Pipeline::new(vec![
            Stage::Blur { radius: 1.0 },
            Stage::Threshold { level: 0.5 },
        ])
        .process(&mut blur_first)
        .unwrap();
        Pipeline::new(vec![
            Stage::Threshold { level: 0.5 },
            Stage::Blur { radius: 1.0 },
        ])
        .process(&mut threshold_first)
        .unwrap();

        // Blurring last leaves grey values behind; thresholding last cannot
        assert!(blur_first
            .as_bytes()
            .iter()
            .all(|&v| v == 0 || v == 255));
        assert!(threshold_first
            .as_bytes()
            .iter()
            .any(|&v| v != 0 && v != 255));
    }

    #[test]
    fn test_with_stages_shares_kernel_cache() {
        let base = Pipeline::from_preset(Preset::Smooth);
        let mut buf = PixelBuffer::filled(4, 4, [128, 128, 128, 255]);
        base.process(&mut buf).unwrap();
        assert_eq!(base.kernels().cached_radius(), Some(3));

        let custom = base.with_stages("custom", vec![Stage::Blur { radius: 2.0 }]);
        custom.process(&mut buf).unwrap();
        assert_eq!(base.kernels().cached_radius(), Some(7));
    }
}
