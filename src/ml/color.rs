//! 色データの定義と正規化

use serde::{Deserialize, Serialize};

/// 入力チャネル数（RGB）
pub const INPUT_CHANNELS: usize = 3;

/// 出力次元数（アクセシビリティスコア）
pub const OUTPUT_DIMENSION: usize = 2;

/// チャネル値の最大値
pub const CHANNEL_MAX: f32 = 255.0;

/// RGB値（各チャネル 0〜255）
pub type ColorSample = [f32; INPUT_CHANNELS];

/// 正規化済み入力（各チャネル 0〜1）
pub type NormalizedInput = [f32; INPUT_CHANNELS];

/// 目標出力
pub type TargetVector = [f32; OUTPUT_DIMENSION];

/// RGB値を 0〜1 に正規化する
///
/// 各チャネルを255で割るだけで、範囲外の値もクランプせずそのまま通します。
/// 入力範囲の検証は呼び出し側の責務です。
pub fn normalize_color(rgb: ColorSample) -> NormalizedInput {
    rgb.map(|v| v / CHANNEL_MAX)
}

/// 学習データセット
///
/// `raw_inputs[i]` と `raw_targets[i]` が1組の学習サンプルになります。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingSet {
    /// 未正規化のRGB値
    pub raw_inputs: Vec<ColorSample>,
    /// 各RGB値に対応する目標出力
    pub raw_targets: Vec<TargetVector>,
}

impl TrainingSet {
    pub fn new(raw_inputs: Vec<ColorSample>, raw_targets: Vec<TargetVector>) -> Self {
        Self {
            raw_inputs,
            raw_targets,
        }
    }

    /// サンプル数（入力側の件数）
    pub fn len(&self) -> usize {
        self.raw_inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw_inputs.is_empty()
    }

    /// 入力を正規化した配列を返す
    pub fn normalized_inputs(&self) -> Vec<NormalizedInput> {
        self.raw_inputs.iter().copied().map(normalize_color).collect()
    }
}
