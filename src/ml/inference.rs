//! モデル推論機能

use std::sync::{Arc, Mutex, MutexGuard};

use burn::{
    module::AutodiffModule,
    tensor::{
        backend::{AutodiffBackend, Backend},
        Tensor,
    },
};

use crate::error::{ModelError, ModelResult};
use crate::ml::color::{normalize_color, ColorSample, TrainingSet, INPUT_CHANNELS};
use crate::ml::network::ContrastNet;
use crate::ml::training::ColorAccessibilityModel;

/// 1色分の順伝播を実行し、生のスコアを返す
pub fn predict_with<B: Backend>(
    net: &ContrastNet<B>,
    rgb: ColorSample,
    device: &B::Device,
) -> ModelResult<Vec<f32>> {
    let normalized = normalize_color(rgb);

    // Tensorに変換 [1, 3]
    let input = Tensor::<B, 1>::from_floats(normalized.as_slice(), device).reshape([1, INPUT_CHANNELS]);

    net.forward(input)
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| ModelError::Tensor(format!("{:?}", e)))
}

impl<B: AutodiffBackend> ColorAccessibilityModel<B> {
    /// 単一色のスコアを推論
    ///
    /// 損失は通らず、学習済みネットワークの出力2要素をそのまま返します。
    /// 重みは変更しません。
    pub fn predict(&self, rgb: ColorSample) -> ModelResult<Vec<f32>> {
        let net = self
            .network()
            .map_err(|_| ModelError::invalid_state("setup前にpredictが呼び出されました"))?;

        // 勾配追跡なしのバックエンドで評価
        predict_with(&net.valid(), rgb, self.device())
    }

    /// 複数色をまとめて推論
    pub fn predict_batch(&self, colors: &[ColorSample]) -> ModelResult<Vec<Vec<f32>>> {
        colors.iter().map(|rgb| self.predict(*rgb)).collect()
    }
}

/// 複数スレッドから共有するためのラッパー
///
/// `train`（書き込み）と `predict`（読み込み）が同時に走らないよう、
/// すべての呼び出しを1つのロックで直列化します。
pub struct SharedAccessibilityModel<B: AutodiffBackend> {
    inner: Arc<Mutex<ColorAccessibilityModel<B>>>,
}

impl<B: AutodiffBackend> Clone for SharedAccessibilityModel<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: AutodiffBackend> SharedAccessibilityModel<B> {
    pub fn new(model: ColorAccessibilityModel<B>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(model)),
        }
    }

    // 学習中にパニックした場合、重みは破損扱いとする
    fn lock(&self) -> ModelResult<MutexGuard<'_, ColorAccessibilityModel<B>>> {
        self.inner
            .lock()
            .map_err(|_| ModelError::invalid_state("学習中に異常終了したためモデルは破損しています"))
    }

    pub fn setup(&self, training_set: &TrainingSet) -> ModelResult<()> {
        self.lock()?.setup(training_set)
    }

    pub fn train(&self, step: usize, compute_cost: bool) -> ModelResult<Option<f32>> {
        self.lock()?.train(step, compute_cost)
    }

    pub fn predict(&self, rgb: ColorSample) -> ModelResult<Vec<f32>> {
        self.lock()?.predict(rgb)
    }

    pub fn is_ready(&self) -> ModelResult<bool> {
        Ok(self.lock()?.is_ready())
    }
}
