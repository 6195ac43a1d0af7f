//! RGB値からアクセシビリティスコアを推定する小規模回帰ネットワーク

pub mod error;
pub mod logging;
pub mod csv_loader;
pub mod ml;
pub mod model;

pub use error::ModelError;
pub use ml::{ColorAccessibilityModel, NetworkConfig, SharedAccessibilityModel, TrainingConfig, TrainingSet};

/// 既定のCPUバックエンド（自動微分付き）
pub type DefaultBackend = burn_autodiff::Autodiff<burn_ndarray::NdArray>;

/// GPUバックエンド（自動微分付き）
#[cfg(feature = "gpu")]
pub type GpuBackend = burn_autodiff::Autodiff<burn_wgpu::Wgpu>;
