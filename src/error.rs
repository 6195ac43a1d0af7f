//! モデル操作のエラー定義

/// 学習・推論APIが返すエラー
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// 構築時の入力不正（系列長の不一致、層サイズ0など）
    Configuration(String),
    /// ライフサイクル順序違反（setup前のtrain/predictなど）
    InvalidState(String),
    /// テンソルからホスト側データへの読み出し失敗
    Tensor(String),
}

impl ModelError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ModelError::Configuration(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        ModelError::InvalidState(message.into())
    }
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::Configuration(msg) => write!(f, "設定エラー: {}", msg),
            ModelError::InvalidState(msg) => write!(f, "状態エラー: {}", msg),
            ModelError::Tensor(msg) => write!(f, "テンソル読み出しエラー: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

pub type ModelResult<T> = std::result::Result<T, ModelError>;
