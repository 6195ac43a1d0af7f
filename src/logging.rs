//! ログ出力の初期化
//!
//! ライブラリ側は `tracing` のマクロのみを使い、購読者の設定はバイナリ側で一度だけ行う。

use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;

/// compact形式の購読者をグローバルに登録する
///
/// `RUST_LOG` が未設定の場合は `info` レベルを使用します。
/// 既に登録済みの場合はエラーを返します（パニックしない）。
pub fn init_logging() -> Result<(), SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
