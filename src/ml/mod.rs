pub mod color;
pub mod provider;
pub mod network;
pub mod training;
pub mod inference;

pub use color::{normalize_color, ColorSample, NormalizedInput, TargetVector, TrainingSet};
pub use provider::{InputProvider, ShuffledInputProviderBuilder};
pub use network::{ContrastNet, NetworkConfig};
pub use training::{
    decayed_learning_rate, ColorAccessibilityModel, TrainingConfig, BATCH_SIZE, DECAY_FACTOR,
    DECAY_INTERVAL, INITIAL_LEARNING_RATE,
};
pub use inference::{predict_with, SharedAccessibilityModel};
