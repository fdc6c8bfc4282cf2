//! Model components consumed by the scorer
//!
//! The classifier and autoencoder are opaque, pre-trained artifacts. They sit
//! behind small traits so the scorer can run against stub implementations.

pub mod autoencoder;
pub mod bundle;
pub mod classifier;
pub mod transform;

pub use autoencoder::{
    reconstruction_error, row_values, Activation, DenseAutoencoder, DenseLayerSpec, Reconstructor,
};
pub use bundle::ModelBundle;
pub use classifier::{LogisticClassifier, PaymentClassifier};
pub use transform::{
    FittedTransform, NumericScaler, OneHotEncoder, Preprocessor, UnknownCategoryPolicy,
};
