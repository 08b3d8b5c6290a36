pub mod color_adapter;
pub mod component_enhancer;
pub mod feature_builder;
pub mod histogram;
pub mod noise_mapper;
pub mod noise_scorer;
pub mod pca_projector;
pub mod pca_scorer;
pub mod utils;
