//! Resources managed by modelgarden

pub mod model_garden;
