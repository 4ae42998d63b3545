pub mod advisor;
pub mod normalize;
pub mod state;

pub use advisor::Advisor;
pub use state::AnalysisState;
