pub mod audit;
pub mod canonize;
pub mod geometer;
pub mod normalize;
