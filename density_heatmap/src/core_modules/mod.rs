pub mod canvas;
pub mod clusterer;
pub mod densifier;
pub mod gradient;
pub mod point;
pub mod raster;
