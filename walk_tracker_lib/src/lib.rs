pub mod distance;
pub mod geo_point;
pub mod path_sample;
pub mod store;
pub mod walk_record;
