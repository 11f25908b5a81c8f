// lib.rs
pub mod batch;
pub mod breakpoint;
pub mod colinear;
pub mod edit_distance;
pub mod overlap;
pub mod params;
pub mod pipeline;
pub mod range;
pub mod seed_hit;
pub mod sequence;
pub mod validate;
