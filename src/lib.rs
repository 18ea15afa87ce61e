// walltopics: topic modeling for VK wall posts
//
// This is the library root. Each module corresponds to one stage of the
// fetch -> normalize -> model -> visualize pipeline.

pub mod config;
pub mod output;
pub mod pipeline;
pub mod text;
pub mod topics;
pub mod vk;
