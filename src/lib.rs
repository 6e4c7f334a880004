//! Client core for the Amazonia virtual rainforest: backend API access,
//! camera focus animation, search and the forest view state machine.

pub mod animation;
pub mod api_client;
pub mod camera;
pub mod error;
pub mod forest_view;
pub mod landing;
pub mod models;
pub mod plant;
pub mod search;
pub mod settings;

#[cfg(test)]
mod test_backend;
