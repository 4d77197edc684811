pub mod config;
pub mod db;
pub mod delivery;
pub mod fallback;
pub mod genai;
pub mod generator;
pub mod handlers;
pub mod model;
pub mod scheduler;
pub mod texts;
pub mod usage;
