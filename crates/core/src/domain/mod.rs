pub mod catalog;
pub mod state;
pub mod turn;
