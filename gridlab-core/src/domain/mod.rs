//! Domain types for GridLab

pub mod bar;
pub mod fill;
pub mod ids;
pub mod order;
pub mod position;

pub use bar::Bar;
pub use fill::{Fill, FillTag};
pub use ids::{OrderId, OrderIdGen};
pub use order::{Order, OrderError, OrderKind, OrderSide};
pub use position::Position;
