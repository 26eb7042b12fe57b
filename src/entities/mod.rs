//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod dining_table;
pub mod order;
pub mod order_item;
pub mod product;
pub mod reservation;
pub mod stock_movement;

// Re-export specific types to avoid conflicts
pub use dining_table::{
    Column as DiningTableColumn, Entity as DiningTable, Model as DiningTableModel, TableStatus,
};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{Column as OrderItemColumn, Entity as OrderItem, Model as OrderItemModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use reservation::{
    Column as ReservationColumn, Entity as Reservation, Model as ReservationModel,
    ReservationStatus,
};
pub use stock_movement::{
    Column as StockMovementColumn, Entity as StockMovement, Model as StockMovementModel,
    MovementReason, MovementType,
};
