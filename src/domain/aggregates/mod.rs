//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod stock;

pub use product::{Product, ProductDraft, ProductError, ProductRevision, ProductStatus, StockChange};
pub use order::{NewOrder, Order, OrderAction, OrderError, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress, TrackingEntry};
pub use cart::{Cart, CartError, CartItem};
pub use stock::{StockAction, StockMovement};
