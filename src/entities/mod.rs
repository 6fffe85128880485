pub mod order;
pub mod order_item;
pub mod product;
pub mod product_variation;
pub mod seller;
pub mod variation;

pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use product::Entity as Product;
pub use product_variation::Entity as ProductVariation;
pub use seller::Entity as Seller;
pub use variation::Entity as Variation;
