//! Session cart.
//!
//! The backend has no cart resource, so the cart lives in the session and
//! only becomes an order at checkout. Lines snapshot the product's price and
//! stock when they are added.

use serde::{Deserialize, Serialize};

use sgshop_core::records::{OrderLineRequest, Product};
use sgshop_core::{Money, ProductId};

/// Why an item could not be added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("product is out of stock")]
    OutOfStock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub unit_price: Money,
    pub quantity: u32,
    pub stock: u32,
}

impl CartLine {
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// Add `quantity` of `product`, merging with an existing line.
    ///
    /// The line is refreshed with the product's current price and stock and
    /// its quantity is clamped to the stock. Returns the resulting quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::OutOfStock`] if the product has no stock.
    pub fn add(&mut self, product: &Product, quantity: u32) -> Result<u32, CartError> {
        let stock = u32::try_from(product.stock.max(0)).unwrap_or(u32::MAX);
        if stock == 0 {
            return Err(CartError::OutOfStock);
        }
        let quantity = quantity.max(1);

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            line.name.clone_from(&product.name);
            line.unit_price = product.effective_price();
            line.stock = stock;
            line.quantity = line.quantity.saturating_add(quantity).min(stock);
            return Ok(line.quantity);
        }

        let quantity = quantity.min(stock);
        self.lines.push(CartLine {
            product_id: product.id,
            name: product.name.clone(),
            image: product.primary_image().map(str::to_owned),
            unit_price: product.effective_price(),
            quantity,
            stock,
        });
        Ok(quantity)
    }

    /// Set a line's quantity; zero removes it. Clamped to the line's stock.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove(product_id);
            return;
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity.min(line.stock.max(1));
        }
    }

    pub fn remove(&mut self, product_id: ProductId) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().fold(0u32, |total, l| total.saturating_add(l.quantity))
    }

    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Order lines for `POST /orders`.
    #[must_use]
    pub fn order_lines(&self) -> Vec<OrderLineRequest> {
        self.lines
            .iter()
            .map(|l| OrderLineRequest {
                product_id: l.product_id,
                quantity: l.quantity,
            })
            .collect()
    }
}
