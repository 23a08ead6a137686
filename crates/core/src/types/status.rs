//! Status enums for orders and payments.

use serde::{Deserialize, Serialize};

/// Order lifecycle status, owned by the backend.
///
/// The client only renders it and requests the transitions listed in
/// [`OrderStatus::admin_transitions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Canceled,
    Delivering,
    Shipped,
}

impl OrderStatus {
    /// Every status, in lifecycle order (used for filter dropdowns).
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Paid,
        Self::Delivering,
        Self::Shipped,
        Self::Canceled,
    ];

    /// Wire name, e.g. `PENDING`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Canceled => "CANCELED",
            Self::Delivering => "DELIVERING",
            Self::Shipped => "SHIPPED",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Chờ xác nhận",
            Self::Paid => "Đã thanh toán",
            Self::Canceled => "Đã hủy",
            Self::Delivering => "Đang giao",
            Self::Shipped => "Đã giao",
        }
    }

    /// CSS modifier for the status badge.
    #[must_use]
    pub const fn badge_class(&self) -> &'static str {
        match self {
            Self::Pending => "badge-warning",
            Self::Paid => "badge-info",
            Self::Canceled => "badge-danger",
            Self::Delivering => "badge-primary",
            Self::Shipped => "badge-success",
        }
    }

    /// Customers may cancel only orders nobody has acted on yet.
    #[must_use]
    pub const fn is_cancellable_by_customer(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Statuses the back office may move an order to from this one.
    #[must_use]
    pub const fn admin_transitions(&self) -> &'static [Self] {
        match self {
            Self::Pending | Self::Paid => &[Self::Delivering, Self::Canceled],
            Self::Delivering => &[Self::Shipped],
            Self::Shipped | Self::Canceled => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        self.admin_transitions().contains(&next)
    }

    /// No further transitions are possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.admin_transitions().is_empty()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "CANCELED" | "CANCELLED" => Ok(Self::Canceled),
            "DELIVERING" => Ok(Self::Delivering),
            "SHIPPED" => Ok(Self::Shipped),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cash,
    /// VNPay online payment.
    Online,
}

impl PaymentMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Online => "ONLINE",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Cash => "Thanh toán khi nhận hàng",
            Self::Online => "Thanh toán qua VNPay",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CASH" | "COD" => Ok(Self::Cash),
            "ONLINE" | "VNPAY" => Ok(Self::Online),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// Back-office role names as the backend issues them (without `ROLE_`).
pub mod roles {
    pub const ADMIN: &str = "ADMIN";
    pub const STAFF: &str = "STAFF";
    pub const CUSTOMER: &str = "CUSTOMER";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Delivering).unwrap(),
            "\"DELIVERING\""
        );
        let parsed: OrderStatus = serde_json::from_str("\"CANCELED\"").unwrap();
        assert_eq!(parsed, OrderStatus::Canceled);
    }

    #[test]
    fn test_only_pending_is_customer_cancellable() {
        for status in OrderStatus::ALL {
            assert_eq!(
                status.is_cancellable_by_customer(),
                status == OrderStatus::Pending
            );
        }
    }

    #[test]
    fn test_admin_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Delivering));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Canceled));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Delivering));
        assert!(OrderStatus::Delivering.can_transition_to(OrderStatus::Shipped));

        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Delivering.can_transition_to(OrderStatus::Canceled));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Pending));
        assert!(OrderStatus::Shipped.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("paid".parse::<OrderStatus>().unwrap(), OrderStatus::Paid);
        assert_eq!(
            "cancelled".parse::<OrderStatus>().unwrap(),
            OrderStatus::Canceled
        );
        assert!("LOST".parse::<OrderStatus>().is_err());
        assert_eq!(
            "online".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::Online
        );
    }
}
