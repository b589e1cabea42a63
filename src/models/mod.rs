pub mod bundle;
pub mod credit;
pub mod order;
pub mod payment;
pub mod staff;
pub mod tier;

pub use bundle::{Bundle, BundleKind, BundleTier};
pub use credit::{CreditAccount, CreditTransaction, CreditTransactionStatus};
pub use order::{Order, OrderLine, OrderStatus, PricedLine, Ticket, TicketStatus};
pub use payment::{PaymentConfig, PaymentModel};
pub use staff::{CommissionType, ResellerStaff, StaffRole};
pub use tier::{PricingWindow, TicketTier};
