//! Identifiers minted by the application rather than the database.
//!
//! Users take their id from the `users.id` column default. Revocation records
//! are keyed here so their primary key follows insertion order.

use uuid::Uuid;

/// A fresh time-ordered (v7) id.
pub fn time_ordered_id() -> Uuid {
    Uuid::now_v7()
}
