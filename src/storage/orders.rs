//! Payment orders created by the card and crypto flows.

use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::core::types::{OrderStatus, PaymentMethod};

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: String,
    pub user_id: i64,
    pub package_key: String,
    pub method: PaymentMethod,
    /// Decimal amount as sent to the provider
    pub amount: String,
    pub currency: String,
    pub crypto: Option<String>,
    pub chain: Option<String>,
    pub email: Option<String>,
    pub payment_url: Option<String>,
    pub status: OrderStatus,
    /// Package generations were added to the user's quota
    pub credited: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: String,
    pub user_id: i64,
    pub package_key: String,
    pub method: PaymentMethod,
    pub amount: String,
    pub currency: String,
    pub crypto: Option<String>,
    pub chain: Option<String>,
    pub email: Option<String>,
}

fn map_order(row: &rusqlite::Row<'_>) -> Result<Order> {
    Ok(Order {
        id: row.get(0)?,
        user_id: row.get(1)?,
        package_key: row.get(2)?,
        method: row.get(3)?,
        amount: row.get(4)?,
        currency: row.get(5)?,
        crypto: row.get(6)?,
        chain: row.get(7)?,
        email: row.get(8)?,
        payment_url: row.get(9)?,
        status: row.get(10)?,
        credited: row.get::<_, i64>(11)? != 0,
        created_at: row.get(12)?,
    })
}

pub fn create_order(conn: &Connection, new: &NewOrder) -> Result<()> {
    conn.execute(
        "INSERT INTO orders (id, user_id, package_key, method, amount, currency, crypto, chain, email)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            new.id,
            new.user_id,
            new.package_key,
            new.method,
            new.amount,
            new.currency,
            new.crypto,
            new.chain,
            new.email
        ],
    )?;
    Ok(())
}

pub fn get_order(conn: &Connection, id: &str) -> Result<Option<Order>> {
    conn.query_row(
        "SELECT id, user_id, package_key, method, amount, currency, crypto, chain, email, payment_url, status,
                credited, created_at
         FROM orders WHERE id = ?1",
        params![id],
        map_order,
    )
    .optional()
}

pub fn set_payment_url(conn: &Connection, id: &str, url: &str) -> Result<()> {
    conn.execute("UPDATE orders SET payment_url = ?2 WHERE id = ?1", params![id, url])?;
    Ok(())
}

/// Moves a pending order to `status`. Terminal orders are left as they are.
pub fn set_status(conn: &Connection, id: &str, status: OrderStatus) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE orders SET status = ?2 WHERE id = ?1 AND status = 'pending'",
        params![id, status],
    )?;
    Ok(updated > 0)
}

/// Flags a paid order as credited. Only the first caller gets `true`.
pub fn claim_credit(conn: &Connection, id: &str) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE orders SET credited = 1 WHERE id = ?1 AND status = 'paid' AND credited = 0",
        params![id],
    )?;
    Ok(updated > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::migrations::run_migrations_for_test;

    fn setup() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations_for_test(&mut conn).unwrap();
        conn
    }

    fn order(id: &str) -> NewOrder {
        NewOrder {
            id: id.to_string(),
            user_id: 7,
            package_key: "pack".to_string(),
            method: PaymentMethod::Crypto,
            amount: "4.99".to_string(),
            currency: "USDT".to_string(),
            crypto: Some("USDT".to_string()),
            chain: Some("TRC20".to_string()),
            email: None,
        }
    }

    #[test]
    fn test_order_lifecycle() {
        let conn = setup();
        create_order(&conn, &order("o1")).unwrap();
        set_payment_url(&conn, "o1", "https://pay/o1").unwrap();

        let stored = get_order(&conn, "o1").unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
        assert_eq!(stored.method, PaymentMethod::Crypto);
        assert_eq!(stored.payment_url.as_deref(), Some("https://pay/o1"));

        assert!(!claim_credit(&conn, "o1").unwrap(), "pending orders are not credited");
        assert!(set_status(&conn, "o1", OrderStatus::Paid).unwrap());
        assert!(!set_status(&conn, "o1", OrderStatus::Failed).unwrap());
        assert!(claim_credit(&conn, "o1").unwrap());
        assert!(!claim_credit(&conn, "o1").unwrap());
    }
}
