//! Cart & Checkout Engine
//!
//! Parses the `agregar` command against the session's recent search
//! results, validates quantities against the stock snapshot, and converts
//! the cart into an order plus per-line stock decrements on `finalizar`.

use super::session::{CartLine, MenuState, Session};
use crate::orders::{Order, OrderSink};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static INTEGER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+").expect("valid integer regex"));
/// Explicit `cantidad N` wins over a second bare integer.
static QUANTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)cantidad\s+(\d+)").expect("valid quantity regex"));

/// Cart/checkout failures. The display text is the user-facing reply.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("⚠️ Primero busca un producto para poder agregarlo.")]
    NoRecentResults,

    #[error("❌ Dime el número del producto. Ej: *agregar 2*")]
    NoIndexGiven,

    #[error("❌ Elige un número entre 1 y {max}")]
    IndexOutOfRange { max: usize },

    #[error("⚠️ Solo hay {stock} unidades disponibles de *{name}*")]
    InsufficientStock { name: String, stock: u32 },

    #[error("🛒 Tu carrito está vacío.")]
    EmptyCart,

    #[error("❌ Error al registrar el pedido. Intenta de nuevo.")]
    OrderSink,
}

/// Resolve the 1-based result index and the quantity from an `agregar`
/// command. Quantity defaults to 1, a second bare integer overrides it and
/// an explicit `cantidad N` overrides both.
fn parse_add_command(text: &str) -> Result<(usize, u32), CartError> {
    let mut integers = INTEGER_RE
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<u64>().ok());

    let index = integers.next().ok_or(CartError::NoIndexGiven)? as usize;

    let mut quantity = integers.next().unwrap_or(1) as u32;
    if let Some(caps) = QUANTITY_RE.captures(text)
        && let Some(explicit) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok())
    {
        quantity = explicit;
    }

    // A literal zero makes no sense as a quantity; fall back to one unit.
    Ok((index, quantity.max(1)))
}

/// Add a product from the last search results to the cart.
///
/// On success the cart either gains a line or merges into an existing one
/// for the same product id, and the reply reports the new cart total. On
/// failure the cart is untouched.
pub fn add_to_cart(session: &mut Session, text: &str) -> Result<String, CartError> {
    if session.recent_results.is_empty() {
        return Err(CartError::NoRecentResults);
    }

    let (index, quantity) = parse_add_command(text)?;
    let max = session.recent_results.len();
    if index < 1 || index > max {
        return Err(CartError::IndexOutOfRange { max });
    }
    let product = &session.recent_results[index - 1];

    if quantity > product.stock {
        return Err(CartError::InsufficientStock {
            name: product.name.clone(),
            stock: product.stock,
        });
    }

    match session.cart.iter_mut().find(|l| l.product_id == product.id) {
        // Merge without re-checking the combined quantity against the
        // original snapshot; checkout saturates the decrement instead.
        Some(line) => line.quantity += quantity,
        None => session.cart.push(CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            quantity,
            stock_snapshot: product.stock,
        }),
    }

    let name = product.name.clone();
    Ok(format!(
        "✅ Agregado: {quantity} × {name}\n\n🛒 Carrito ({} items)\nTotal: *${:.2}*\n\n\
         Escribe *finalizar* cuando termines",
        session.cart.len(),
        session.cart_total(),
    ))
}

/// Convert the cart into an order, persist it and decrement stock.
///
/// The order append and the per-line stock updates are deliberately not
/// transactional: a failed stock update is logged and skipped, never rolled
/// back. The order already stands and the user already got a confirmation.
pub async fn checkout(
    session: &mut Session,
    client_id: &str,
    sink: &dyn OrderSink,
) -> Result<String, CartError> {
    if session.cart.is_empty() {
        return Err(CartError::EmptyCart);
    }

    let order = Order::from_cart(client_id, session.cart.clone());

    if let Err(e) = sink.append_order(&order).await {
        tracing::error!("Checkout: failed to register order {}: {e}", order.id);
        return Err(CartError::OrderSink);
    }

    for line in &order.lines {
        // Saturating: a merged line can exceed the stock captured at first
        // add, and the counter must not wrap.
        let new_stock = line.stock_snapshot.saturating_sub(line.quantity);
        if let Err(e) = sink.update_stock(&line.product_id, new_stock).await {
            tracing::warn!(
                "Checkout: stock update failed for {} (order {}): {e}",
                line.product_id,
                order.id,
            );
        }
    }

    session.cart.clear();
    session.menu = MenuState::Main;

    Ok(format!(
        "✅ ¡Pedido recibido!\nID: {}\nTotal: *${:.2}*\n\n\
         En breve te contactamos.\n¡Gracias por tu compra!",
        order.id, order.total,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductSnapshot;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    fn snapshot(id: &str, price: f64, stock: u32) -> ProductSnapshot {
        ProductSnapshot {
            id: id.to_string(),
            name: format!("Producto {id}"),
            brand: String::new(),
            model: String::new(),
            price,
            stock,
            feature: String::new(),
        }
    }

    fn session_with_results() -> Session {
        let mut session = Session::new();
        session.menu = MenuState::Searching;
        session.recent_results = vec![snapshot("P1", 100.0, 3), snapshot("P2", 50.0, 10)];
        session
    }

    #[test]
    fn test_parse_defaults_quantity_to_one() {
        assert_eq!(parse_add_command("agregar 2"), Ok((2, 1)));
    }

    #[test]
    fn test_parse_second_integer_is_quantity() {
        assert_eq!(parse_add_command("agregar 2, 4"), Ok((2, 4)));
    }

    #[test]
    fn test_parse_explicit_cantidad_wins() {
        assert_eq!(parse_add_command("agregar 1, 3 cantidad 7"), Ok((1, 7)));
        assert_eq!(parse_add_command("agregar 1, cantidad 5"), Ok((1, 5)));
    }

    #[test]
    fn test_parse_zero_quantity_becomes_one() {
        assert_eq!(parse_add_command("agregar 1, cantidad 0"), Ok((1, 1)));
    }

    #[test]
    fn test_parse_without_integer_fails() {
        assert_eq!(parse_add_command("agregar ese"), Err(CartError::NoIndexGiven));
    }

    #[test]
    fn test_add_without_results_fails() {
        let mut session = Session::new();
        assert_eq!(add_to_cart(&mut session, "agregar 1"), Err(CartError::NoRecentResults));
    }

    #[test]
    fn test_add_out_of_range_fails() {
        let mut session = session_with_results();
        assert_eq!(
            add_to_cart(&mut session, "agregar 5"),
            Err(CartError::IndexOutOfRange { max: 2 })
        );
        assert_eq!(
            add_to_cart(&mut session, "agregar 0"),
            Err(CartError::IndexOutOfRange { max: 2 })
        );
        assert!(session.cart.is_empty());
    }

    #[test]
    fn test_add_reports_total() {
        let mut session = session_with_results();
        let reply = add_to_cart(&mut session, "agregar 1").expect("add");
        assert_eq!(session.cart.len(), 1);
        assert_eq!(session.cart[0].product_id, "P1");
        assert_eq!(session.cart[0].quantity, 1);
        assert!(reply.contains("$100.00"));
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut session = session_with_results();
        add_to_cart(&mut session, "agregar 1").expect("first add");
        add_to_cart(&mut session, "agregar 1, cantidad 2").expect("second add");
        assert_eq!(session.cart.len(), 1);
        assert_eq!(session.cart[0].quantity, 3);
    }

    #[test]
    fn test_add_insufficient_stock_leaves_cart_untouched() {
        let mut session = session_with_results();
        add_to_cart(&mut session, "agregar 1").expect("add");
        let err = add_to_cart(&mut session, "agregar 1, cantidad 5").expect_err("stock is 3");
        assert_eq!(
            err,
            CartError::InsufficientStock { name: "Producto P1".into(), stock: 3 }
        );
        assert_eq!(session.cart[0].quantity, 1);
    }

    /// Records sink calls; optionally fails the order append.
    struct RecordingSink {
        fail_append: bool,
        orders: StdMutex<Vec<Order>>,
        stock_updates: StdMutex<Vec<(String, u32)>>,
    }

    impl RecordingSink {
        fn new(fail_append: bool) -> Self {
            Self {
                fail_append,
                orders: StdMutex::new(Vec::new()),
                stock_updates: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl OrderSink for RecordingSink {
        async fn append_order(&self, order: &Order) -> anyhow::Result<()> {
            if self.fail_append {
                anyhow::bail!("sheet unavailable");
            }
            self.orders.lock().expect("lock").push(order.clone());
            Ok(())
        }

        async fn update_stock(&self, product_id: &str, new_quantity: u32) -> anyhow::Result<()> {
            self.stock_updates
                .lock()
                .expect("lock")
                .push((product_id.to_string(), new_quantity));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_checkout_empty_cart_never_calls_sink() {
        let sink = RecordingSink::new(false);
        let mut session = Session::new();
        let err = checkout(&mut session, "555", &sink).await.expect_err("empty");
        assert_eq!(err, CartError::EmptyCart);
        assert!(sink.orders.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn test_checkout_success_clears_cart_and_decrements_stock() {
        let sink = RecordingSink::new(false);
        let mut session = session_with_results();
        add_to_cart(&mut session, "agregar 1, cantidad 2").expect("add");

        let reply = checkout(&mut session, "555", &sink).await.expect("checkout");

        assert!(reply.contains("$200.00"));
        assert!(session.cart.is_empty());
        assert_eq!(session.menu, MenuState::Main);
        let updates = sink.stock_updates.lock().expect("lock");
        assert_eq!(updates.as_slice(), &[("P1".to_string(), 1)]);
        let orders = sink.orders.lock().expect("lock");
        assert_eq!(orders.len(), 1);
        assert!(reply.contains(&orders[0].id));
    }

    #[tokio::test]
    async fn test_checkout_sink_failure_keeps_cart() {
        let sink = RecordingSink::new(true);
        let mut session = session_with_results();
        add_to_cart(&mut session, "agregar 2").expect("add");

        let err = checkout(&mut session, "555", &sink).await.expect_err("append fails");
        assert_eq!(err, CartError::OrderSink);
        assert_eq!(session.cart.len(), 1);
        assert!(sink.stock_updates.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn test_checkout_saturates_over_merged_lines() {
        let sink = RecordingSink::new(false);
        let mut session = session_with_results();
        // Two adds of 2 against a snapshot of 3: merged quantity exceeds it.
        add_to_cart(&mut session, "agregar 1, cantidad 2").expect("add");
        add_to_cart(&mut session, "agregar 1, cantidad 2").expect("merge");

        checkout(&mut session, "555", &sink).await.expect("checkout");

        let updates = sink.stock_updates.lock().expect("lock");
        assert_eq!(updates.as_slice(), &[("P1".to_string(), 0)]);
    }
}
