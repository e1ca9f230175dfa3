//! Search Flow
//!
//! Natural-language product search inside the `Searching` menu: control
//! words route to the cart engine, anything else goes through the intent
//! extractor and the catalog gateway.

use super::cart;
use super::session::Session;
use crate::catalog::{CatalogGateway, ProductFilters, ProductSnapshot};
use crate::intent::{ChatTurn, IntentExtractor};
use crate::orders::OrderSink;

/// Catalog result cap per search.
const RESULT_LIMIT: usize = 10;

const NOT_UNDERSTOOD: &str = "❌ No entendí qué producto buscas.\n\
Prueba con: *celular*, *laptop hasta 600*, *audífonos*";

const TEMPORARY_ERROR: &str = "❌ Error temporal. Inténtalo de nuevo en unos segundos.";

/// System turn seeding the extractor history. Spanish, because the model's
/// confirmation line is shown to the user verbatim.
const SEARCH_SYSTEM_PROMPT: &str = "Eres un experto en ventas de tecnología. Tu única función es \
entender búsquedas de productos y devolver un JSON con los filtros. NO respondas nada más.\n\n\
Formato obligatorio:\n\
{\n\
  \"nombre_producto\": \"nombre o marca/modelo específico o null\",\n\
  \"categoria\": \"celular|laptop|audífonos|televisor|tablet|smartwatch|parlante|null\",\n\
  \"precio_maximo\": número o null,\n\
  \"marca\": \"solo si dice explícitamente 'marca Samsung' o similar, sino null\",\n\
  \"modelo\": \"solo si dice 'modelo X' o similar, sino null\",\n\
  \"respuesta_breve\": \"máximo 12 palabras confirmando la búsqueda\"\n\
}\n\n\
Ejemplos válidos:\n\
- \"celular hasta 500$\" → {\"categoria\":\"celular\",\"precio_maximo\":500,\"respuesta_breve\":\"Buscando celulares hasta $500\"}\n\
- \"laptop dell\" → {\"nombre_producto\":\"dell\",\"categoria\":\"laptop\",\"respuesta_breve\":\"Mostrando laptops Dell\"}\n\
- \"audífonos\" → {\"categoria\":\"audífonos\",\"respuesta_breve\":\"Aquí tienes audífonos disponibles\"}\n\n\
Si no es una búsqueda de producto → devuelve todo null y respuesta_breve = \"No entendí qué buscas.\"";

/// Handle one message while the session is in `Searching` state.
///
/// Never fails: every error path collapses into a user-facing reply.
pub async fn handle_search(
    session: &mut Session,
    raw_text: &str,
    client_id: &str,
    extractor: &dyn IntentExtractor,
    catalog: &dyn CatalogGateway,
    orders: &dyn OrderSink,
) -> String {
    let text = raw_text.trim().to_lowercase();

    // Cart control words take precedence over search; neither touches the
    // extractor history or the catalog.
    if text.contains("agregar") {
        return match cart::add_to_cart(session, &text) {
            Ok(reply) => reply,
            Err(e) => e.to_string(),
        };
    }
    if text.contains("finalizar") || text.contains("terminar") {
        return match cart::checkout(session, client_id, orders).await {
            Ok(reply) => reply,
            Err(e) => e.to_string(),
        };
    }

    session.seed_history(SEARCH_SYSTEM_PROMPT);
    session.push_turn(ChatTurn::user(text.as_str()));

    let intent = match extractor.extract(&session.history).await {
        Ok(intent) => intent,
        Err(e) => {
            // The user turn stays appended; the next search carries on from it.
            tracing::error!("Search: extractor failed: {e}");
            return TEMPORARY_ERROR.to_string();
        }
    };

    if let Ok(echo) = serde_json::to_string(&intent) {
        session.push_turn(ChatTurn::assistant(echo));
    }
    session.prune_history();

    if intent.is_empty() {
        return NOT_UNDERSTOOD.to_string();
    }

    let filters = ProductFilters {
        category: intent.category.clone(),
        name: intent.name.clone(),
        brand: intent.brand.clone(),
        model: intent.model.clone(),
        max_price: intent.max_price,
        in_stock_only: true,
        limit: Some(RESULT_LIMIT),
    };

    let products = match catalog.query(&filters).await {
        Ok(products) => products,
        Err(e) => {
            tracing::warn!("Search: catalog query failed: {e}");
            Vec::new()
        }
    };
    session.recent_results = products;

    if session.recent_results.is_empty() {
        return format!("{}\n\nPrueba con otros términos.", intent.reply);
    }
    render_results(&intent.reply, &session.recent_results)
}

/// 1-based numbered list with price, stock and the optional
/// brand/model/feature suffix, plus the cart-command hint.
fn render_results(confirmation: &str, products: &[ProductSnapshot]) -> String {
    let list = products
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let mut extra = String::new();
            if !p.brand.is_empty() {
                extra.push_str(&format!(" | {}", p.brand));
            }
            if !p.model.is_empty() {
                extra.push_str(&format!(" {}", p.model));
            }
            if !p.feature.is_empty() {
                extra.push_str(&format!(" | {}", p.feature));
            }
            format!(
                "{}. *{}*\n   ${:.2} | Stock: {}{}",
                i + 1,
                p.name,
                p.price,
                p.stock,
                extra,
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{confirmation}\n\n{list}\n\n🛒 Escribe `agregar 1` o `agregar 1, cantidad 2` \
         para añadir al carrito"
    )
}
