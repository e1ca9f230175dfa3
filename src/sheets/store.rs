//! Spreadsheet-backed store
//!
//! Implements the storefront's collaborator traits against the sheet tabs:
//! `Productos` (catalog + stock), `Pedidos` (orders, one row per line),
//! `Clientes` (contacts) and `Empresa` (key-value store profile).

use super::SheetsClient;
use crate::catalog::{CatalogGateway, ProductFilters, ProductSnapshot};
use crate::orders::{ContactRegistry, Order, OrderSink};
use crate::shop::StoreProfile;
use async_trait::async_trait;
use chrono::Utc;

const TAB_CONTACTS: &str = "Clientes";
const TAB_PRODUCTS: &str = "Productos";
const TAB_PROFILE: &str = "Empresa";
const TAB_ORDERS: &str = "Pedidos";

/// Product rows span id..feature/status; see [`ProductRow`] for the layout.
const PRODUCTS_RANGE: &str = "Productos!A:M";
/// Stock lives in column G of the products tab.
const STOCK_COLUMN: &str = "G";

/// One parsed row of the products tab. Category and status exist only for
/// filtering; the storefront sees the [`ProductSnapshot`] projection.
#[derive(Debug, Clone)]
struct ProductRow {
    id: String,
    name: String,
    brand: String,
    model: String,
    category: String,
    price: f64,
    stock: u32,
    feature: String,
}

impl ProductRow {
    /// Column layout: A id, B name, C brand, D model, E category, F price,
    /// G stock, H..K unit/weight/dimensions/image (unused here), L feature.
    fn parse(row: &[String]) -> Option<Self> {
        let id = cell(row, 0);
        if id.is_empty() {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            name: cell(row, 1).to_string(),
            brand: cell(row, 2).to_string(),
            model: cell(row, 3).to_string(),
            category: cell(row, 4).to_string(),
            price: parse_price(cell(row, 5)),
            stock: cell(row, 6).parse().unwrap_or(0),
            feature: cell(row, 11).to_string(),
        })
    }

    fn into_snapshot(self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id,
            name: self.name,
            brand: self.brand,
            model: self.model,
            price: self.price,
            stock: self.stock,
            feature: self.feature,
        }
    }
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

/// Prices arrive as display strings (`"$1,299.90"`); strip everything that
/// isn't part of a number before parsing. Unparseable cells become 0.
fn parse_price(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().unwrap_or(0.0)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// In-process filtering with the gateway's matching semantics:
/// case-insensitive substring per field, all provided fields ANDed, the
/// free-text name matched against name, brand and model.
fn apply_filters(rows: Vec<ProductRow>, filters: &ProductFilters) -> Vec<ProductSnapshot> {
    let mut matched: Vec<ProductSnapshot> = rows
        .into_iter()
        .filter(|p| {
            filters
                .category
                .as_deref()
                .is_none_or(|c| contains_ci(&p.category, c))
        })
        .filter(|p| {
            filters.name.as_deref().is_none_or(|n| {
                contains_ci(&p.name, n) || contains_ci(&p.brand, n) || contains_ci(&p.model, n)
            })
        })
        .filter(|p| filters.brand.as_deref().is_none_or(|b| contains_ci(&p.brand, b)))
        .filter(|p| filters.model.as_deref().is_none_or(|m| contains_ci(&p.model, m)))
        .filter(|p| !filters.in_stock_only || p.stock > 0)
        .filter(|p| filters.max_price.is_none_or(|max| p.price <= max))
        .map(ProductRow::into_snapshot)
        .collect();

    if let Some(limit) = filters.limit {
        matched.truncate(limit);
    }
    matched
}

/// Keys in the profile tab are free-form labels; normalise them into
/// identifier form (`"Contacto WhatsApp"` → `contacto_whatsapp`).
fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join("_")
}

/// The spreadsheet-backed datastore. One instance is shared behind `Arc`
/// and serves all collaborator traits.
pub struct SheetsStore {
    client: SheetsClient,
}

impl SheetsStore {
    pub fn new(client: SheetsClient) -> Self {
        Self { client }
    }

    /// Load the key-value `Empresa` tab into a [`StoreProfile`]. Unknown
    /// keys are ignored with a debug log.
    pub async fn fetch_profile(&self) -> anyhow::Result<StoreProfile> {
        let rows = self.client.values_get(&format!("{TAB_PROFILE}!A:B")).await?;
        let mut profile = StoreProfile::default();
        for row in rows.iter().skip(1) {
            let value = cell(row, 1);
            if value.is_empty() {
                continue;
            }
            let value = Some(value.to_string());
            match normalize_key(cell(row, 0)).as_str() {
                "nombre" => profile.name = value,
                "direccion" | "dirección" => profile.address = value,
                "enlaces_maps" => profile.maps_link = value,
                "horario" => profile.hours = value,
                "contacto_whatsapp" => profile.whatsapp = value,
                "correo_electronico" | "correo_electrónico" => profile.email = value,
                "contacto_web" => profile.website = value,
                "catalogo_url" | "catálogo_url" => profile.catalog_url = value,
                "catalogo_nombre" | "catálogo_nombre" => profile.catalog_name = value,
                other => tracing::debug!("Sheets: ignoring unknown profile key {other:?}"),
            }
        }
        Ok(profile)
    }
}

#[async_trait]
impl CatalogGateway for SheetsStore {
    async fn query(&self, filters: &ProductFilters) -> anyhow::Result<Vec<ProductSnapshot>> {
        let rows = self.client.values_get(PRODUCTS_RANGE).await?;
        let parsed: Vec<ProductRow> = rows
            .iter()
            .skip(1) // header row
            .filter_map(|row| ProductRow::parse(row))
            .collect();
        let total = parsed.len();
        let matched = apply_filters(parsed, filters);
        tracing::debug!("Sheets: catalog query matched {}/{total} products", matched.len());
        Ok(matched)
    }
}

#[async_trait]
impl OrderSink for SheetsStore {
    async fn append_order(&self, order: &Order) -> anyhow::Result<()> {
        let rows: Vec<Vec<String>> = order
            .lines
            .iter()
            .map(|line| {
                vec![
                    order.id.clone(),
                    order.client_id.clone(),
                    line.product_id.clone(),
                    line.quantity.to_string(),
                    format!("{:.2}", line.unit_price),
                    format!("{:.2}", line.subtotal()),
                    order.created_at.to_rfc3339(),
                    order.status.as_str().to_string(),
                ]
            })
            .collect();

        self.client.values_append(&format!("{TAB_ORDERS}!A:H"), &rows).await?;
        tracing::info!("Sheets: order {} registered with {} lines", order.id, rows.len());
        Ok(())
    }

    async fn update_stock(&self, product_id: &str, new_quantity: u32) -> anyhow::Result<()> {
        let ids = self.client.values_get(&format!("{TAB_PRODUCTS}!A:A")).await?;
        let row_number = ids
            .iter()
            .position(|row| cell(row, 0) == product_id)
            .map(|idx| idx + 1) // sheet rows are 1-based
            .ok_or_else(|| anyhow::anyhow!("product {product_id} not found"))?;

        let range = format!("{TAB_PRODUCTS}!{STOCK_COLUMN}{row_number}");
        self.client
            .values_update(&range, &[vec![new_quantity.to_string()]])
            .await?;
        tracing::info!("Sheets: stock for {product_id} set to {new_quantity}");
        Ok(())
    }
}

#[async_trait]
impl ContactRegistry for SheetsStore {
    async fn ensure_contact(&self, phone: &str, name: &str) -> anyhow::Result<()> {
        let rows = self.client.values_get(&format!("{TAB_CONTACTS}!A:E")).await?;
        if rows.iter().any(|row| cell(row, 2) == phone) {
            tracing::debug!("Sheets: contact {phone} already registered");
            return Ok(());
        }

        let now = Utc::now();
        let row = vec![
            now.timestamp_millis().to_string(),
            name.to_string(),
            phone.to_string(),
            "Nuevo".to_string(),
            now.to_rfc3339(),
        ];
        self.client.values_append(&format!("{TAB_CONTACTS}!A:E"), &[row]).await?;
        tracing::info!("Sheets: new contact registered: {phone}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn sample_rows() -> Vec<ProductRow> {
        [
            row(&["P1", "Galaxy A54", "Samsung", "A54", "celular", "450", "3", "", "", "", "", "128GB"]),
            row(&["P2", "Redmi Note 13", "Xiaomi", "Note 13", "celular", "280", "0", "", "", "", "", ""]),
            row(&["P3", "Inspiron 15", "Dell", "3520", "laptop", "$1,299.90", "5", "", "", "", "", "16GB RAM"]),
        ]
        .iter()
        .filter_map(|r| ProductRow::parse(r))
        .collect()
    }

    #[test]
    fn test_parse_price_strips_decorations() {
        assert_eq!(parse_price("450"), 450.0);
        assert_eq!(parse_price("$1,299.90"), 1299.9);
        assert_eq!(parse_price("no price"), 0.0);
    }

    #[test]
    fn test_parse_row_requires_id() {
        assert!(ProductRow::parse(&row(&["", "Sin ID"])).is_none());
        let parsed = ProductRow::parse(&row(&["P9", "Corto"])).expect("short rows pad out");
        assert_eq!(parsed.stock, 0);
        assert_eq!(parsed.feature, "");
    }

    #[test]
    fn test_filters_category_and_stock() {
        let filters = ProductFilters {
            category: Some("celular".into()),
            in_stock_only: true,
            ..Default::default()
        };
        let matched = apply_filters(sample_rows(), &filters);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "P1");
    }

    #[test]
    fn test_filters_name_matches_brand_and_model() {
        let filters = ProductFilters { name: Some("dell".into()), ..Default::default() };
        let matched = apply_filters(sample_rows(), &filters);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "P3");

        let filters = ProductFilters { name: Some("note 13".into()), ..Default::default() };
        assert_eq!(apply_filters(sample_rows(), &filters).len(), 1);
    }

    #[test]
    fn test_filters_max_price_and_limit() {
        let filters = ProductFilters { max_price: Some(500.0), ..Default::default() };
        assert_eq!(apply_filters(sample_rows(), &filters).len(), 2);

        let filters = ProductFilters { limit: Some(1), ..Default::default() };
        assert_eq!(apply_filters(sample_rows(), &filters).len(), 1);
    }

    #[test]
    fn test_filters_are_anded() {
        let filters = ProductFilters {
            category: Some("celular".into()),
            brand: Some("xiaomi".into()),
            ..Default::default()
        };
        let matched = apply_filters(sample_rows(), &filters);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "P2");
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Contacto WhatsApp"), "contacto_whatsapp");
        assert_eq!(normalize_key("  Horario "), "horario");
    }
}
