//! HTTP Gateway
//!
//! Minimal web surface for operating the bot: the `/qr` page renders the
//! current WhatsApp pairing code as an inline SVG that refreshes itself
//! until the client is connected.

use crate::channels::whatsapp::WhatsAppState;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use qrcode::render::svg;
use qrcode::QrCode;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Clone)]
struct GatewayState {
    whatsapp: Arc<WhatsAppState>,
}

/// Serve the gateway until the process exits.
pub async fn serve(bind: String, port: u16, whatsapp: Arc<WhatsAppState>) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/qr", get(qr_page))
        .with_state(GatewayState { whatsapp });

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Gateway: QR page at http://{addr}/qr");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn qr_page(State(state): State<GatewayState>) -> Html<String> {
    if state.whatsapp.is_connected().await {
        return Html(page(
            "WhatsApp conectado",
            "<h1>✅ WhatsApp conectado</h1>\
             <p>El bot está en línea. Ya puedes cerrar esta página.</p>",
            None,
        ));
    }

    match state.whatsapp.qr().await {
        Some(code) => match render_qr_svg(&code) {
            Some(svg) => Html(page(
                "Escanea este código QR",
                &format!(
                    "<h1>Escanea este código QR</h1>{svg}\
                     <p>WhatsApp → Menú → Dispositivos vinculados → Vincular dispositivo</p>\
                     <small>Se actualizará automáticamente...</small>"
                ),
                Some(15),
            )),
            None => Html(page(
                "Error",
                "<h2>No se pudo generar el código QR</h2>",
                Some(5),
            )),
        },
        None => Html(page(
            "Generando QR",
            "<h2>Generando QR... espera un momento</h2>",
            Some(3),
        )),
    }
}

fn render_qr_svg(code: &str) -> Option<String> {
    let qr = QrCode::new(code.as_bytes()).ok()?;
    Some(
        qr.render::<svg::Color>()
            .min_dimensions(320, 320)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build(),
    )
}

fn page(title: &str, body: &str, refresh_secs: Option<u32>) -> String {
    let refresh = refresh_secs
        .map(|s| format!("<script>setTimeout(()=>location.reload(), {})</script>", s * 1000))
        .unwrap_or_default();
    format!(
        "<!DOCTYPE html>\
         <html lang=\"es\"><head><meta charset=\"utf-8\"><title>{title}</title>\
         <style>\
           body {{font-family: Arial; background: #f0f2f5; display: flex; \
                  justify-content: center; align-items: center; height: 100vh; margin: 0;}}\
           .box {{text-align: center; background: white; padding: 30px; \
                  border-radius: 15px; box-shadow: 0 8px 25px rgba(0,0,0,0.15);}}\
           h1 {{color: #128C7E;}}\
           svg {{border: 6px solid #128C7E; border-radius: 12px; margin: 20px 0;}}\
           p {{color: #555; line-height: 1.5;}}\
         </style></head>\
         <body><div class=\"box\">{body}</div>{refresh}</body></html>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_qr_svg() {
        let svg = render_qr_svg("2@abc,def,ghi").expect("qr renders");
        assert!(svg.starts_with("<?xml") || svg.starts_with("<svg"));
        assert!(svg.contains("svg"));
    }

    #[test]
    fn test_page_refresh_script() {
        let with = page("t", "<p>x</p>", Some(3));
        assert!(with.contains("location.reload(), 3000"));
        let without = page("t", "<p>x</p>", None);
        assert!(!without.contains("location.reload"));
    }
}
